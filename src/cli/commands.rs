// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the three subcommands: `train`, `evaluate`, `export`
// and all their configurable flags.
//
// clap's derive macros automatically generate:
//   - help text (--help)
//   - error messages for missing args
//   - type conversion (string → usize, f64, etc.)

use clap::{Args, Subcommand};

use crate::application::evaluate_use_case::EvalConfig;
use crate::application::export_use_case::ExportConfig;
use crate::application::train_use_case::{Objective, TrainConfig};
use crate::data::sampler::PartitionStrategy;

/// The three top-level subcommands available to the user
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train a ranking model on pairwise or pointwise data
    Train(TrainArgs),

    /// Score evaluation records with a trained checkpoint
    Evaluate(EvalArgs),

    /// Merge prediction shards into a TREC run file
    Export(ExportArgs),
}

/// All arguments for the `train` command.
/// Each field becomes a --flag on the command line.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Directory for checkpoints, config.json and run logs
    #[arg(long, default_value = "runs/default")]
    pub working_dir: String,

    /// JSON file with training samples
    #[arg(long, default_value = "data/train.json")]
    pub train_file: String,

    /// Optional JSON file with validation records;
    /// MAP and MRR are reported per epoch when given
    #[arg(long)]
    pub val_file: Option<String>,

    /// Training objective: pairwise hard-negative mining or
    /// pointwise binary cross-entropy
    #[arg(long, value_enum, default_value = "pairwise")]
    pub objective: Objective,

    /// Number of full passes through the training data
    #[arg(long, default_value_t = 10)]
    pub epochs: usize,

    /// Number of samples processed together in one forward pass
    #[arg(long, default_value_t = 32)]
    pub batch_size: usize,

    /// How fast the model learns — too high causes instability,
    /// too low causes slow convergence
    #[arg(long, default_value_t = 1e-3)]
    pub lr: f64,

    /// Batches whose gradients are summed before each optimizer
    /// step; the effective batch size is batch_size times this
    #[arg(long, default_value_t = 1)]
    pub accumulate_batches: usize,

    /// Margin for the pairwise ranking loss
    #[arg(long, default_value_t = 0.2)]
    pub loss_margin: f64,

    /// Cutoff K for the MRR@K validation metric
    #[arg(long, default_value_t = 10)]
    pub rr_k: usize,

    /// Width of the hidden layers in the scoring network
    #[arg(long, default_value_t = 64)]
    pub hidden_dim: usize,

    /// Dropout probability applied after each hidden layer
    #[arg(long, default_value_t = 0.1)]
    pub dropout: f64,

    /// Seed for shuffling the training data
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// This is the boundary between Layer 1 and Layer 2 —
/// the application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            working_dir:        a.working_dir,
            train_file:         a.train_file,
            val_file:           a.val_file,
            objective:          a.objective,
            epochs:             a.epochs,
            batch_size:         a.batch_size,
            lr:                 a.lr,
            accumulate_batches: a.accumulate_batches,
            loss_margin:        a.loss_margin,
            rr_k:               a.rr_k,
            hidden_dim:         a.hidden_dim,
            dropout:            a.dropout,
            seed:               a.seed,
            // derived from the training file, never a flag
            input_dim:          0,
        }
    }
}

/// All arguments for the `evaluate` command
#[derive(Args, Debug)]
pub struct EvalArgs {
    /// Working directory of the training run to evaluate
    #[arg(long, default_value = "runs/default")]
    pub working_dir: String,

    /// JSON file with evaluation records and ID tables
    #[arg(long, default_value = "data/eval.json")]
    pub eval_file: String,

    /// Checkpoint epoch to load; defaults to the latest
    /// complete epoch
    #[arg(long)]
    pub epoch: Option<usize>,

    /// This worker's index, 0-based
    #[arg(long, default_value_t = 0)]
    pub rank: usize,

    /// Total number of evaluation workers
    #[arg(long, default_value_t = 1)]
    pub world_size: usize,

    /// How records are split across workers: `balanced` gives
    /// near-equal shard sizes, `query-cohesive` keeps each
    /// query's documents on one worker for exact metrics
    #[arg(long, value_enum, default_value = "query-cohesive")]
    pub strategy: PartitionStrategy,

    /// Number of records scored together in one forward pass
    #[arg(long, default_value_t = 32)]
    pub batch_size: usize,
}

impl From<EvalArgs> for EvalConfig {
    fn from(a: EvalArgs) -> Self {
        EvalConfig {
            working_dir: a.working_dir,
            eval_file:   a.eval_file,
            epoch:       a.epoch,
            rank:        a.rank,
            world_size:  a.world_size,
            strategy:    a.strategy,
            batch_size:  a.batch_size,
        }
    }
}

/// All arguments for the `export` command
#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Working directory containing predictions_{rank}.json shards
    #[arg(long, default_value = "runs/default")]
    pub working_dir: String,

    /// Path of the TREC run file to write
    #[arg(long, default_value = "runs/default/run.tsv")]
    pub out_file: String,

    /// Run name written as the last column of every TREC row
    #[arg(long, default_value = "neural-ranker")]
    pub run_name: String,
}

impl From<ExportArgs> for ExportConfig {
    fn from(a: ExportArgs) -> Self {
        ExportConfig {
            working_dir: a.working_dir,
            out_file:    a.out_file,
            run_name:    a.run_name,
        }
    }
}
