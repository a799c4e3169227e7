// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All business logic is delegated to Layer 2 (application).
//
// Three commands are supported:
//   1. `train`    — trains a ranking model and checkpoints it
//   2. `evaluate` — scores eval records with a checkpoint
//   3. `export`   — merges prediction shards into a TREC run

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, EvalArgs, ExportArgs, TrainArgs};

/// The main CLI struct — clap reads the fields and generates
/// argument parsing code automatically via the Parser derive macro.
#[derive(Parser, Debug)]
#[command(
    name = "neural-ranker",
    version = "0.1.0",
    about = "Train, evaluate and export neural ranking models."
)]
pub struct Cli {
    /// The subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use case.
    /// This keeps the CLI layer thin — it only routes, never computes.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)    => Self::run_train(args),
            Commands::Evaluate(args) => Self::run_evaluate(args),
            Commands::Export(args)   => Self::run_export(args),
        }
    }

    fn run_train(args: TrainArgs) -> Result<()> {
        use crate::application::train_use_case::TrainUseCase;

        tracing::info!("Starting training run in: {}", args.working_dir);
        TrainUseCase::new(args.into()).execute()?;
        println!("Training complete.");
        Ok(())
    }

    fn run_evaluate(args: EvalArgs) -> Result<()> {
        use crate::application::evaluate_use_case::EvaluateUseCase;

        EvaluateUseCase::new(args.into()).execute()?;
        println!("Evaluation complete.");
        Ok(())
    }

    fn run_export(args: ExportArgs) -> Result<()> {
        use crate::application::export_use_case::ExportUseCase;

        let out_file = args.out_file.clone();
        ExportUseCase::new(args.into()).execute()?;
        println!("Run file written to {out_file}");
        Ok(())
    }
}
