// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates a full training run in order:
//
//   Step 1: Load training data         (Layer 4 - data)
//   Step 2: Load validation data       (Layer 4 - data)
//   Step 3: Record run artifacts       (Layer 6 - infra)
//   Step 4: Build the model            (Layer 5 - ml)
//   Step 5: Run the training loop      (Layer 5 - ml)
//
// The config is written to {working_dir}/config.json before
// training starts so evaluation can rebuild the same model, and
// to args.csv for run bookkeeping.

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

use crate::data::dataset::{EvalDataset, PairwiseDataset, PointwiseDataset};
use crate::data::loader;
use crate::infra::checkpoint::CheckpointManager;
use crate::infra::logging::{save_args, TrainLogger};
use crate::ml::loss::MarginLoss;
use crate::ml::model::RankerConfig;
use crate::ml::trainer::{self, TrainingContext};

type MyBackend = burn::backend::Autodiff<burn::backend::Wgpu>;

// ─── Training Objective ───────────────────────────────────────────────────────
/// Which loss drives the run: pairwise hard-negative mining or
/// pointwise binary cross-entropy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Objective {
    Pairwise,
    Bce,
}

// ─── Training Configuration ───────────────────────────────────────────────────
// All hyperparameters for a training run.
// Serialisable so it can be saved to disk and reloaded for evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub working_dir:        String,
    pub train_file:         String,
    pub val_file:           Option<String>,
    pub objective:          Objective,
    pub epochs:             usize,
    pub batch_size:         usize,
    pub lr:                 f64,
    pub accumulate_batches: usize,
    pub loss_margin:        f64,
    pub rr_k:               usize,
    pub hidden_dim:         usize,
    pub dropout:            f64,
    pub seed:               u64,
    /// Feature dimension of the scoring model. Derived from the
    /// training file at run start and persisted so `evaluate`
    /// rebuilds the exact architecture; 0 means not yet derived.
    #[serde(default)]
    pub input_dim:          usize,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            working_dir:        "runs/default".to_string(),
            train_file:         "data/train.json".to_string(),
            val_file:           None,
            objective:          Objective::Pairwise,
            epochs:             10,
            batch_size:         32,
            lr:                 1e-3,
            accumulate_batches: 1,
            loss_margin:        0.2,
            rr_k:               10,
            hidden_dim:         64,
            dropout:            0.1,
            seed:               42,
            input_dim:          0,
        }
    }
}

impl TrainConfig {
    /// Reject configurations that would make the loop misbehave
    /// before any data is read.
    pub fn validate(&self) -> Result<()> {
        ensure!(self.epochs > 0, "epochs must be at least 1");
        ensure!(self.batch_size > 0, "batch_size must be at least 1");
        ensure!(
            self.accumulate_batches > 0,
            "accumulate_batches must be at least 1"
        );
        ensure!(self.lr > 0.0, "lr must be positive");
        ensure!(self.loss_margin >= 0.0, "loss_margin must be non-negative");
        ensure!(self.rr_k > 0, "rr_k must be at least 1");
        Ok(())
    }

    /// Confirm that a dataset's feature dimension matches the
    /// one this model was trained with.
    pub fn check_input_dim(&self, actual: usize) -> Result<()> {
        ensure!(
            actual == self.input_dim,
            "examples have dimension {actual}, model was trained with {}",
            self.input_dim
        );
        Ok(())
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
// Owns the config and runs the full training pipeline.
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Execute the full training pipeline end to end
    pub fn execute(&self) -> Result<()> {
        let cfg = &self.config;
        cfg.validate()?;

        // ── Step 2: Load validation data (shared by both objectives) ──────────
        let val_ds = cfg
            .val_file
            .as_deref()
            .map(|path| {
                tracing::info!("Loading validation records from '{path}'");
                loader::load_eval(path).map(EvalDataset::new)
            })
            .transpose()?;

        // ── Step 3: Prepare run artifacts ─────────────────────────────────────
        // args.csv and config.json are written inside the match
        // arms, once the feature dimension is known
        let logger = TrainLogger::new(&cfg.working_dir)?;
        let ckpt = CheckpointManager::new(&cfg.working_dir)?;

        let device = burn::backend::wgpu::WgpuDevice::default();
        let ctx = TrainingContext::<MyBackend> {
            device:             device.clone(),
            lr:                 cfg.lr,
            epochs:             cfg.epochs,
            batch_size:         cfg.batch_size,
            accumulate_batches: cfg.accumulate_batches,
            rr_k:               cfg.rr_k,
            seed:               cfg.seed,
        };

        // ── Steps 1, 4, 5: load, build, train ─────────────────────────────────
        match cfg.objective {
            Objective::Pairwise => {
                tracing::info!("Loading pairwise samples from '{}'", cfg.train_file);
                let train_ds = PairwiseDataset::new(loader::load_pairwise(&cfg.train_file)?);
                tracing::info!(
                    "Loaded {} pairs with {} negatives each",
                    burn::data::dataset::Dataset::len(&train_ds),
                    train_ds.num_negatives()
                );

                let input_dim = train_ds.input_dim();
                ensure!(input_dim > 0, "training samples have no features");
                self.persist_run_config(&ckpt, input_dim)?;
                let model = self.model_config(input_dim).init::<MyBackend>(&device);

                let criterion = MarginLoss::new(cfg.loss_margin);
                trainer::train_pairwise(model, &ctx, &criterion, train_ds, val_ds, &logger, &ckpt)?;
            }
            Objective::Bce => {
                tracing::info!("Loading pointwise samples from '{}'", cfg.train_file);
                let train_ds = PointwiseDataset::new(loader::load_pointwise(&cfg.train_file)?);
                tracing::info!(
                    "Loaded {} labelled samples",
                    burn::data::dataset::Dataset::len(&train_ds)
                );

                let input_dim = train_ds.input_dim();
                ensure!(input_dim > 0, "training samples have no features");
                self.persist_run_config(&ckpt, input_dim)?;
                let model = self.model_config(input_dim).init::<MyBackend>(&device);

                trainer::train_bce(model, &ctx, train_ds, val_ds, &logger, &ckpt)?;
            }
        }

        tracing::info!("Training complete, artifacts in '{}'", cfg.working_dir);
        Ok(())
    }

    /// Write args.csv and config.json with the derived feature
    /// dimension filled in, so `evaluate` can rebuild the model
    /// and reject mismatched data up front.
    fn persist_run_config(&self, ckpt: &CheckpointManager, input_dim: usize) -> Result<()> {
        let mut cfg = self.config.clone();
        cfg.input_dim = input_dim;
        save_args(&cfg.working_dir, &cfg)?;
        ckpt.save_config(&cfg)?;
        Ok(())
    }

    fn model_config(&self, input_dim: usize) -> RankerConfig {
        RankerConfig::new(input_dim)
            .with_hidden_dim(self.config.hidden_dim)
            .with_dropout(self.config.dropout)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_zero_epochs() {
        let cfg = TrainConfig {
            epochs: 0,
            ..TrainConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_accumulation() {
        let cfg = TrainConfig {
            accumulate_batches: 0,
            ..TrainConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_config_json_roundtrip() {
        let cfg = TrainConfig {
            objective: Objective::Bce,
            val_file: Some("data/val.json".to_string()),
            input_dim: 7,
            ..TrainConfig::default()
        };
        let json = serde_json::to_string(&cfg).unwrap();
        assert!(json.contains("\"bce\""));
        let back: TrainConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.objective, Objective::Bce);
        assert_eq!(back.val_file.as_deref(), Some("data/val.json"));
        assert_eq!(back.input_dim, 7);
    }

    #[test]
    fn test_check_input_dim() {
        let cfg = TrainConfig {
            input_dim: 4,
            ..TrainConfig::default()
        };
        assert!(cfg.check_input_dim(4).is_ok());
        // a mismatch must fail before any checkpoint is touched
        let err = cfg.check_input_dim(3).unwrap_err();
        assert!(err.to_string().contains("dimension 3"));
    }
}
