// ============================================================
// Layer 2 — EvaluateUseCase
// ============================================================
// Orchestrates one evaluation worker in order:
//
//   Step 1: Load the saved run config   (Layer 6 - infra)
//   Step 2: Load and shard eval data    (Layer 4 - data)
//   Step 3: Rebuild model + checkpoint  (Layers 5/6)
//   Step 4: Score every record          (Layer 5 - ml)
//   Step 5: Report metrics              (Layer 6 - infra)
//   Step 6: Write a prediction shard    (Layer 6 - infra)
//
// Several workers may run this use case concurrently with
// distinct ranks; each writes its own predictions_{rank}.json
// and the export step merges them afterwards.

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

use burn::data::dataset::Dataset;

use crate::data::dataset::EvalDataset;
use crate::data::loader;
use crate::data::sampler::PartitionStrategy;
use crate::domain::traits::IdLookup;
use crate::infra::checkpoint::CheckpointManager;
use crate::infra::export::{self, PredictionShard};
use crate::infra::metrics::QueryGroups;
use crate::ml::model::RankerConfig;
use crate::ml::predictor;

use super::train_use_case::TrainConfig;

type MyBackend = burn::backend::Wgpu;

// ─── Evaluation Configuration ─────────────────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalConfig {
    pub working_dir: String,
    pub eval_file:   String,
    /// Checkpoint epoch to evaluate; the latest complete epoch
    /// when unset
    pub epoch:       Option<usize>,
    pub rank:        usize,
    pub world_size:  usize,
    pub strategy:    PartitionStrategy,
    pub batch_size:  usize,
}

impl EvalConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(self.world_size > 0, "world_size must be at least 1");
        ensure!(
            self.rank < self.world_size,
            "rank {} outside world of size {}",
            self.rank,
            self.world_size
        );
        ensure!(self.batch_size > 0, "batch_size must be at least 1");
        Ok(())
    }
}

// ─── EvaluateUseCase ──────────────────────────────────────────────────────────
pub struct EvaluateUseCase {
    config: EvalConfig,
}

impl EvaluateUseCase {
    pub fn new(config: EvalConfig) -> Self {
        Self { config }
    }

    /// Run this worker's slice of the evaluation end to end
    pub fn execute(&self) -> Result<()> {
        let cfg = &self.config;
        cfg.validate()?;

        // ── Step 1: Load the saved training config ────────────────────────────
        let ckpt = CheckpointManager::new(&cfg.working_dir)?;
        let train_cfg: TrainConfig = ckpt.load_config()?;

        // ── Step 2: Load eval records and keep this worker's share ────────────
        tracing::info!("Loading evaluation records from '{}'", cfg.eval_file);
        let dataset = EvalDataset::new(loader::load_eval(&cfg.eval_file)?)
            .shard(cfg.rank, cfg.world_size, cfg.strategy)?;

        // a worker legitimately holds nothing when world_size
        // exceeds the query count; the merge step expects a
        // shard file from every rank either way
        if Dataset::len(&dataset) == 0 {
            tracing::info!("rank {} holds no eval records, writing an empty shard", cfg.rank);
            let path = export::shard_path(&cfg.working_dir, cfg.rank);
            export::write_shard(&path, &PredictionShard::default())?;
            return Ok(());
        }
        train_cfg.check_input_dim(dataset.input_dim())?;

        if cfg.world_size > 1 && cfg.strategy == PartitionStrategy::Balanced {
            // queries can straddle workers under this strategy
            tracing::warn!(
                "balanced partitioning splits query groups across workers; \
                 per-worker metrics are approximate, use `export` for exact ranking"
            );
        }

        // ── Step 3: Rebuild the model and load the checkpoint ─────────────────
        let epoch = match cfg.epoch {
            Some(e) => e,
            None => ckpt.latest_epoch()?,
        };
        let device = burn::backend::wgpu::WgpuDevice::default();
        let model = RankerConfig::new(train_cfg.input_dim)
            .with_hidden_dim(train_cfg.hidden_dim)
            .with_dropout(train_cfg.dropout)
            .init::<MyBackend>(&device);
        let model = ckpt.load_model::<MyBackend, _>(model, epoch, &device)?;

        // ── Step 4: Score every record in this shard ──────────────────────────
        let mut shard = PredictionShard::default();
        let groups;
        {
            let loader = predictor::eval_loader::<MyBackend>(
                dataset.clone(),
                cfg.batch_size,
                &device,
            );
            let outputs = predictor::predict(&model, loader.as_ref())?;

            // ── Step 5: Per-worker metrics ────────────────────────────────────
            groups =
                QueryGroups::from_records(&outputs.q_ids, &outputs.predictions, &outputs.labels);

            // ── Step 6: Shard rows carry the original string IDs ──────────────
            for ((q_id, doc_id), prediction) in outputs
                .q_ids
                .iter()
                .zip(&outputs.doc_ids)
                .zip(&outputs.predictions)
            {
                shard.push(
                    dataset.get_original_query_id(*q_id)?.to_string(),
                    dataset.get_original_document_id(*doc_id)?.to_string(),
                    *prediction,
                );
            }
        }

        let metrics = groups.metrics(train_cfg.rr_k);
        tracing::info!(
            "rank {}: val_map {:.4}, val_mrr {:.4} over {} predictions",
            cfg.rank,
            metrics.val_map,
            metrics.val_mrr,
            shard.len()
        );

        let path = export::shard_path(&cfg.working_dir, cfg.rank);
        export::write_shard(&path, &shard)?;
        tracing::info!("wrote predictions to '{}'", path.display());
        Ok(())
    }
}
