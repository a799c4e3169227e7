// ============================================================
// Layer 5 — Training Loops
// ============================================================
// Two loops sharing one contract: per epoch, append
// (epoch, mean_loss) to train.csv and save one checkpoint,
// strictly after all batches of the epoch are processed.
// Checkpoint epochs are dense and monotonic from 0.
//
//   train_pairwise — hard-negative mining: per batch, run the
//                    selector without gradient tracking, then
//                    re-score the positive against the selected
//                    hardest negative WITH tracking and take the
//                    mean margin loss.
//   train_bce      — pointwise binary cross-entropy on logits.
//
// Gradient accumulation: each batch loss is divided by
// `accumulate_batches` and its gradients summed into an
// accumulator; the optimizer steps once per
// `accumulate_batches` consecutive batches. This ordering is a
// correctness invariant. Gradients left over at the end of an
// epoch (a partial accumulation window) are discarded.

use anyhow::{ensure, Result};
use burn::{
    data::dataloader::DataLoaderBuilder,
    module::AutodiffModule,
    nn::loss::BinaryCrossEntropyLossConfig,
    optim::{AdamConfig, GradientsAccumulator, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::data::batcher::{PairBatcher, PointBatcher};
use crate::data::dataset::{EvalDataset, PairwiseDataset, PointwiseDataset};
use crate::infra::checkpoint::CheckpointManager;
use crate::infra::logging::TrainLogger;
use crate::infra::metrics::QueryGroups;
use crate::ml::loss::MarginLoss;
use crate::ml::model::{FeedForwardRanker, Scorer};
use crate::ml::predictor;
use crate::ml::selector::select_hardest;

/// Everything a loop step needs, passed explicitly instead of
/// living in ambient state.
pub struct TrainingContext<B: Backend> {
    pub device: B::Device,
    pub lr: f64,
    pub epochs: usize,
    pub batch_size: usize,
    pub accumulate_batches: usize,
    /// Cutoff for the per-epoch MRR@K validation metric
    pub rr_k: usize,
    /// Seed for training data shuffling
    pub seed: u64,
}

impl<B: Backend> TrainingContext<B> {
    fn validate(&self) -> Result<()> {
        ensure!(self.epochs > 0, "epochs must be at least 1");
        ensure!(self.batch_size > 0, "batch_size must be at least 1");
        ensure!(
            self.accumulate_batches > 0,
            "accumulate_batches must be at least 1"
        );
        Ok(())
    }
}

/// Train with pairwise hard-negative mining.
///
/// The validation set is optional; when absent, per-epoch metric
/// computation is skipped without error.
pub fn train_pairwise<B: AutodiffBackend>(
    mut model: FeedForwardRanker<B>,
    ctx: &TrainingContext<B>,
    criterion: &MarginLoss,
    train_ds: PairwiseDataset,
    val_ds: Option<EvalDataset>,
    logger: &TrainLogger,
    ckpt: &CheckpointManager,
) -> Result<FeedForwardRanker<B>> {
    ctx.validate()?;

    let train_loader = DataLoaderBuilder::new(PairBatcher::<B>::new(ctx.device.clone()))
        .batch_size(ctx.batch_size)
        .shuffle(ctx.seed)
        .num_workers(1)
        .build(train_ds);
    let val_loader = val_ds
        .map(|ds| predictor::eval_loader::<B::InnerBackend>(ds, ctx.batch_size, &ctx.device));

    let mut optim = AdamConfig::new().with_epsilon(1e-8).init();

    for epoch in 0..ctx.epochs {
        let mut accumulator = GradientsAccumulator::new();
        let mut accumulated = 0usize;
        let mut loss_sum = 0.0f64;
        let mut num_batches = 0usize;
        let mut last_batch = 0usize;

        for (i, batch) in train_loader.iter().enumerate() {
            // forward-only selection, no backward graph
            let hardest = select_hardest(&model, criterion, &batch.pos, &batch.negs)?;

            // tracked forward pass against the selected negative
            let pos_scores = model.score(&batch.pos);
            let neg_scores = model.score(&hardest);
            let loss =
                criterion.forward(pos_scores, neg_scores).mean() / ctx.accumulate_batches as f64;
            loss_sum += loss.clone().into_scalar().elem::<f64>();

            let grads = GradientsParams::from_grads(loss.backward(), &model);
            accumulator.accumulate(&model, grads);
            accumulated += 1;
            if accumulated == ctx.accumulate_batches {
                model = optim.step(ctx.lr, model, accumulator.grads());
                accumulated = 0;
            }

            num_batches += 1;
            last_batch = i;
        }

        let epoch_loss = mean_loss(loss_sum, num_batches);
        logger.log(epoch, epoch_loss)?;
        ckpt.save_epoch(&model, &optim, epoch, last_batch)?;
        tracing::info!("epoch {epoch}: loss {epoch_loss:.6}");

        if let Some(loader) = &val_loader {
            validate_epoch(&model.valid(), loader.as_ref(), ctx.rr_k, epoch)?;
        }
    }

    Ok(model)
}

/// Train with pointwise binary cross-entropy on logits.
pub fn train_bce<B: AutodiffBackend>(
    mut model: FeedForwardRanker<B>,
    ctx: &TrainingContext<B>,
    train_ds: PointwiseDataset,
    val_ds: Option<EvalDataset>,
    logger: &TrainLogger,
    ckpt: &CheckpointManager,
) -> Result<FeedForwardRanker<B>> {
    ctx.validate()?;

    let train_loader = DataLoaderBuilder::new(PointBatcher::<B>::new(ctx.device.clone()))
        .batch_size(ctx.batch_size)
        .shuffle(ctx.seed)
        .num_workers(1)
        .build(train_ds);
    let val_loader = val_ds
        .map(|ds| predictor::eval_loader::<B::InnerBackend>(ds, ctx.batch_size, &ctx.device));

    let criterion = BinaryCrossEntropyLossConfig::new()
        .with_logits(true)
        .init(&ctx.device);
    let mut optim = AdamConfig::new().with_epsilon(1e-8).init();

    for epoch in 0..ctx.epochs {
        let mut accumulator = GradientsAccumulator::new();
        let mut accumulated = 0usize;
        let mut loss_sum = 0.0f64;
        let mut num_batches = 0usize;
        let mut last_batch = 0usize;

        for (i, batch) in train_loader.iter().enumerate() {
            let logits = model.score(&batch.inputs);
            let loss =
                criterion.forward(logits, batch.labels.clone()) / ctx.accumulate_batches as f64;
            loss_sum += loss.clone().into_scalar().elem::<f64>();

            let grads = GradientsParams::from_grads(loss.backward(), &model);
            accumulator.accumulate(&model, grads);
            accumulated += 1;
            if accumulated == ctx.accumulate_batches {
                model = optim.step(ctx.lr, model, accumulator.grads());
                accumulated = 0;
            }

            num_batches += 1;
            last_batch = i;
        }

        let epoch_loss = mean_loss(loss_sum, num_batches);
        logger.log(epoch, epoch_loss)?;
        ckpt.save_epoch(&model, &optim, epoch, last_batch)?;
        tracing::info!("epoch {epoch}: loss {epoch_loss:.6}");

        if let Some(loader) = &val_loader {
            validate_epoch(&model.valid(), loader.as_ref(), ctx.rr_k, epoch)?;
        }
    }

    Ok(model)
}

fn mean_loss(loss_sum: f64, num_batches: usize) -> f64 {
    if num_batches > 0 {
        loss_sum / num_batches as f64
    } else {
        f64::NAN
    }
}

fn validate_epoch<B: Backend>(
    model: &impl Scorer<B>,
    loader: &dyn burn::data::dataloader::DataLoader<crate::data::batcher::EvalBatch<B>>,
    rr_k: usize,
    epoch: usize,
) -> Result<()> {
    let outputs = predictor::predict(model, loader)?;
    let metrics = QueryGroups::from_records(&outputs.q_ids, &outputs.predictions, &outputs.labels)
        .metrics(rr_k);
    tracing::info!(
        "epoch {epoch}: val_map {:.4}, val_mrr {:.4}",
        metrics.val_map,
        metrics.val_mrr
    );
    Ok(())
}
