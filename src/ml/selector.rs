// ============================================================
// Layer 5 — Hard-Negative Selector
// ============================================================
// Given one batch of B positives and K aligned batches of
// candidate negatives, pick per row the candidate the model
// currently finds hardest (highest pairwise loss) — the one
// worth spending the backward pass on.
//
// The whole selection is a forward-only scan: positives are
// scored once, each score is replicated K times so it lines up
// with the row-interleaved concatenation of all candidates, the
// B·K per-row losses reshape into a B×K matrix (row = positive
// index, column = candidate index) and an arg-max along the
// candidate axis yields one winner per row. Selection runs on
// the inner backend so no backward graph is built for the B·K
// throwaway forward passes.
//
// Ties: arg-max takes the first maximal candidate. The selected
// LOSS value is invariant under candidate permutation; the
// index is implementation-defined on exact ties.

use anyhow::{ensure, Result};
use burn::{module::AutodiffModule, prelude::*, tensor::backend::AutodiffBackend};

use crate::data::batcher::ExampleBatch;
use crate::ml::loss::MarginLoss;
use crate::ml::model::Scorer;

/// Per-row index of the highest-loss candidate.
///
/// Preconditions (checked): at least one candidate batch, and
/// every candidate batch has the positive batch's size.
pub fn hardest_negative_indices<B: Backend>(
    scorer: &impl Scorer<B>,
    criterion: &MarginLoss,
    pos: &ExampleBatch<B>,
    negs: &[ExampleBatch<B>],
) -> Result<Vec<usize>> {
    ensure!(!negs.is_empty(), "no negative candidate batches");
    let b = pos.batch_size();
    let k = negs.len();
    for (i, neg) in negs.iter().enumerate() {
        ensure!(
            neg.batch_size() == b,
            "negative batch {} has size {}, positive batch has size {}",
            i,
            neg.batch_size(),
            b
        );
    }

    // positives scored once, each row replicated K times:
    // [p0, p0, …, p1, p1, …] aligns with the row-grouped
    // candidate stacking
    let pos_scores = scorer.score(pos); // [b]
    let pos_repeated = pos_scores
        .unsqueeze_dim::<2>(1)
        .repeat_dim(1, k)
        .reshape([b * k]);

    let candidates = ExampleBatch::stack_candidates(negs); // [b·k, …]
    let neg_scores = scorer.score(&candidates); // [b·k]

    let losses = criterion.forward(pos_repeated, neg_scores); // [b·k]
    let max_ids = losses.reshape([b, k]).argmax(1); // [b, 1]

    let data = max_ids.into_data();
    Ok(data.iter::<i64>().map(|i| i as usize).collect())
}

/// Build the hardest-negative batch for a training step.
///
/// Scoring runs on the inner backend (no gradient tracking);
/// the returned batch is gathered from the original autodiff
/// tensors so the subsequent scored forward pass is tracked.
pub fn select_hardest<B, M>(
    model: &M,
    criterion: &MarginLoss,
    pos: &ExampleBatch<B>,
    negs: &[ExampleBatch<B>],
) -> Result<ExampleBatch<B>>
where
    B: AutodiffBackend,
    M: AutodiffModule<B>,
    M::InnerModule: Scorer<B::InnerBackend>,
{
    let inner_negs: Vec<ExampleBatch<B::InnerBackend>> = negs.iter().map(|n| n.inner()).collect();
    let indices =
        hardest_negative_indices(&model.valid(), criterion, &pos.inner(), &inner_negs)?;
    Ok(ExampleBatch::select_per_row(negs, &indices))
}
