// ============================================================
// Layer 4 — Batchers
// ============================================================
// Implements Burn's Batcher trait to turn sample vectors into
// device tensors. ExampleBatch is the tensor-level counterpart
// of domain::Example: one variant per call convention, and all
// batch operations (candidate stacking, per-row selection)
// apply the SAME index bookkeeping to every field of the Multi
// variant, preserving row correspondence.
//
// Shape preconditions (same batch size everywhere, uniform
// field dimensions) are validated once by the data loader;
// the batchers assume them.

use burn::{
    data::dataloader::batcher::Batcher, prelude::*, tensor::backend::AutodiffBackend,
};

use crate::domain::example::Example;
use crate::domain::record::{EvalRecord, PairwiseSample, PointwiseSample};

// ─── ExampleBatch ─────────────────────────────────────────────────────────────
/// A batch of examples as device tensors, shape [batch, features]
/// per field.
#[derive(Debug, Clone)]
pub enum ExampleBatch<B: Backend> {
    Single(Tensor<B, 2>),
    Multi(Vec<Tensor<B, 2>>),
}

impl<B: Backend> ExampleBatch<B> {
    /// Stack per-row examples into field tensors.
    pub fn from_examples(examples: &[Example], device: &B::Device) -> Self {
        let batch_size = examples.len();
        match &examples[0] {
            Example::Single(first) => {
                let dim = first.len();
                let flat: Vec<f32> = examples
                    .iter()
                    .flat_map(|e| match e {
                        Example::Single(v) => v.iter().copied(),
                        Example::Multi(_) => unreachable!("mixed example variants in batch"),
                    })
                    .collect();
                ExampleBatch::Single(
                    Tensor::<B, 1>::from_floats(flat.as_slice(), device)
                        .reshape([batch_size, dim]),
                )
            }
            Example::Multi(first_fields) => {
                let fields = (0..first_fields.len())
                    .map(|f| {
                        let dim = first_fields[f].len();
                        let flat: Vec<f32> = examples
                            .iter()
                            .flat_map(|e| match e {
                                Example::Multi(fields) => fields[f].iter().copied(),
                                Example::Single(_) => {
                                    unreachable!("mixed example variants in batch")
                                }
                            })
                            .collect();
                        Tensor::<B, 1>::from_floats(flat.as_slice(), device)
                            .reshape([batch_size, dim])
                    })
                    .collect();
                ExampleBatch::Multi(fields)
            }
        }
    }

    pub fn batch_size(&self) -> usize {
        match self {
            ExampleBatch::Single(t) => t.dims()[0],
            ExampleBatch::Multi(fields) => fields[0].dims()[0],
        }
    }

    pub fn device(&self) -> B::Device {
        match self {
            ExampleBatch::Single(t) => t.device(),
            ExampleBatch::Multi(fields) => fields[0].device(),
        }
    }

    /// All fields concatenated along the feature axis,
    /// shape [batch, total_dim].
    pub fn concat_fields(&self) -> Tensor<B, 2> {
        match self {
            ExampleBatch::Single(t) => t.clone(),
            ExampleBatch::Multi(fields) => Tensor::cat(fields.clone(), 1),
        }
    }

    /// Interleave K candidate batches of size B into one batch of
    /// size B·K, grouped per row: rows i·K..(i+1)·K hold row i's
    /// candidates in candidate order. This layout lets a [B·K]
    /// loss vector reshape into [B, K] with row = positive index
    /// and column = candidate index.
    pub fn stack_candidates(candidates: &[Self]) -> Self {
        let b = candidates[0].batch_size();
        let k = candidates.len();
        Self::map_fields(candidates, |field_tensors| {
            let dim = field_tensors[0].dims()[1];
            Tensor::stack::<3>(field_tensors, 1).reshape([b * k, dim])
        })
    }

    /// Pick, for each row i, row i of candidate batch
    /// `indices[i]`. The same gather is applied to every field so
    /// multi-field examples stay row-aligned.
    pub fn select_per_row(candidates: &[Self], indices: &[usize]) -> Self {
        let b = candidates[0].batch_size();
        debug_assert_eq!(indices.len(), b, "one candidate index per row");

        let device = candidates[0].device();
        let idx: Vec<i32> = indices.iter().map(|&i| i as i32).collect();
        let idx = Tensor::<B, 1, Int>::from_ints(idx.as_slice(), &device).reshape([b, 1, 1]);

        Self::map_fields(candidates, |field_tensors| {
            let dim = field_tensors[0].dims()[1];
            let stacked = Tensor::stack::<3>(field_tensors, 1); // [b, k, dim]
            stacked
                .gather(1, idx.clone().repeat_dim(2, dim))
                .reshape([b, dim])
        })
    }

    /// Apply `op` to each field position across a slice of
    /// batches, rebuilding the same variant.
    fn map_fields(
        batches: &[Self],
        op: impl Fn(Vec<Tensor<B, 2>>) -> Tensor<B, 2>,
    ) -> Self {
        match &batches[0] {
            ExampleBatch::Single(_) => {
                let tensors = batches
                    .iter()
                    .map(|b| match b {
                        ExampleBatch::Single(t) => t.clone(),
                        ExampleBatch::Multi(_) => unreachable!("mixed batch variants"),
                    })
                    .collect();
                ExampleBatch::Single(op(tensors))
            }
            ExampleBatch::Multi(first_fields) => {
                let fields = (0..first_fields.len())
                    .map(|f| {
                        let tensors = batches
                            .iter()
                            .map(|b| match b {
                                ExampleBatch::Multi(fields) => fields[f].clone(),
                                ExampleBatch::Single(_) => unreachable!("mixed batch variants"),
                            })
                            .collect();
                        op(tensors)
                    })
                    .collect();
                ExampleBatch::Multi(fields)
            }
        }
    }
}

impl<B: AutodiffBackend> ExampleBatch<B> {
    /// The same batch on the inner (non-autodiff) backend, for
    /// forward passes that must not build a backward graph.
    pub fn inner(&self) -> ExampleBatch<B::InnerBackend> {
        match self {
            ExampleBatch::Single(t) => ExampleBatch::Single(t.clone().inner()),
            ExampleBatch::Multi(fields) => {
                ExampleBatch::Multi(fields.iter().map(|t| t.clone().inner()).collect())
            }
        }
    }
}

// ─── Pairwise batches ─────────────────────────────────────────────────────────
/// One pairwise training batch: a positive batch of size B and K
/// negative batches of size B, positionally aligned (row i of
/// every negative batch belongs to the same query as row i of
/// the positive batch).
#[derive(Debug, Clone)]
pub struct PairBatch<B: Backend> {
    pub pos: ExampleBatch<B>,
    pub negs: Vec<ExampleBatch<B>>,
}

#[derive(Clone, Debug)]
pub struct PairBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> PairBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<PairwiseSample, PairBatch<B>> for PairBatcher<B> {
    fn batch(&self, items: Vec<PairwiseSample>) -> PairBatch<B> {
        let positives: Vec<Example> = items.iter().map(|s| s.pos.clone()).collect();
        let num_negatives = items[0].num_negatives();

        let negs = (0..num_negatives)
            .map(|k| {
                let candidates: Vec<Example> =
                    items.iter().map(|s| s.negs[k].clone()).collect();
                ExampleBatch::from_examples(&candidates, &self.device)
            })
            .collect();

        PairBatch {
            pos: ExampleBatch::from_examples(&positives, &self.device),
            negs,
        }
    }
}

// ─── Pointwise batches ────────────────────────────────────────────────────────
/// One BCE training batch: inputs and binary labels.
#[derive(Debug, Clone)]
pub struct PointBatch<B: Backend> {
    pub inputs: ExampleBatch<B>,
    /// Relevance labels — shape: [batch]
    pub labels: Tensor<B, 1, Int>,
}

#[derive(Clone, Debug)]
pub struct PointBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> PointBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<PointwiseSample, PointBatch<B>> for PointBatcher<B> {
    fn batch(&self, items: Vec<PointwiseSample>) -> PointBatch<B> {
        let examples: Vec<Example> = items.iter().map(|s| s.example.clone()).collect();
        let labels: Vec<i32> = items.iter().map(|s| s.label as i32).collect();

        PointBatch {
            inputs: ExampleBatch::from_examples(&examples, &self.device),
            labels: Tensor::<B, 1, Int>::from_ints(labels.as_slice(), &self.device),
        }
    }
}

// ─── Evaluation batches ───────────────────────────────────────────────────────
/// One evaluation batch. IDs and labels never feed the model,
/// so they stay host-side.
#[derive(Debug, Clone)]
pub struct EvalBatch<B: Backend> {
    pub q_ids: Vec<i64>,
    pub doc_ids: Vec<i64>,
    pub inputs: ExampleBatch<B>,
    pub labels: Vec<i64>,
}

#[derive(Clone, Debug)]
pub struct EvalBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> EvalBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<EvalRecord, EvalBatch<B>> for EvalBatcher<B> {
    fn batch(&self, items: Vec<EvalRecord>) -> EvalBatch<B> {
        let examples: Vec<Example> = items.iter().map(|r| r.example.clone()).collect();

        EvalBatch {
            q_ids: items.iter().map(|r| r.q_id).collect(),
            doc_ids: items.iter().map(|r| r.doc_id).collect(),
            inputs: ExampleBatch::from_examples(&examples, &self.device),
            labels: items.iter().map(|r| r.label).collect(),
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::ndarray::NdArray;

    type TB = NdArray;

    fn device() -> <TB as Backend>::Device {
        Default::default()
    }

    fn single(v: Vec<f32>) -> Example {
        Example::Single(v)
    }

    #[test]
    fn test_from_examples_single() {
        let batch = ExampleBatch::<TB>::from_examples(
            &[single(vec![1.0, 2.0]), single(vec![3.0, 4.0])],
            &device(),
        );
        assert_eq!(batch.batch_size(), 2);
        let data: Vec<f32> = batch.concat_fields().into_data().to_vec().unwrap();
        assert_eq!(data, vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_stack_candidates_interleaves_per_row() {
        // two candidate batches of two rows each
        let c0 = ExampleBatch::<TB>::from_examples(
            &[single(vec![1.0]), single(vec![2.0])],
            &device(),
        );
        let c1 = ExampleBatch::<TB>::from_examples(
            &[single(vec![10.0]), single(vec![20.0])],
            &device(),
        );
        let stacked = ExampleBatch::stack_candidates(&[c0, c1]);
        assert_eq!(stacked.batch_size(), 4);
        // row-grouped: [row0 cand0, row0 cand1, row1 cand0, row1 cand1]
        let data: Vec<f32> = stacked.concat_fields().into_data().to_vec().unwrap();
        assert_eq!(data, vec![1.0, 10.0, 2.0, 20.0]);
    }

    #[test]
    fn test_select_per_row() {
        let c0 = ExampleBatch::<TB>::from_examples(
            &[single(vec![1.0]), single(vec![2.0])],
            &device(),
        );
        let c1 = ExampleBatch::<TB>::from_examples(
            &[single(vec![10.0]), single(vec![20.0])],
            &device(),
        );
        // row 0 takes candidate 1, row 1 takes candidate 0
        let selected = ExampleBatch::select_per_row(&[c0, c1], &[1, 0]);
        let data: Vec<f32> = selected.concat_fields().into_data().to_vec().unwrap();
        assert_eq!(data, vec![10.0, 2.0]);
    }

    #[test]
    fn test_select_per_row_multi_field_stays_aligned() {
        let mk = |a: f32, b: f32| Example::Multi(vec![vec![a], vec![b, b]]);
        let c0 = ExampleBatch::<TB>::from_examples(&[mk(1.0, 5.0), mk(2.0, 6.0)], &device());
        let c1 = ExampleBatch::<TB>::from_examples(&[mk(3.0, 7.0), mk(4.0, 8.0)], &device());

        let selected = ExampleBatch::select_per_row(&[c0, c1], &[1, 0]);
        match &selected {
            ExampleBatch::Multi(fields) => {
                let f0: Vec<f32> = fields[0].clone().into_data().to_vec().unwrap();
                let f1: Vec<f32> = fields[1].clone().into_data().to_vec().unwrap();
                // both fields pick candidate 1 for row 0, candidate 0 for row 1
                assert_eq!(f0, vec![3.0, 2.0]);
                assert_eq!(f1, vec![7.0, 7.0, 6.0, 6.0]);
            }
            ExampleBatch::Single(_) => panic!("expected multi-field batch"),
        }
    }

    #[test]
    fn test_pair_batcher_shapes() {
        let samples = vec![
            PairwiseSample {
                pos: single(vec![0.1, 0.2]),
                negs: vec![single(vec![0.3, 0.4]), single(vec![0.5, 0.6])],
            },
            PairwiseSample {
                pos: single(vec![0.7, 0.8]),
                negs: vec![single(vec![0.9, 1.0]), single(vec![1.1, 1.2])],
            },
        ];
        let batch = PairBatcher::<TB>::new(device()).batch(samples);
        assert_eq!(batch.pos.batch_size(), 2);
        assert_eq!(batch.negs.len(), 2);
        assert_eq!(batch.negs[0].batch_size(), 2);
    }
}
