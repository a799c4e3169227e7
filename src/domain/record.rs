// ============================================================
// Layer 3 — Sample Types
// ============================================================
// Plain sample structs produced by the data layer and consumed
// by the batchers. All of them are created per training step
// or evaluation pass and discarded afterwards.

use serde::{Deserialize, Serialize};

use crate::domain::example::Example;

/// One pairwise training sample: a positive example and its
/// candidate negatives for the same query.
///
/// Invariant: every sample in a dataset carries the same number
/// of negatives, and all examples share one shape. The loader
/// checks this once at load time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairwiseSample {
    pub pos: Example,
    pub negs: Vec<Example>,
}

impl PairwiseSample {
    pub fn num_negatives(&self) -> usize {
        self.negs.len()
    }
}

/// One pointwise training sample for the binary cross-entropy
/// loop: an example and its binary relevance label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointwiseSample {
    pub example: Example,
    pub label: i64,
}

/// One evaluation record: internal query/document IDs, the
/// input representation, and a relevance label.
///
/// IDs are dense integers owned by the dataset; the mapping
/// back to original string IDs happens only at export time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalRecord {
    pub q_id: i64,
    pub doc_id: i64,
    pub example: Example,
    pub label: i64,
}
