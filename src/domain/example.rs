// ============================================================
// Layer 3 — Example Representation
// ============================================================
// An Example is the opaque input a scoring model turns into a
// single relevance score. Some models take one feature vector,
// others take several (e.g. separate query and document
// encodings), so Example is an enum with two variants instead
// of a single-vector struct plus a "has multiple inputs" flag.
// Every consumer matches on the variant once and applies the
// same operation to each field.

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

/// Feature representation of one query-document pair.
///
/// `Single` holds one feature vector, `Multi` holds an ordered
/// list of feature fields. All rows of a batch must use the
/// same variant with the same per-field dimensions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Example {
    /// One flat feature vector
    Single(Vec<f32>),
    /// Several feature fields, scored together
    Multi(Vec<Vec<f32>>),
}

impl Example {
    /// Number of feature fields (1 for `Single`).
    pub fn num_fields(&self) -> usize {
        match self {
            Example::Single(_) => 1,
            Example::Multi(fields) => fields.len(),
        }
    }

    /// Dimension of each field, in field order.
    pub fn field_dims(&self) -> Vec<usize> {
        match self {
            Example::Single(v) => vec![v.len()],
            Example::Multi(fields) => fields.iter().map(|f| f.len()).collect(),
        }
    }

    /// Total feature dimension across all fields.
    pub fn total_dim(&self) -> usize {
        self.field_dims().iter().sum()
    }

    /// Check that `other` has the same shape as `self`.
    ///
    /// Mixed variants or mismatched field dimensions within one
    /// dataset are a fatal precondition violation, not a
    /// recoverable state.
    pub fn check_same_shape(&self, other: &Example) -> Result<()> {
        ensure!(
            self.field_dims() == other.field_dims(),
            "example shape mismatch: {:?} vs {:?}",
            self.field_dims(),
            other.field_dims()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_dims() {
        let ex = Example::Single(vec![0.1, 0.2, 0.3]);
        assert_eq!(ex.num_fields(), 1);
        assert_eq!(ex.total_dim(), 3);
    }

    #[test]
    fn test_multi_dims() {
        let ex = Example::Multi(vec![vec![0.1, 0.2], vec![0.3, 0.4, 0.5]]);
        assert_eq!(ex.num_fields(), 2);
        assert_eq!(ex.field_dims(), vec![2, 3]);
        assert_eq!(ex.total_dim(), 5);
    }

    #[test]
    fn test_shape_check_rejects_mixed_variants() {
        let a = Example::Single(vec![0.1, 0.2]);
        let b = Example::Multi(vec![vec![0.1], vec![0.2]]);
        assert!(a.check_same_shape(&b).is_err());
    }

    #[test]
    fn test_serde_untagged_roundtrip() {
        // Single = flat array, Multi = array of arrays
        let single: Example = serde_json::from_str("[0.5, 1.0]").unwrap();
        assert_eq!(single, Example::Single(vec![0.5, 1.0]));

        let multi: Example = serde_json::from_str("[[0.5], [1.0, 2.0]]").unwrap();
        assert_eq!(multi, Example::Multi(vec![vec![0.5], vec![1.0, 2.0]]));
    }
}
