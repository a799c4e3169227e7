// ============================================================
// Layer 5 — Pairwise Loss
// ============================================================
// Margin ranking loss over (positive, negative) score pairs:
//
//   loss_i = max(0, margin - pos_i + neg_i)
//
// Zero once the positive outscores the negative by at least the
// margin; grows linearly as the negative closes in or overtakes.
// The per-row form is what the hard-negative selector maximises
// over candidates; the training loop takes the mean afterwards.

use burn::prelude::*;

/// Margin ranking loss. Cheap to copy; carries only the margin.
#[derive(Debug, Clone, Copy)]
pub struct MarginLoss {
    pub margin: f64,
}

impl MarginLoss {
    pub fn new(margin: f64) -> Self {
        Self { margin }
    }

    /// Per-row loss — shape [batch] in, shape [batch] out.
    pub fn forward<B: Backend>(
        &self,
        pos_scores: Tensor<B, 1>,
        neg_scores: Tensor<B, 1>,
    ) -> Tensor<B, 1> {
        (neg_scores - pos_scores).add_scalar(self.margin).clamp_min(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::ndarray::NdArray;

    type TB = NdArray;

    #[test]
    fn test_margin_loss_values() {
        let device = Default::default();
        let pos = Tensor::<TB, 1>::from_floats([0.5, 0.5, 0.5], &device);
        let neg = Tensor::<TB, 1>::from_floats([0.1, 0.6, 0.3], &device);

        let loss: Vec<f32> = MarginLoss::new(0.2)
            .forward(pos, neg)
            .into_data()
            .to_vec()
            .unwrap();

        // 0.2 - 0.5 + 0.1 < 0 → clamped to 0
        assert!((loss[0] - 0.0).abs() < 1e-6);
        assert!((loss[1] - 0.3).abs() < 1e-6);
        assert!((loss[2] - 0.0).abs() < 1e-6);
    }
}
