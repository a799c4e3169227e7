// ============================================================
// Layer 5 — Scoring Model
// ============================================================
// The harness only needs a model that maps a batch of examples
// to a batch of scalar relevance scores; everything else
// (selection, loops, metrics) is architecture-agnostic behind
// the Scorer trait. The bundled implementation is a small
// feed-forward network over the concatenated feature fields —
// enough to exercise the full pipeline end to end. Heavier
// architectures plug in by implementing Scorer.

use burn::{
    nn::{Dropout, DropoutConfig, Linear, LinearConfig},
    prelude::*,
    tensor::activation::relu,
};

use crate::data::batcher::ExampleBatch;

// ─── Scorer ───────────────────────────────────────────────────────────────────
/// Batch of examples in, one raw (unbounded) relevance score per
/// row out. Scores are only ever compared or fed to a loss, so
/// no squashing is applied here.
pub trait Scorer<B: Backend> {
    /// Shape: [batch] scores for a [batch, …] input.
    fn score(&self, inputs: &ExampleBatch<B>) -> Tensor<B, 1>;
}

// ─── FeedForwardRanker ────────────────────────────────────────────────────────
#[derive(Config, Debug)]
pub struct RankerConfig {
    /// Total feature dimension across all example fields
    pub input_dim: usize,
    #[config(default = 64)]
    pub hidden_dim: usize,
    #[config(default = 0.1)]
    pub dropout: f64,
}

impl RankerConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> FeedForwardRanker<B> {
        FeedForwardRanker {
            input: LinearConfig::new(self.input_dim, self.hidden_dim).init(device),
            hidden: LinearConfig::new(self.hidden_dim, self.hidden_dim).init(device),
            output: LinearConfig::new(self.hidden_dim, 1).init(device),
            dropout: DropoutConfig::new(self.dropout).init(),
        }
    }
}

/// Two hidden layers with ReLU, one scalar output per row.
#[derive(Module, Debug)]
pub struct FeedForwardRanker<B: Backend> {
    pub input: Linear<B>,
    pub hidden: Linear<B>,
    pub output: Linear<B>,
    pub dropout: Dropout,
}

impl<B: Backend> FeedForwardRanker<B> {
    /// features: [batch, input_dim] → scores: [batch]
    pub fn forward(&self, features: Tensor<B, 2>) -> Tensor<B, 1> {
        let x = self.dropout.forward(relu(self.input.forward(features)));
        let x = self.dropout.forward(relu(self.hidden.forward(x)));
        self.output.forward(x).flatten::<1>(0, 1)
    }
}

impl<B: Backend> Scorer<B> for FeedForwardRanker<B> {
    fn score(&self, inputs: &ExampleBatch<B>) -> Tensor<B, 1> {
        // multi-field examples are concatenated along the feature
        // axis before the first layer
        self.forward(inputs.concat_fields())
    }
}
