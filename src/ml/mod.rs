// ============================================================
// Layer 5 — Machine Learning
// ============================================================
// Model, losses, and the training/evaluation loops. Everything
// generic over the Burn backend so tests run on ndarray while
// the binary runs on wgpu.

pub mod loss;
pub mod model;
pub mod predictor;
pub mod selector;
pub mod trainer;
