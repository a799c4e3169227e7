// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// One use case per CLI command. Use cases own their config,
// call down into data / ml / infra, and never parse arguments
// or format terminal output themselves.

pub mod evaluate_use_case;
pub mod export_use_case;
pub mod train_use_case;
