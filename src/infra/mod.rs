// ============================================================
// Layer 6 — Infrastructure
// ============================================================
// Filesystem side effects: checkpoints, run logs, metric
// aggregation, and prediction export. No layer above this one
// touches the disk directly except through these modules.

pub mod checkpoint;
pub mod export;
pub mod logging;
pub mod metrics;
