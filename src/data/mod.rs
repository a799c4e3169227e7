// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything between the JSON interchange files on disk and the
// tensor batches the training/evaluation loops consume:
//
//   data files (JSON)
//       │
//       ▼
//   loader       → reads files, validates shape invariants
//       │
//       ▼
//   sampler      → partitions eval records across workers
//       │
//       ▼
//   datasets     → implement Burn's Dataset trait
//       │
//       ▼
//   batchers     → stack samples into device tensors
//       │
//       ▼
//   DataLoader   → feeds batches to the loops
//
// Each module is responsible for exactly one step.

/// Reads and validates the JSON data files
pub mod loader;

/// Partitions evaluation records across distributed workers
pub mod sampler;

/// Implements Burn's Dataset trait for all sample kinds
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;
