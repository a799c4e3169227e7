// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Pure Rust structs and traits that define the core concepts
// of the ranking harness.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, and traits
//
// Keeping this layer pure means prediction bookkeeping and
// sample types are testable without a GPU and independent
// of the tensor framework.

// Feature representations consumed by a scoring model
pub mod example;

// Query → document → score table with stable ordering
pub mod prediction;

// Training and evaluation sample types
pub mod record;

// Core abstractions (traits) that other layers implement
pub mod traits;
