// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// Seams between the data layer and everything that consumes it.
// Export and evaluation code only talk to these traits, never
// to a concrete dataset type, so a different storage backend
// can be dropped in without touching the metric or export code.

use anyhow::Result;

// ─── IdLookup ─────────────────────────────────────────────────────────────────
/// Bidirectional mapping owner between dense internal integer
/// IDs and the original external string IDs.
///
/// Implementations:
///   - EvalDataset → maps through its loaded ID tables
pub trait IdLookup {
    /// Original string ID for an internal query ID.
    fn get_original_query_id(&self, q_id: i64) -> Result<&str>;

    /// Original string ID for an internal document ID.
    fn get_original_document_id(&self, doc_id: i64) -> Result<&str>;
}
