// ============================================================
// Layer 2 — ExportUseCase
// ============================================================
// Merges the prediction shards the evaluation workers left in
// the working directory and writes a single TREC run file:
//
//   Step 1: Find predictions_{rank}.json shards   (Layer 6)
//   Step 2: Merge into one prediction table       (Layer 6)
//   Step 3: Write the ranked TREC run file        (Layer 6)
//
// Merging restores exact rankings even when the evaluation ran
// under balanced partitioning, because all of a query's
// documents end up in the same table before ranking.

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

use crate::infra::export;

// ─── Export Configuration ─────────────────────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    pub working_dir: String,
    pub out_file:    String,
    /// Run name written as the last column of every TREC row
    pub run_name:    String,
}

// ─── ExportUseCase ────────────────────────────────────────────────────────────
pub struct ExportUseCase {
    config: ExportConfig,
}

impl ExportUseCase {
    pub fn new(config: ExportConfig) -> Self {
        Self { config }
    }

    /// Merge all shards and write the TREC run file
    pub fn execute(&self) -> Result<()> {
        let cfg = &self.config;

        let shards = export::find_shards(&cfg.working_dir)?;
        ensure!(
            !shards.is_empty(),
            "no prediction shards in '{}', run `evaluate` first",
            cfg.working_dir
        );
        tracing::info!("Merging {} prediction shard(s)", shards.len());

        let table = export::read_shards(&shards)?;
        export::write_trec_file(&cfg.out_file, &table, &cfg.run_name)?;
        tracing::info!("wrote TREC run file to '{}'", cfg.out_file);
        Ok(())
    }
}
