// ============================================================
// Layer 6 — Prediction Shards and TREC Export
// ============================================================
// Every worker writes its own predictions_{rank}.json shard
// (disjoint file names — no shared-write race). A separate
// merge step unions all shards into one PredictionTable and
// renders it in the TREC run-file format:
//
//   query_id<TAB>Q0<TAB>doc_id<TAB>rank<TAB>score<TAB>run_name
//
// Rows of one query are contiguous and rank-ordered, ranks are
// 1-based, ties keep insertion order. Shards carry ORIGINAL
// string IDs; internal integer IDs are resolved before writing.

use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::prediction::PredictionTable;

/// One worker's predictions as parallel sequences, keyed by
/// original string IDs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PredictionShard {
    pub q_ids: Vec<String>,
    pub doc_ids: Vec<String>,
    pub predictions: Vec<f64>,
}

impl PredictionShard {
    pub fn push(&mut self, q_id: String, doc_id: String, prediction: f64) {
        self.q_ids.push(q_id);
        self.doc_ids.push(doc_id);
        self.predictions.push(prediction);
    }

    pub fn len(&self) -> usize {
        self.q_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.q_ids.is_empty()
    }
}

/// Rank-qualified shard file name inside the working directory.
pub fn shard_path(working_dir: impl AsRef<Path>, rank: usize) -> PathBuf {
    working_dir.as_ref().join(format!("predictions_{rank}.json"))
}

/// Write one worker's shard file.
pub fn write_shard(path: impl AsRef<Path>, shard: &PredictionShard) -> Result<()> {
    let path = path.as_ref();
    ensure!(
        shard.q_ids.len() == shard.doc_ids.len()
            && shard.q_ids.len() == shard.predictions.len(),
        "shard sequences are not parallel: {} q_ids, {} doc_ids, {} predictions",
        shard.q_ids.len(),
        shard.doc_ids.len(),
        shard.predictions.len()
    );

    let json = serde_json::to_string(shard)?;
    fs::write(path, json)
        .with_context(|| format!("cannot write prediction shard '{}'", path.display()))?;
    tracing::info!("wrote {} predictions to '{}'", shard.len(), path.display());
    Ok(())
}

/// Read and union shard files into one table. A (query, document)
/// pair recurring across shards overwrites the earlier score;
/// with correct partitioning this does not occur.
pub fn read_shards<P: AsRef<Path>>(files: &[P]) -> Result<PredictionTable> {
    let mut table = PredictionTable::new();
    for f in files {
        let path = f.as_ref();
        let json = fs::read_to_string(path)
            .with_context(|| format!("cannot read prediction shard '{}'", path.display()))?;
        let shard: PredictionShard = serde_json::from_str(&json)
            .with_context(|| format!("malformed prediction shard '{}'", path.display()))?;
        for ((q, d), &p) in shard
            .q_ids
            .iter()
            .zip(&shard.doc_ids)
            .zip(&shard.predictions)
        {
            table.insert(q, d, p);
        }
    }
    Ok(table)
}

/// All `predictions_*.json` shard files in a working directory,
/// sorted by file name for a deterministic merge order.
pub fn find_shards(working_dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let dir = working_dir.as_ref();
    let mut shards = Vec::new();
    for entry in fs::read_dir(dir)
        .with_context(|| format!("cannot read working dir '{}'", dir.display()))?
    {
        let path = entry?.path();
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        if name.starts_with("predictions_") && name.ends_with(".json") {
            shards.push(path);
        }
    }
    shards.sort();
    Ok(shards)
}

/// Write a TREC run file for the given predictions.
pub fn write_trec_file(
    path: impl AsRef<Path>,
    predictions: &PredictionTable,
    run_name: &str,
) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("cannot create '{}'", parent.display()))?;
    }

    let mut f = fs::File::create(path)
        .with_context(|| format!("cannot create TREC run file '{}'", path.display()))?;
    for (q_id, docs) in predictions.iter() {
        for (rank, (doc_id, score)) in docs.ranked().iter().enumerate() {
            writeln!(f, "{q_id}\tQ0\t{doc_id}\t{}\t{score}\t{run_name}", rank + 1)?;
        }
    }

    tracing::info!(
        "wrote TREC run file '{}' ({} queries)",
        path.display(),
        predictions.num_queries()
    );
    Ok(())
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> PredictionTable {
        let mut table = PredictionTable::new();
        table.insert("q1", "d1", 0.2);
        table.insert("q1", "d2", 0.9);
        table.insert("q2", "d3", 0.5);
        table
    }

    #[test]
    fn test_trec_rows_rank_ordered() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("run.tsv");
        write_trec_file(&out, &sample_table(), "test-run").unwrap();

        let content = fs::read_to_string(&out).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "q1\tQ0\td2\t1\t0.9\ttest-run");
        assert_eq!(lines[1], "q1\tQ0\td1\t2\t0.2\ttest-run");
        assert_eq!(lines[2], "q2\tQ0\td3\t1\t0.5\ttest-run");
    }

    #[test]
    fn test_trec_roundtrip_recovers_ranking() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("run.tsv");
        write_trec_file(&out, &sample_table(), "rt").unwrap();

        // re-parse: per query the doc order must equal the rank order
        let content = fs::read_to_string(&out).unwrap();
        let mut parsed: Vec<(String, String, usize)> = Vec::new();
        for line in content.lines() {
            let cols: Vec<&str> = line.split('\t').collect();
            assert_eq!(cols.len(), 6);
            assert_eq!(cols[1], "Q0");
            parsed.push((cols[0].into(), cols[2].into(), cols[3].parse().unwrap()));
        }

        for (q_id, docs) in sample_table().iter() {
            let from_file: Vec<(String, usize)> = parsed
                .iter()
                .filter(|(q, _, _)| q == q_id)
                .map(|(_, d, r)| (d.clone(), *r))
                .collect();
            for (i, (doc_id, _)) in docs.ranked().iter().enumerate() {
                assert_eq!(from_file[i], (doc_id.to_string(), i + 1));
            }
        }
    }

    #[test]
    fn test_shard_write_read_merge() {
        let dir = tempfile::tempdir().unwrap();

        let mut shard0 = PredictionShard::default();
        shard0.push("q1".into(), "d1".into(), 0.9);
        shard0.push("q1".into(), "d2".into(), 0.1);
        let mut shard1 = PredictionShard::default();
        shard1.push("q2".into(), "d1".into(), 0.4);

        write_shard(shard_path(dir.path(), 0), &shard0).unwrap();
        write_shard(shard_path(dir.path(), 1), &shard1).unwrap();

        let files = find_shards(dir.path()).unwrap();
        assert_eq!(files.len(), 2);

        let table = read_shards(&files).unwrap();
        assert_eq!(table.num_queries(), 2);
        let (q, docs) = table.iter().next().unwrap();
        assert_eq!(q, "q1");
        assert_eq!(docs.ranked()[0], ("d1", 0.9));
    }

    #[test]
    fn test_empty_shard_merges_cleanly() {
        // a worker with no assigned queries still writes a shard;
        // merging it must not disturb the table
        let dir = tempfile::tempdir().unwrap();

        let mut shard0 = PredictionShard::default();
        shard0.push("q1".into(), "d1".into(), 0.9);
        write_shard(shard_path(dir.path(), 0), &shard0).unwrap();
        write_shard(shard_path(dir.path(), 1), &PredictionShard::default()).unwrap();

        let files = find_shards(dir.path()).unwrap();
        assert_eq!(files.len(), 2);
        let table = read_shards(&files).unwrap();
        assert_eq!(table.num_queries(), 1);
    }

    #[test]
    fn test_misaligned_shard_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let shard = PredictionShard {
            q_ids: vec!["q1".into()],
            doc_ids: vec![],
            predictions: vec![0.5],
        };
        assert!(write_shard(shard_path(dir.path(), 0), &shard).is_err());
    }
}
