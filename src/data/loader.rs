// ============================================================
// Layer 4 — Data File Loader
// ============================================================
// Reads the JSON interchange files into sample vectors and
// validates the batch invariants up front:
//
//   - every example in a file has the same shape
//   - every pairwise sample has the same number of negatives
//   - eval record IDs point into the original-ID tables
//
// Shape violations are fatal at load time so the training and
// selection code can assume aligned batches (fail fast instead
// of failing mid-epoch on a reshape).

use std::{fs, path::Path};

use anyhow::{bail, ensure, Context, Result};
use serde::Deserialize;

use crate::domain::record::{EvalRecord, PairwiseSample, PointwiseSample};

/// Pairwise train file: `{"pairs": [{"pos": .., "negs": [..]}]}`
#[derive(Debug, Deserialize)]
struct PairwiseFile {
    pairs: Vec<PairwiseSample>,
}

/// Pointwise train file: `{"samples": [{"example": .., "label": ..}]}`
#[derive(Debug, Deserialize)]
struct PointwiseFile {
    samples: Vec<PointwiseSample>,
}

/// Eval file: original-ID tables plus records with internal IDs.
#[derive(Debug, Deserialize)]
pub struct EvalFile {
    pub orig_q_ids: Vec<String>,
    pub orig_doc_ids: Vec<String>,
    pub records: Vec<EvalRecord>,
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("cannot read data file '{}'", path.display()))?;
    serde_json::from_str(&json)
        .with_context(|| format!("malformed data file '{}'", path.display()))
}

/// Load and validate a pairwise training set.
pub fn load_pairwise(path: impl AsRef<Path>) -> Result<Vec<PairwiseSample>> {
    let path = path.as_ref();
    let file: PairwiseFile = read_json(path)?;
    ensure!(!file.pairs.is_empty(), "'{}' contains no pairs", path.display());

    let reference = &file.pairs[0].pos;
    let num_negatives = file.pairs[0].num_negatives();
    ensure!(
        num_negatives > 0,
        "'{}': pairwise samples need at least one negative",
        path.display()
    );

    for (i, pair) in file.pairs.iter().enumerate() {
        if pair.num_negatives() != num_negatives {
            bail!(
                "'{}': pair {} has {} negatives, expected {}",
                path.display(),
                i,
                pair.num_negatives(),
                num_negatives
            );
        }
        reference
            .check_same_shape(&pair.pos)
            .with_context(|| format!("'{}': pair {} positive", path.display(), i))?;
        for (j, neg) in pair.negs.iter().enumerate() {
            reference
                .check_same_shape(neg)
                .with_context(|| format!("'{}': pair {} negative {}", path.display(), i, j))?;
        }
    }

    tracing::info!(
        "loaded {} pairwise samples ({} negatives each) from '{}'",
        file.pairs.len(),
        num_negatives,
        path.display()
    );
    Ok(file.pairs)
}

/// Load and validate a pointwise (BCE) training set.
pub fn load_pointwise(path: impl AsRef<Path>) -> Result<Vec<PointwiseSample>> {
    let path = path.as_ref();
    let file: PointwiseFile = read_json(path)?;
    ensure!(
        !file.samples.is_empty(),
        "'{}' contains no samples",
        path.display()
    );

    let reference = file.samples[0].example.clone();
    for (i, sample) in file.samples.iter().enumerate() {
        reference
            .check_same_shape(&sample.example)
            .with_context(|| format!("'{}': sample {}", path.display(), i))?;
    }

    tracing::info!(
        "loaded {} pointwise samples from '{}'",
        file.samples.len(),
        path.display()
    );
    Ok(file.samples)
}

/// Load and validate an evaluation set.
pub fn load_eval(path: impl AsRef<Path>) -> Result<EvalFile> {
    let path = path.as_ref();
    let file: EvalFile = read_json(path)?;
    ensure!(
        !file.records.is_empty(),
        "'{}' contains no records",
        path.display()
    );

    let reference = file.records[0].example.clone();
    for (i, record) in file.records.iter().enumerate() {
        reference
            .check_same_shape(&record.example)
            .with_context(|| format!("'{}': record {}", path.display(), i))?;
        ensure!(
            (record.q_id as usize) < file.orig_q_ids.len(),
            "'{}': record {} query id {} outside id table (len {})",
            path.display(),
            i,
            record.q_id,
            file.orig_q_ids.len()
        );
        ensure!(
            (record.doc_id as usize) < file.orig_doc_ids.len(),
            "'{}': record {} document id {} outside id table (len {})",
            path.display(),
            i,
            record.doc_id,
            file.orig_doc_ids.len()
        );
    }

    tracing::info!(
        "loaded {} eval records ({} queries, {} documents) from '{}'",
        file.records.len(),
        file.orig_q_ids.len(),
        file.orig_doc_ids.len(),
        path.display()
    );
    Ok(file)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_load_pairwise_ok() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "train.json",
            r#"{"pairs": [
                {"pos": [0.5, 0.1], "negs": [[0.2, 0.0], [0.1, 0.3]]},
                {"pos": [0.4, 0.2], "negs": [[0.9, 0.7], [0.0, 0.0]]}
            ]}"#,
        );
        let pairs = load_pairwise(path).unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].num_negatives(), 2);
    }

    #[test]
    fn test_load_pairwise_rejects_uneven_negatives() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "train.json",
            r#"{"pairs": [
                {"pos": [0.5], "negs": [[0.2], [0.1]]},
                {"pos": [0.4], "negs": [[0.9]]}
            ]}"#,
        );
        assert!(load_pairwise(path).is_err());
    }

    #[test]
    fn test_load_eval_rejects_out_of_range_ids() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "eval.json",
            r#"{"orig_q_ids": ["q1"], "orig_doc_ids": ["d1"],
                "records": [{"q_id": 0, "doc_id": 5, "example": [0.1], "label": 1}]}"#,
        );
        assert!(load_eval(path).is_err());
    }

    #[test]
    fn test_load_eval_multi_field_examples() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "eval.json",
            r#"{"orig_q_ids": ["q1"], "orig_doc_ids": ["d1", "d2"],
                "records": [
                    {"q_id": 0, "doc_id": 0, "example": [[0.1, 0.2], [0.3]], "label": 1},
                    {"q_id": 0, "doc_id": 1, "example": [[0.0, 0.1], [0.9]], "label": 0}
                ]}"#,
        );
        let file = load_eval(path).unwrap();
        assert_eq!(file.records.len(), 2);
        assert_eq!(file.records[0].example.num_fields(), 2);
    }
}
