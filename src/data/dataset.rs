// ============================================================
// Layer 4 — Datasets
// ============================================================
// Implements Burn's Dataset trait for the three sample kinds so
// the DataLoader can pull batches from them. EvalDataset also
// owns the internal↔original ID maps and applies the worker
// partition produced by the query partitioner.

use anyhow::{Context, Result};
use burn::data::dataset::Dataset;

use crate::data::loader::EvalFile;
use crate::data::sampler::{partition, PartitionStrategy};
use crate::domain::record::{EvalRecord, PairwiseSample, PointwiseSample};
use crate::domain::traits::IdLookup;

pub struct PairwiseDataset {
    samples: Vec<PairwiseSample>,
}

impl PairwiseDataset {
    pub fn new(samples: Vec<PairwiseSample>) -> Self {
        Self { samples }
    }

    /// Negatives per positive (uniform across the dataset,
    /// enforced by the loader).
    pub fn num_negatives(&self) -> usize {
        self.samples.first().map(|s| s.num_negatives()).unwrap_or(0)
    }

    pub fn input_dim(&self) -> usize {
        self.samples.first().map(|s| s.pos.total_dim()).unwrap_or(0)
    }
}

impl Dataset<PairwiseSample> for PairwiseDataset {
    fn get(&self, index: usize) -> Option<PairwiseSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

pub struct PointwiseDataset {
    samples: Vec<PointwiseSample>,
}

impl PointwiseDataset {
    pub fn new(samples: Vec<PointwiseSample>) -> Self {
        Self { samples }
    }

    pub fn input_dim(&self) -> usize {
        self.samples
            .first()
            .map(|s| s.example.total_dim())
            .unwrap_or(0)
    }
}

impl Dataset<PointwiseSample> for PointwiseDataset {
    fn get(&self, index: usize) -> Option<PointwiseSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

/// Evaluation records plus the ID tables needed at export time.
#[derive(Debug, Clone)]
pub struct EvalDataset {
    records: Vec<EvalRecord>,
    orig_q_ids: Vec<String>,
    orig_doc_ids: Vec<String>,
}

impl EvalDataset {
    pub fn new(file: EvalFile) -> Self {
        Self {
            records: file.records,
            orig_q_ids: file.orig_q_ids,
            orig_doc_ids: file.orig_doc_ids,
        }
    }

    pub fn input_dim(&self) -> usize {
        self.records
            .first()
            .map(|r| r.example.total_dim())
            .unwrap_or(0)
    }

    /// Internal query ID of every record, in record order.
    pub fn query_ids(&self) -> Vec<i64> {
        self.records.iter().map(|r| r.q_id).collect()
    }

    /// Keep only the records assigned to `rank` out of
    /// `world_size` workers. The ID tables are shared by all
    /// workers and stay intact.
    pub fn shard(
        self,
        rank: usize,
        world_size: usize,
        strategy: PartitionStrategy,
    ) -> Result<Self> {
        if world_size <= 1 {
            return Ok(self);
        }

        let parts = partition(&self.query_ids(), world_size, strategy)?;
        let part = parts
            .get(rank)
            .with_context(|| format!("rank {rank} outside world of size {world_size}"))?;

        let mut keep: Vec<EvalRecord> = Vec::with_capacity(part.len());
        for &i in part {
            keep.push(self.records[i].clone());
        }
        tracing::info!(
            "worker {}/{} holds {} of {} eval records",
            rank,
            world_size,
            keep.len(),
            self.records.len()
        );

        Ok(Self {
            records: keep,
            orig_q_ids: self.orig_q_ids,
            orig_doc_ids: self.orig_doc_ids,
        })
    }
}

impl Dataset<EvalRecord> for EvalDataset {
    fn get(&self, index: usize) -> Option<EvalRecord> {
        self.records.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.records.len()
    }
}

impl IdLookup for EvalDataset {
    fn get_original_query_id(&self, q_id: i64) -> Result<&str> {
        self.orig_q_ids
            .get(q_id as usize)
            .map(String::as_str)
            .with_context(|| format!("unknown internal query id {q_id}"))
    }

    fn get_original_document_id(&self, doc_id: i64) -> Result<&str> {
        self.orig_doc_ids
            .get(doc_id as usize)
            .map(String::as_str)
            .with_context(|| format!("unknown internal document id {doc_id}"))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::example::Example;

    fn eval_fixture() -> EvalDataset {
        let records = (0..6)
            .map(|i| EvalRecord {
                q_id: (i / 2) as i64,
                doc_id: i as i64,
                example: Example::Single(vec![i as f32]),
                label: (i % 2) as i64,
            })
            .collect();
        EvalDataset {
            records,
            orig_q_ids: vec!["qa".into(), "qb".into(), "qc".into()],
            orig_doc_ids: (0..6).map(|i| format!("d{i}")).collect(),
        }
    }

    #[test]
    fn test_id_lookup() {
        let ds = eval_fixture();
        assert_eq!(ds.get_original_query_id(1).unwrap(), "qb");
        assert_eq!(ds.get_original_document_id(5).unwrap(), "d5");
        assert!(ds.get_original_query_id(99).is_err());
    }

    #[test]
    fn test_shard_world_of_one_is_identity() {
        let ds = eval_fixture();
        let ds = ds.shard(0, 1, PartitionStrategy::QueryCohesive).unwrap();
        assert_eq!(ds.len(), 6);
    }

    #[test]
    fn test_shard_rank_beyond_queries_is_empty() {
        // 3 queries over 5 workers: the surplus ranks hold
        // nothing, which is a valid state rather than an error
        let ds = eval_fixture()
            .shard(4, 5, PartitionStrategy::QueryCohesive)
            .unwrap();
        assert_eq!(ds.len(), 0);
        // the ID tables survive even on an empty shard
        assert_eq!(ds.get_original_query_id(0).unwrap(), "qa");
    }

    #[test]
    fn test_shard_cohesive_covers_all_records() {
        let mut total = 0;
        for rank in 0..2 {
            let ds = eval_fixture()
                .shard(rank, 2, PartitionStrategy::QueryCohesive)
                .unwrap();
            // each worker holds whole queries (2 records each)
            assert_eq!(ds.len() % 2, 0);
            total += ds.len();
        }
        assert_eq!(total, 6);
    }
}
