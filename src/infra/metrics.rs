// ============================================================
// Layer 6 — Ranking Metrics
// ============================================================
// Information retrieval metrics over per-query predictions.
//
// | Metric | What it measures                              | Range   |
// |--------|-----------------------------------------------|---------|
// | MAP    | Mean average precision over all queries       | 0.0-1.0 |
// | MRR@k  | Reciprocal rank of first relevant item, top k | 0.0-1.0 |
//
// Ranking metrics only make sense over the COMPLETE set of
// documents for a query, so predictions scattered across
// batches are first regrouped by query ID. QueryGroups is that
// grouping: built once per evaluation pass, owned by the
// aggregation call, discarded after the metrics are produced.
//
// Ranking sorts by score descending; equal scores keep their
// original order (stable sort), which keeps results reproducible
// across runs.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Scalar metrics of one evaluation pass.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RankingMetrics {
    /// Mean average precision
    pub val_map: f64,
    /// Mean reciprocal rank at the configured cutoff
    pub val_mrr: f64,
}

/// Per-batch predictions regrouped by internal query ID.
///
/// Insertion order of queries and of documents within a query
/// is preserved; it is the tie-break order for equal scores.
#[derive(Debug, Default)]
pub struct QueryGroups {
    order: Vec<i64>,
    groups: HashMap<i64, (Vec<f64>, Vec<i64>)>,
}

impl QueryGroups {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one (query, prediction, label) record.
    pub fn push(&mut self, q_id: i64, prediction: f64, label: i64) {
        if !self.groups.contains_key(&q_id) {
            self.order.push(q_id);
        }
        let group = self.groups.entry(q_id).or_default();
        group.0.push(prediction);
        group.1.push(label);
    }

    /// Build groups from parallel record sequences.
    pub fn from_records(q_ids: &[i64], predictions: &[f64], labels: &[i64]) -> Self {
        debug_assert_eq!(q_ids.len(), predictions.len());
        debug_assert_eq!(q_ids.len(), labels.len());
        let mut groups = Self::new();
        for ((&q, &p), &l) in q_ids.iter().zip(predictions).zip(labels) {
            groups.push(q, p, l);
        }
        groups
    }

    pub fn num_queries(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Average per-query AP and RR@k over all queries.
    pub fn metrics(&self, rr_k: usize) -> RankingMetrics {
        if self.order.is_empty() {
            return RankingMetrics::default();
        }

        let mut aps = Vec::with_capacity(self.order.len());
        let mut rrs = Vec::with_capacity(self.order.len());
        for q_id in &self.order {
            let (predictions, labels) = &self.groups[q_id];
            aps.push(average_precision(predictions, labels));
            rrs.push(reciprocal_rank(predictions, labels, rr_k));
        }

        RankingMetrics {
            val_map: mean(&aps),
            val_mrr: mean(&rrs),
        }
    }
}

/// Indices of `predictions` sorted by score descending.
/// Stable: equal scores keep their original index order.
fn ranked_indices(predictions: &[f64]) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..predictions.len()).collect();
    indices.sort_by(|&a, &b| {
        predictions[b]
            .partial_cmp(&predictions[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    indices
}

/// Average precision for one query.
///
/// Documents are ranked by predicted score descending; AP is the
/// mean of precision@k over every position k holding a relevant
/// document (label > 0). A query without any relevant document
/// has AP = 0 by definition — not an error.
pub fn average_precision(predictions: &[f64], labels: &[i64]) -> f64 {
    let num_relevant = labels.iter().filter(|&&l| l > 0).count();
    if num_relevant == 0 {
        return 0.0;
    }

    let mut relevant_seen = 0usize;
    let mut precision_sum = 0.0;
    for (rank, &idx) in ranked_indices(predictions).iter().enumerate() {
        if labels[idx] > 0 {
            relevant_seen += 1;
            precision_sum += relevant_seen as f64 / (rank as f64 + 1.0);
        }
    }

    precision_sum / num_relevant as f64
}

/// Reciprocal rank of the first relevant document within the
/// top `k` ranked positions; 0 if none is found there.
pub fn reciprocal_rank(predictions: &[f64], labels: &[i64], k: usize) -> f64 {
    for (rank, &idx) in ranked_indices(predictions).iter().take(k).enumerate() {
        if labels[idx] > 0 {
            return 1.0 / (rank as f64 + 1.0);
        }
    }
    0.0
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_ap_perfect_ranking() {
        // single relevant document ranked first
        let ap = average_precision(&[0.9, 0.1], &[1, 0]);
        assert!((ap - 1.0).abs() < EPS);
    }

    #[test]
    fn test_ap_relevant_ranked_second() {
        // relevant document at rank 2 → AP = 1/2
        let ap = average_precision(&[0.9, 0.1], &[0, 1]);
        assert!((ap - 0.5).abs() < EPS);
    }

    #[test]
    fn test_ap_no_relevant_documents() {
        let ap = average_precision(&[0.9, 0.1], &[0, 0]);
        assert_eq!(ap, 0.0);
    }

    #[test]
    fn test_ap_multiple_relevant() {
        // relevant at ranks 1 and 3: AP = (1/1 + 2/3) / 2
        let ap = average_precision(&[0.9, 0.5, 0.4, 0.1], &[1, 0, 1, 0]);
        let expected = (1.0 + 2.0 / 3.0) / 2.0;
        assert!((ap - expected).abs() < EPS);
    }

    #[test]
    fn test_rr_cutoff() {
        // relevant at rank 3, cutoff 2 → 0
        let preds = [0.9, 0.8, 0.7];
        let labels = [0, 0, 1];
        assert_eq!(reciprocal_rank(&preds, &labels, 2), 0.0);
        let rr = reciprocal_rank(&preds, &labels, 10);
        assert!((rr - 1.0 / 3.0).abs() < EPS);
    }

    #[test]
    fn test_rr_ties_keep_input_order() {
        // all scores equal → ranking is input order
        let rr = reciprocal_rank(&[0.5, 0.5, 0.5], &[0, 1, 0], 10);
        assert!((rr - 0.5).abs() < EPS);
    }

    #[test]
    fn test_two_query_scenario() {
        // q1: d1(label 1, 0.9) ranked first → AP 1.0, RR 1.0
        // q2: d2(label 1, 0.1) ranked second → AP 0.5, RR 0.5
        let q_ids = [1, 1, 2, 2];
        let preds = [0.9, 0.1, 0.9, 0.1];
        let labels = [1, 0, 0, 1];

        let groups = QueryGroups::from_records(&q_ids, &preds, &labels);
        let m = groups.metrics(10);
        assert!((m.val_map - 0.75).abs() < EPS);
        assert!((m.val_mrr - 0.75).abs() < EPS);
    }

    #[test]
    fn test_aggregation_invariant_under_record_permutation() {
        let q_ids = [1, 1, 2, 2, 2];
        let preds = [0.9, 0.1, 0.3, 0.7, 0.5];
        let labels = [1, 0, 1, 0, 1];

        let base = QueryGroups::from_records(&q_ids, &preds, &labels).metrics(10);

        // interleave the two queries differently
        let q_ids_p = [2, 1, 2, 1, 2];
        let preds_p = [0.3, 0.9, 0.7, 0.1, 0.5];
        let labels_p = [1, 1, 0, 0, 1];
        let perm = QueryGroups::from_records(&q_ids_p, &preds_p, &labels_p).metrics(10);

        assert!((base.val_map - perm.val_map).abs() < EPS);
        assert!((base.val_mrr - perm.val_mrr).abs() < EPS);
    }

    #[test]
    fn test_empty_groups() {
        let m = QueryGroups::new().metrics(10);
        assert_eq!(m.val_map, 0.0);
        assert_eq!(m.val_mrr, 0.0);
    }
}
