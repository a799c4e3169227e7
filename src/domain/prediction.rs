// ============================================================
// Layer 3 — Prediction Table
// ============================================================
// Accumulates scores per (query, document) pair during an
// evaluation pass and at merge time. Keys are the ORIGINAL
// string IDs — internal integer IDs never leave the data layer.
//
// Ordering matters: TREC ranks break score ties by insertion
// order, so the table preserves the order in which queries and
// documents were first seen. Re-inserting an existing pair
// overwrites the score but keeps the original position, which
// makes merging worker shards deterministic.

use std::collections::HashMap;

/// Scores for the documents of a single query, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct QueryPredictions {
    doc_order: Vec<String>,
    scores: HashMap<String, f64>,
}

impl QueryPredictions {
    /// Insert or overwrite the score for a document.
    pub fn insert(&mut self, doc_id: &str, score: f64) {
        if !self.scores.contains_key(doc_id) {
            self.doc_order.push(doc_id.to_string());
        }
        self.scores.insert(doc_id.to_string(), score);
    }

    pub fn len(&self) -> usize {
        self.doc_order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.doc_order.is_empty()
    }

    /// Documents ranked by score descending. Equal scores keep
    /// insertion order (stable sort), so rankings are reproducible.
    pub fn ranked(&self) -> Vec<(&str, f64)> {
        let mut docs: Vec<(&str, f64)> = self
            .doc_order
            .iter()
            .map(|d| (d.as_str(), self.scores[d]))
            .collect();
        docs.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        docs
    }
}

/// Query → document → score, preserving first-seen query order.
/// Built incrementally during evaluation or shard merging and
/// consumed once by the TREC exporter.
#[derive(Debug, Clone, Default)]
pub struct PredictionTable {
    query_order: Vec<String>,
    queries: HashMap<String, QueryPredictions>,
}

impl PredictionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite one (query, document, score) entry.
    pub fn insert(&mut self, q_id: &str, doc_id: &str, score: f64) {
        if !self.queries.contains_key(q_id) {
            self.query_order.push(q_id.to_string());
        }
        self.queries
            .entry(q_id.to_string())
            .or_default()
            .insert(doc_id, score);
    }

    pub fn num_queries(&self) -> usize {
        self.query_order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.query_order.is_empty()
    }

    /// Iterate queries in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &QueryPredictions)> {
        self.query_order
            .iter()
            .map(move |q| (q.as_str(), &self.queries[q]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ranked_sorts_by_score_descending() {
        let mut preds = QueryPredictions::default();
        preds.insert("d1", 0.2);
        preds.insert("d2", 0.9);
        preds.insert("d3", 0.5);

        let ranked = preds.ranked();
        let docs: Vec<&str> = ranked.iter().map(|(d, _)| *d).collect();
        assert_eq!(docs, vec!["d2", "d3", "d1"]);
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let mut preds = QueryPredictions::default();
        preds.insert("first", 0.5);
        preds.insert("second", 0.5);
        preds.insert("third", 0.5);

        let ranked = preds.ranked();
        let docs: Vec<&str> = ranked.iter().map(|(d, _)| *d).collect();
        assert_eq!(docs, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_overwrite_keeps_position() {
        let mut table = PredictionTable::new();
        table.insert("q1", "d1", 0.1);
        table.insert("q1", "d2", 0.2);
        // same pair again — overwrites score, keeps slot
        table.insert("q1", "d1", 0.9);

        let (_, preds) = table.iter().next().unwrap();
        assert_eq!(preds.len(), 2);
        let ranked = preds.ranked();
        assert_eq!(ranked[0], ("d1", 0.9));
    }

    #[test]
    fn test_query_order_preserved() {
        let mut table = PredictionTable::new();
        table.insert("q2", "d1", 0.5);
        table.insert("q1", "d1", 0.5);
        table.insert("q2", "d2", 0.3);

        let queries: Vec<&str> = table.iter().map(|(q, _)| q).collect();
        assert_eq!(queries, vec!["q2", "q1"]);
    }
}
