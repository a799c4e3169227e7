// ============================================================
// Layer 5 — Prediction Pass
// ============================================================
// Runs a scoring model over an evaluation set and collects the
// per-record outputs host-side. The outputs feed two consumers:
// the metric aggregator (grouped by internal query ID) and the
// shard exporter (internal IDs resolved to original strings).

use std::sync::Arc;

use anyhow::Result;
use burn::{
    data::dataloader::{DataLoader, DataLoaderBuilder},
    prelude::*,
};

use crate::data::batcher::{EvalBatch, EvalBatcher};
use crate::data::dataset::EvalDataset;
use crate::ml::model::Scorer;

/// Per-record outputs of one evaluation pass, as parallel
/// sequences in data-loader order.
#[derive(Debug, Clone, Default)]
pub struct EvalOutputs {
    pub q_ids: Vec<i64>,
    pub doc_ids: Vec<i64>,
    pub predictions: Vec<f64>,
    pub labels: Vec<i64>,
}

impl EvalOutputs {
    pub fn len(&self) -> usize {
        self.q_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.q_ids.is_empty()
    }
}

/// Build an evaluation DataLoader. No shuffling: evaluation
/// order must be reproducible across runs and workers.
pub fn eval_loader<B: Backend>(
    dataset: EvalDataset,
    batch_size: usize,
    device: &B::Device,
) -> Arc<dyn DataLoader<EvalBatch<B>>> {
    DataLoaderBuilder::new(EvalBatcher::<B>::new(device.clone()))
        .batch_size(batch_size)
        .num_workers(1)
        .build(dataset)
}

/// Score every batch of the loader and collect the outputs.
pub fn predict<B: Backend>(
    scorer: &impl Scorer<B>,
    loader: &dyn DataLoader<EvalBatch<B>>,
) -> Result<EvalOutputs> {
    let mut outputs = EvalOutputs::default();
    for batch in loader.iter() {
        let scores = scorer.score(&batch.inputs);
        let data = scores.into_data();

        outputs.q_ids.extend(batch.q_ids);
        outputs.doc_ids.extend(batch.doc_ids);
        outputs.predictions.extend(data.iter::<f64>());
        outputs.labels.extend(batch.labels);
    }
    Ok(outputs)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::EvalFile;
    use crate::domain::example::Example;
    use crate::domain::record::EvalRecord;
    use crate::ml::model::RankerConfig;
    use burn::backend::ndarray::NdArray;

    type TB = NdArray;

    #[test]
    fn test_predict_covers_every_record_in_order() {
        let device = Default::default();
        let records: Vec<EvalRecord> = (0..5)
            .map(|i| EvalRecord {
                q_id: i / 2,
                doc_id: i,
                example: Example::Single(vec![i as f32, 1.0]),
                label: 0,
            })
            .collect();
        let dataset = EvalDataset::new(EvalFile {
            orig_q_ids: (0..3).map(|i| format!("q{i}")).collect(),
            orig_doc_ids: (0..5).map(|i| format!("d{i}")).collect(),
            records,
        });

        let model = RankerConfig::new(2).init::<TB>(&device);
        let loader = eval_loader::<TB>(dataset, 2, &device);
        let outputs = predict(&model, loader.as_ref()).unwrap();

        assert_eq!(outputs.len(), 5);
        assert_eq!(outputs.doc_ids, vec![0, 1, 2, 3, 4]);
        assert_eq!(outputs.predictions.len(), 5);
    }
}
