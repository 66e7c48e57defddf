pub mod answer;
pub mod code;
pub mod latency;
pub mod retrieval;
pub mod text;

pub use answer::*;
pub use code::*;
pub use latency::*;
pub use retrieval::*;
pub use text::*;

use std::sync::Arc;

use crate::registry::Metric;

pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Nearest-rank percentile over an already-sorted slice.
pub(crate) fn percentile(sorted_values: &[f64], percentile: f64) -> f64 {
    if sorted_values.is_empty() {
        return 0.0;
    }
    let index = (percentile / 100.0 * (sorted_values.len() - 1) as f64).round() as usize;
    sorted_values[index.min(sorted_values.len() - 1)]
}

/// Every built-in calculator; the default registry registers exactly
/// this set.
pub fn builtin() -> Vec<Arc<dyn Metric>> {
    let mut metrics: Vec<Arc<dyn Metric>> = vec![
        Arc::new(AccuracyMetric),
        Arc::new(GroupedAccuracyMetric::by_question_type()),
        Arc::new(GroupedAccuracyMetric::by_category()),
        Arc::new(AbstentionAccuracyMetric),
        Arc::new(F1Metric),
        Arc::new(Bleu1Metric),
        Arc::new(RougeLMetric),
        Arc::new(MrrMetric),
        Arc::new(FileMrrMetric),
        Arc::new(AvgSearchLatencyMetric),
        Arc::new(AvgTotalLatencyMetric),
        Arc::new(P95LatencyMetric),
        Arc::new(AvgRetrievalScoreMetric),
    ];
    for k in [1, 3, 5, 10] {
        metrics.push(Arc::new(PrecisionAtK::new(k)));
        metrics.push(Arc::new(RecallAtK::new(k)));
        metrics.push(Arc::new(NdcgAtK::new(k)));
        metrics.push(Arc::new(SuccessAtK::new(k)));
        metrics.push(Arc::new(FileRecallAtK::new(k)));
        metrics.push(Arc::new(IouAtK::new(k)));
    }
    metrics
}
