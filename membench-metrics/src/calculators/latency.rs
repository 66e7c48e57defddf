//! Telemetry aggregations over stored rows.

use serde_json::json;

use membench_core::domain::{EvalResult, MetricResult};
use membench_core::Result;

use crate::calculators::{mean, percentile};
use crate::registry::{Metric, MetricContext};

fn telemetry_values(results: &[EvalResult], field: &str) -> Vec<f64> {
    results
        .iter()
        .filter_map(|r| r.telemetry_f64(field))
        .collect()
}

pub struct AvgSearchLatencyMetric;

impl Metric for AvgSearchLatencyMetric {
    fn name(&self) -> &str {
        "avg_search_latency_ms"
    }

    fn description(&self) -> &str {
        "Mean provider search latency"
    }

    fn compute(&self, results: &[EvalResult], _ctx: &MetricContext) -> Result<MetricResult> {
        let values = telemetry_values(results, "search_latency_ms");
        Ok(MetricResult::new(self.name(), mean(&values))
            .with_details(json!({"samples": values.len()})))
    }
}

pub struct AvgTotalLatencyMetric;

impl Metric for AvgTotalLatencyMetric {
    fn name(&self) -> &str {
        "avg_total_latency_ms"
    }

    fn description(&self) -> &str {
        "Mean end-to-end per-item latency"
    }

    fn compute(&self, results: &[EvalResult], _ctx: &MetricContext) -> Result<MetricResult> {
        let values = telemetry_values(results, "total_latency_ms");
        Ok(MetricResult::new(self.name(), mean(&values))
            .with_details(json!({"samples": values.len()})))
    }
}

pub struct P95LatencyMetric;

impl Metric for P95LatencyMetric {
    fn name(&self) -> &str {
        "p95_latency_ms"
    }

    fn description(&self) -> &str {
        "95th percentile of end-to-end per-item latency"
    }

    fn compute(&self, results: &[EvalResult], _ctx: &MetricContext) -> Result<MetricResult> {
        let mut values = telemetry_values(results, "total_latency_ms");
        values.sort_by(|a, b| a.partial_cmp(b).expect("latencies are finite"));
        Ok(MetricResult::new(self.name(), percentile(&values, 95.0))
            .with_details(json!({"samples": values.len()})))
    }
}

/// Mean provider score across every retrieved chunk.
pub struct AvgRetrievalScoreMetric;

impl Metric for AvgRetrievalScoreMetric {
    fn name(&self) -> &str {
        "avg_retrieval_score"
    }

    fn description(&self) -> &str {
        "Mean score over all retrieved chunks"
    }

    fn compute(&self, results: &[EvalResult], _ctx: &MetricContext) -> Result<MetricResult> {
        let scores: Vec<f64> = results
            .iter()
            .flat_map(|r| r.retrieved.iter().map(|c| c.score))
            .collect();
        Ok(MetricResult::new(self.name(), mean(&scores))
            .with_details(json!({"chunks": scores.len()})))
    }
}
