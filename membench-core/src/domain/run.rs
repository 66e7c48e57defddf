use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{EvalResult, MetricResult};

/// Persisted run row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub id: String,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    pub benchmarks: Vec<String>,
    pub providers: Vec<String>,
    pub config: Value,
}

impl RunRecord {
    pub fn new(id: impl Into<String>, benchmarks: Vec<String>, providers: Vec<String>) -> Self {
        Self {
            id: id.into(),
            started_at: Utc::now(),
            completed_at: None,
            benchmarks,
            providers,
            config: Value::Null,
        }
    }

    pub fn with_config(mut self, config: Value) -> Self {
        self.config = config;
        self
    }

    pub fn complete(&mut self) {
        self.completed_at = Some(Utc::now());
    }
}

/// Outcome of one (benchmark, provider) task. `accuracy` is retained for
/// backward compatibility; `metrics` is the first-class result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairReport {
    pub benchmark: String,
    pub provider: String,
    pub total_items: usize,
    pub completed_items: usize,
    pub failed_items: usize,
    pub accuracy: f64,
    pub metrics: Vec<MetricResult>,
    pub results: Vec<EvalResult>,
    /// Set when the pair aborted before finishing (provider construction
    /// or checkpoint failures); other pairs keep running.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PairReport {
    pub fn accuracy_of(results: &[EvalResult]) -> f64 {
        if results.is_empty() {
            return 0.0;
        }
        results.iter().filter(|r| r.correct).count() as f64 / results.len() as f64
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    pub pairs: Vec<PairReport>,
}

impl RunReport {
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            pairs: Vec::new(),
        }
    }
}
