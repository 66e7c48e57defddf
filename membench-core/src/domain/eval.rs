use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::domain::SearchResult;
use crate::keys;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

/// Output of one evaluator or pack invocation for a single item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evaluation {
    pub answer: String,
    /// Always within [0, 1].
    pub score: f64,
    pub correct: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub judge_response: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer_latency_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub judge_latency_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
}

impl Evaluation {
    pub fn scored(answer: impl Into<String>, score: f64, correct: bool) -> Self {
        Self {
            answer: answer.into(),
            score: score.clamp(0.0, 1.0),
            correct,
            judge_response: None,
            reasoning: None,
            answer_latency_ms: None,
            judge_latency_ms: None,
            usage: None,
        }
    }

    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = Some(reasoning.into());
        self
    }

    pub fn with_judge_response(mut self, response: impl Into<String>) -> Self {
        self.judge_response = Some(response.into());
        self
    }
}

/// One persisted row: unique on `(run_id, benchmark, provider, item_id)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalResult {
    pub run_id: String,
    pub benchmark: String,
    pub provider: String,
    pub item_id: String,
    pub question: String,
    pub expected: String,
    pub actual: String,
    pub score: f64,
    pub correct: bool,
    pub retrieved: Vec<SearchResult>,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
    pub created_at: DateTime<Utc>,
}

impl EvalResult {
    pub fn question_type(&self) -> Option<&str> {
        self.metadata.get(keys::QUESTION_TYPE).and_then(Value::as_str)
    }

    pub fn category(&self) -> Option<String> {
        match self.metadata.get(keys::CATEGORY) {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn is_abstention(&self) -> bool {
        self.metadata
            .get(keys::IS_ABSTENTION)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Telemetry value recorded under `metadata.telemetry.{field}`.
    pub fn telemetry_f64(&self, field: &str) -> Option<f64> {
        self.metadata
            .get(keys::TELEMETRY)?
            .get(field)?
            .as_f64()
    }

    pub fn metadata_strings(&self, key: &str) -> Vec<String> {
        match self.metadata.get(key) {
            Some(Value::Array(values)) => values
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            Some(Value::String(s)) => vec![s.clone()],
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricResult {
    pub name: String,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl MetricResult {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
            details: None,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}
