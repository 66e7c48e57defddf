use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::domain::SearchDefaults;
use crate::keys;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SearchOptions {
    pub limit: usize,
    pub threshold: Option<f64>,
    pub include_chunks: bool,
}

impl From<&SearchDefaults> for SearchOptions {
    fn from(defaults: &SearchDefaults) -> Self {
        Self {
            limit: defaults.top_k,
            threshold: defaults.threshold,
            include_chunks: defaults.include_chunks,
        }
    }
}

/// One retrieved chunk. Scores are relevance-ordered but need not be
/// normalized across providers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    pub id: String,
    pub content: String,
    pub score: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub chunks: Vec<SearchResult>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, Value>,
}

impl SearchResult {
    pub fn new(id: impl Into<String>, content: impl Into<String>, score: f64) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            score,
            chunks: Vec::new(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// File path from chunk metadata (`filepath` preferred, `file` accepted).
    pub fn filepath(&self) -> Option<&str> {
        self.metadata
            .get(keys::FILEPATH)
            .or_else(|| self.metadata.get(keys::FILE))
            .and_then(Value::as_str)
    }

    /// 1-indexed inclusive line span from chunk metadata, when present.
    pub fn line_span(&self) -> Option<(u32, u32)> {
        let start = self.metadata.get(keys::START_LINE)?.as_u64()? as u32;
        let end = self.metadata.get(keys::END_LINE)?.as_u64()? as u32;
        Some((start, end))
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
