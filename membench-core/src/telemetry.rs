//! Per-item latency and token capture.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Instant;

use crate::keys;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Telemetry {
    pub search_latency_ms: u64,
    pub total_latency_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer_latency_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub judge_latency_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_tokens: Option<u32>,
}

impl Telemetry {
    /// Records the telemetry under `metadata.telemetry`.
    pub fn merge_into(&self, metadata: &mut HashMap<String, Value>) {
        if let Ok(value) = serde_json::to_value(self) {
            metadata.insert(keys::TELEMETRY.to_string(), value);
        }
    }
}

/// Monotonic stopwatch.
pub struct Timer(Instant);

impl Timer {
    pub fn start() -> Self {
        Self(Instant::now())
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.0.elapsed().as_millis() as u64
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::start()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_writes_telemetry_key() {
        let telemetry = Telemetry {
            search_latency_ms: 12,
            total_latency_ms: 40,
            answer_latency_ms: Some(20),
            ..Default::default()
        };
        let mut metadata = HashMap::new();
        telemetry.merge_into(&mut metadata);

        let stored = metadata.get(keys::TELEMETRY).unwrap();
        assert_eq!(stored.get("search_latency_ms").unwrap().as_u64(), Some(12));
        assert_eq!(stored.get("answer_latency_ms").unwrap().as_u64(), Some(20));
        assert!(stored.get("judge_latency_ms").is_none());
    }
}
