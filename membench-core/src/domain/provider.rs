use serde::{Deserialize, Serialize};
use validator::Validate;

// ===== Provider Flavors =====

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// `bearer` or `header`.
    pub scheme: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub header: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    pub add: String,
    pub search: String,
    pub clear: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            add: "/add".to_string(),
            search: "/search".to_string(),
            clear: "/clear".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ProviderKind {
    /// Remote service reached over HTTP.
    Hosted {
        url: String,
        #[serde(default)]
        auth: Option<AuthConfig>,
        #[serde(default)]
        endpoints: EndpointConfig,
    },
    /// In-process adapter resolved by name.
    Local { adapter: String },
    /// Service managed through a compose manifest.
    Container {
        compose_file: String,
        service: String,
        #[serde(default)]
        healthcheck: Option<String>,
    },
}

// ===== Scoping =====

/// How the per-pair `run_tag` is derived from `(benchmark, run_id)`.
/// The tag isolates one run's provider-side state so it can be cleared
/// on exit without touching other runs.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ScopingPolicy {
    #[default]
    BenchmarkRun,
    BenchmarkOnly,
    RunOnly,
}

impl ScopingPolicy {
    pub fn run_tag(&self, benchmark: &str, run_id: &str) -> String {
        match self {
            ScopingPolicy::BenchmarkRun => format!("{benchmark}-{run_id}"),
            ScopingPolicy::BenchmarkOnly => benchmark.to_string(),
            ScopingPolicy::RunOnly => run_id.to_string(),
        }
    }
}

// ===== Capabilities & Rate Limits =====

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Capabilities {
    #[serde(default)]
    pub supports_chunks: bool,
    #[serde(default)]
    pub supports_batch: bool,
    #[serde(default)]
    pub supports_metadata: bool,
    #[serde(default)]
    pub supports_rerank: bool,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default)]
    pub max_requests_per_minute: Option<u32>,
    #[serde(default)]
    pub min_delay_ms: Option<u64>,
}

// ===== Provider Config =====

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ProviderConfig {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    pub kind: ProviderKind,
    #[serde(default)]
    pub scoping: ScopingPolicy,
    #[serde(default)]
    pub capabilities: Capabilities,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

impl ProviderConfig {
    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_tag_derivation() {
        let policy = ScopingPolicy::BenchmarkRun;
        assert_eq!(policy.run_tag("locomo", "run-1"), "locomo-run-1");
        assert_eq!(ScopingPolicy::BenchmarkOnly.run_tag("locomo", "run-1"), "locomo");
        assert_eq!(ScopingPolicy::RunOnly.run_tag("locomo", "run-1"), "run-1");
    }

    #[test]
    fn hosted_provider_deserializes() {
        let yaml = r#"
name: vectordb
kind:
  type: hosted
  url: http://localhost:9200
scoping: benchmark-run
capabilities:
  supports_chunks: true
"#;
        let config: ProviderConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(matches!(config.kind, ProviderKind::Hosted { .. }));
        assert!(config.capabilities.supports_chunks);
        assert!(!config.capabilities.supports_rerank);
    }
}
