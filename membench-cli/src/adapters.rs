//! Provider adapter wiring for the standalone binary.
//!
//! Real adapters (HTTP services, local databases, compose-managed
//! containers) are external collaborators registered by the embedding
//! application. The binary bundles one in-process reference adapter so
//! the harness runs end-to-end without external services.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::RwLock;

use async_trait::async_trait;

use membench_core::domain::{PreparedData, ProviderConfig, ProviderKind, SearchOptions, SearchResult};
use membench_core::text::tokenize;
use membench_core::traits::Provider;
use membench_core::{CoreError, Result};
use membench_runner::ProviderFactory;

/// Keyword-overlap retrieval over contexts held in process memory,
/// scoped by run tag. Context metadata is passed through to results so
/// relevance channels (corpus ids, dialog ids, file paths) survive.
#[derive(Default)]
pub struct MemoryProvider {
    store: RwLock<HashMap<String, Vec<PreparedData>>>,
}

#[async_trait]
impl Provider for MemoryProvider {
    fn name(&self) -> &str {
        "memory"
    }

    async fn add_context(&self, prepared: &PreparedData, run_tag: &str) -> Result<()> {
        let mut store = self.store.write().expect("store lock poisoned");
        let contexts = store.entry(run_tag.to_string()).or_default();
        // idempotent on context id, so checkpoint-driven retries are safe
        if !contexts.iter().any(|c| c.id == prepared.id) {
            contexts.push(prepared.clone());
        }
        Ok(())
    }

    async fn search(
        &self,
        query: &str,
        run_tag: &str,
        options: &SearchOptions,
    ) -> Result<Vec<SearchResult>> {
        let query_tokens = tokenize(query);
        if query_tokens.is_empty() {
            return Ok(Vec::new());
        }

        let store = self.store.read().expect("store lock poisoned");
        let mut results: Vec<SearchResult> = store
            .get(run_tag)
            .map(|contexts| {
                contexts
                    .iter()
                    .map(|context| {
                        let content_tokens: std::collections::HashSet<String> =
                            tokenize(&context.content).into_iter().collect();
                        let overlap = query_tokens
                            .iter()
                            .filter(|t| content_tokens.contains(t.as_str()))
                            .count();
                        let score = overlap as f64 / query_tokens.len() as f64;
                        let mut result =
                            SearchResult::new(&context.id, &context.content, score);
                        result.metadata = context.metadata.clone();
                        result
                    })
                    .collect()
            })
            .unwrap_or_default();

        results.sort_by(|a, b| b.score.partial_cmp(&a.score).expect("scores are finite"));
        if let Some(threshold) = options.threshold {
            results.retain(|r| r.score >= threshold);
        }
        results.truncate(options.limit);
        Ok(results)
    }

    async fn clear(&self, run_tag: &str) -> Result<()> {
        self.store
            .write()
            .expect("store lock poisoned")
            .remove(run_tag);
        Ok(())
    }
}

struct MemoryProviderFactory;

#[async_trait]
impl ProviderFactory for MemoryProviderFactory {
    async fn create(&self, _config: &ProviderConfig) -> Result<Arc<dyn Provider>> {
        Ok(Arc::new(MemoryProvider::default()))
    }
}

/// Factory whose `create` fails: the pair aborts with the reason while
/// the rest of the run continues.
struct UnavailableFactory {
    reason: String,
}

#[async_trait]
impl ProviderFactory for UnavailableFactory {
    async fn create(&self, _config: &ProviderConfig) -> Result<Arc<dyn Provider>> {
        Err(CoreError::Provider(self.reason.clone()))
    }
}

pub fn factory_for(config: &ProviderConfig) -> Arc<dyn ProviderFactory> {
    match &config.kind {
        ProviderKind::Local { adapter } if adapter == "memory" => Arc::new(MemoryProviderFactory),
        ProviderKind::Local { adapter } => Arc::new(UnavailableFactory {
            reason: format!("local adapter '{adapter}' is not registered in this binary"),
        }),
        ProviderKind::Hosted { url, .. } => Arc::new(UnavailableFactory {
            reason: format!(
                "hosted provider at {url} requires an HTTP adapter registered by the embedding application"
            ),
        }),
        ProviderKind::Container { service, .. } => Arc::new(UnavailableFactory {
            reason: format!(
                "containerized provider '{service}' requires a compose adapter registered by the embedding application"
            ),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn memory_provider_scores_by_keyword_overlap() {
        let provider = MemoryProvider::default();
        provider
            .add_context(
                &PreparedData::new("c1", "the blue bicycle is parked")
                    .with_metadata("corpusId", json!("sess_1")),
                "tag",
            )
            .await
            .unwrap();
        provider
            .add_context(&PreparedData::new("c2", "stock markets closed lower"), "tag")
            .await
            .unwrap();

        let options = SearchOptions {
            limit: 10,
            threshold: None,
            include_chunks: false,
        };
        let results = provider
            .search("what color was the bicycle", "tag", &options)
            .await
            .unwrap();
        assert_eq!(results[0].id, "c1");
        assert!(results[0].score > results[1].score);
        assert_eq!(results[0].metadata["corpusId"], json!("sess_1"));

        provider.clear("tag").await.unwrap();
        let empty = provider.search("bicycle", "tag", &options).await.unwrap();
        assert!(empty.is_empty());
    }

    #[tokio::test]
    async fn add_context_is_idempotent() {
        let provider = MemoryProvider::default();
        let context = PreparedData::new("c1", "same context");
        provider.add_context(&context, "tag").await.unwrap();
        provider.add_context(&context, "tag").await.unwrap();
        assert_eq!(provider.store.read().unwrap()["tag"].len(), 1);
    }
}
