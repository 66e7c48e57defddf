//! Contracts between the execution engine and its collaborators.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::domain::{
    BenchmarkConfig, BenchmarkItem, Evaluation, EvaluationConfig, PreparedData, SearchOptions,
    SearchResult, TokenUsage,
};
use crate::error::Result;

// ===== Provider =====

/// A retrieval or memory system under test. All provider-side state
/// created during a run is scoped by `run_tag` and cleared on exit.
#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &str;

    async fn initialize(&self) -> Result<()> {
        Ok(())
    }

    /// Idempotent best-effort insertion of one context; the runner may
    /// retry through the checkpoint.
    async fn add_context(&self, prepared: &PreparedData, run_tag: &str) -> Result<()>;

    /// Relevance-ordered results; scores need not be normalized.
    async fn search(
        &self,
        query: &str,
        run_tag: &str,
        options: &SearchOptions,
    ) -> Result<Vec<SearchResult>>;

    /// Best-effort deletion of state created under `run_tag`.
    async fn clear(&self, run_tag: &str) -> Result<()>;

    async fn cleanup(&self) -> Result<()> {
        Ok(())
    }
}

// ===== Model layer =====

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    #[serde(default)]
    pub temperature: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub text: String,
    #[serde(default)]
    pub usage: Option<TokenUsage>,
}

/// The single operation evaluators and packs require from the model
/// layer. Routing by `{provider}/{model}` prefix happens behind it.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn generate_text(&self, request: &GenerateRequest) -> Result<GenerateResponse>;
}

// ===== Loader =====

/// Ordered item filters: question-type match, then the 1-indexed
/// inclusive [start, end] range, then limit.
#[derive(Debug, Clone, Default)]
pub struct ItemFilters {
    pub question_type: Option<String>,
    pub start: Option<usize>,
    pub end: Option<usize>,
    pub limit: Option<usize>,
}

impl ItemFilters {
    pub fn apply(&self, items: Vec<BenchmarkItem>) -> Vec<BenchmarkItem> {
        let mut items: Vec<BenchmarkItem> = match &self.question_type {
            Some(qt) => items
                .into_iter()
                .filter(|item| item.question_type.as_deref() == Some(qt.as_str()))
                .collect(),
            None => items,
        };

        if self.start.is_some() || self.end.is_some() {
            let start = self.start.unwrap_or(1).max(1);
            let end = self.end.unwrap_or(items.len()).min(items.len());
            items = if start > end {
                Vec::new()
            } else {
                items
                    .into_iter()
                    .skip(start - 1)
                    .take(end - start + 1)
                    .collect()
            };
        }

        if let Some(limit) = self.limit {
            items.truncate(limit);
        }
        items
    }
}

#[async_trait]
pub trait Loader: Send + Sync {
    fn name(&self) -> &str;

    async fn load(
        &self,
        config: &BenchmarkConfig,
        filters: &ItemFilters,
    ) -> Result<Vec<BenchmarkItem>>;
}

// ===== Evaluation =====

/// Per-pair execution context handed to evaluators and packs.
#[derive(Clone)]
pub struct RunContext {
    pub run_id: String,
    pub run_tag: String,
    pub benchmark: String,
    pub provider: String,
    pub evaluation: EvaluationConfig,
    pub model: Arc<dyn ModelClient>,
}

pub struct EvalContext<'a> {
    pub item: &'a BenchmarkItem,
    pub retrieved: &'a [SearchResult],
    pub run: &'a RunContext,
}

#[async_trait]
pub trait Evaluator: Send + Sync {
    fn name(&self) -> &str;

    async fn evaluate(&self, ctx: &EvalContext<'_>) -> Result<Evaluation>;
}

impl std::fmt::Debug for dyn Evaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Evaluator").field("name", &self.name()).finish()
    }
}

// ===== Benchmark packs =====

/// Which facets of a benchmark's protocol the pack owns. Sealed facets
/// cannot be overridden by configuration.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SealedSemantics {
    pub prompts: bool,
    pub scoring: bool,
    pub relevance: bool,
}

/// A fully-rendered prompt and its stable content hash (SHA-256 over
/// UTF-8), used for drift detection and golden tests.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RenderedPrompt {
    pub text: String,
    pub sha256: String,
}

/// Versioned, immutable prompt/scoring/relevance definitions for one
/// benchmark, identified as `"{benchmark}@{version}"`.
#[async_trait]
pub trait BenchmarkPack: Send + Sync {
    fn benchmark_name(&self) -> &str;

    fn pack_id(&self) -> &str;

    fn sealed(&self) -> SealedSemantics;

    fn build_answer_prompt(&self, ctx: &EvalContext<'_>) -> Result<RenderedPrompt>;

    /// `None` when the pack does not use LLM judging.
    fn build_judge_prompt(&self, item: &BenchmarkItem, answer: &str) -> Option<RenderedPrompt>;

    async fn evaluate(&self, ctx: &EvalContext<'_>) -> Result<Evaluation>;

    /// Dataset-native relevance oracle used by retrieval metrics.
    fn is_relevant(&self, item: &BenchmarkItem, result: &SearchResult) -> bool;
}

/// Read-only pack lookup consumed by the metrics engine.
pub trait PackLookup: Send + Sync {
    /// The first-registered pack for the benchmark, if any.
    fn latest_pack(&self, benchmark: &str) -> Option<Arc<dyn BenchmarkPack>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::BenchmarkItem;

    fn items(n: usize) -> Vec<BenchmarkItem> {
        (1..=n)
            .map(|i| BenchmarkItem::new(format!("item-{i}"), "q", "a"))
            .collect()
    }

    #[test]
    fn range_is_one_indexed_inclusive() {
        let filters = ItemFilters {
            start: Some(2),
            end: Some(4),
            ..Default::default()
        };
        let filtered = filters.apply(items(10));
        let ids: Vec<&str> = filtered.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["item-2", "item-3", "item-4"]);
    }

    #[test]
    fn filters_apply_in_order() {
        let mut all = items(6);
        for (i, item) in all.iter_mut().enumerate() {
            item.question_type = Some(if i % 2 == 0 { "even" } else { "odd" }.to_string());
        }
        let filters = ItemFilters {
            question_type: Some("even".to_string()),
            start: Some(2),
            end: Some(3),
            limit: Some(1),
        };
        // evens: item-1, item-3, item-5 -> range [2,3]: item-3, item-5 -> limit 1
        let filtered = filters.apply(all);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].id, "item-3");
    }

    #[test]
    fn out_of_range_start_yields_empty() {
        let filters = ItemFilters {
            start: Some(11),
            end: None,
            ..Default::default()
        };
        assert!(filters.apply(items(10)).is_empty());
    }
}
