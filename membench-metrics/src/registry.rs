//! Metric trait, computation context, and the default registry.

use std::sync::Arc;

use membench_core::domain::{EvalResult, MetricResult};
use membench_core::traits::PackLookup;
use membench_core::{Registry, RegistryError, Result};

use crate::calculators;

/// Read-only context handed to every calculator. Metrics are pure: no
/// I/O, no mutation of the result list.
#[derive(Clone, Default)]
pub struct MetricContext {
    pub packs: Option<Arc<dyn PackLookup>>,
}

impl MetricContext {
    pub fn empty() -> Self {
        Self { packs: None }
    }

    pub fn with_packs(packs: Arc<dyn PackLookup>) -> Self {
        Self { packs: Some(packs) }
    }
}

pub trait Metric: Send + Sync {
    fn name(&self) -> &str;

    fn aliases(&self) -> Vec<String> {
        Vec::new()
    }

    fn description(&self) -> &str;

    fn compute(&self, results: &[EvalResult], ctx: &MetricContext) -> Result<MetricResult>;
}

impl std::fmt::Debug for dyn Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metric").field("name", &self.name()).finish()
    }
}

pub struct MetricRegistry {
    inner: Registry<Arc<dyn Metric>>,
}

impl MetricRegistry {
    pub fn new() -> Self {
        Self {
            inner: Registry::new("metric"),
        }
    }

    /// Registry with every built-in calculator registered strictly.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for metric in calculators::builtin() {
            registry
                .register(metric)
                .expect("built-in metrics are conflict-free");
        }
        registry
    }

    pub fn register(&mut self, metric: Arc<dyn Metric>) -> std::result::Result<(), RegistryError> {
        let name = metric.name().to_string();
        let aliases = metric.aliases();
        let alias_refs: Vec<&str> = aliases.iter().map(String::as_str).collect();
        self.inner.register_with_aliases(name, metric, &alias_refs)?;
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Metric>> {
        self.inner.get(name).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        self.inner.keys()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.contains(name)
    }

    /// Validates every requested name up front and de-duplicates metrics
    /// requested under different aliases, preserving request order.
    pub fn select(&self, requested: &[String]) -> std::result::Result<Vec<Arc<dyn Metric>>, RegistryError> {
        let mut seen = std::collections::HashSet::new();
        let mut selected = Vec::new();
        for name in requested {
            let metric = self.inner.get_required(name)?.clone();
            if seen.insert(metric.name().to_string()) {
                selected.push(metric);
            }
        }
        Ok(selected)
    }

    /// Fail-fast validation plus computation over one result set.
    pub fn compute_all(
        &self,
        requested: &[String],
        results: &[EvalResult],
        ctx: &MetricContext,
    ) -> Result<Vec<MetricResult>> {
        let metrics = self.select(requested)?;
        metrics
            .iter()
            .map(|metric| metric.compute(results, ctx))
            .collect()
    }
}

impl Default for MetricRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_include_the_full_surface() {
        let registry = MetricRegistry::with_defaults();
        for name in [
            "accuracy",
            "accuracy_by_question_type",
            "accuracy_by_category",
            "abstention_accuracy",
            "f1",
            "bleu_1",
            "rouge_l",
            "mrr",
            "precision_at_5",
            "recall_at_5",
            "ndcg_at_10",
            "success_at_1",
            "file_recall_at_5",
            "file_mrr",
            "iou_at_10",
            "avg_search_latency_ms",
            "avg_total_latency_ms",
            "p95_latency_ms",
            "avg_retrieval_score",
        ] {
            assert!(registry.contains(name), "missing metric {name}");
        }
    }

    #[test]
    fn select_fails_fast_on_unknown_names() {
        let registry = MetricRegistry::with_defaults();
        let err = registry
            .select(&["accuracy".to_string(), "made_up".to_string()])
            .unwrap_err();
        assert!(matches!(err, RegistryError::NotFound { ref key, .. } if key == "made_up"));
    }

    #[test]
    fn select_dedupes_aliases() {
        let registry = MetricRegistry::with_defaults();
        let selected = registry
            .select(&["ndcg_at_10".to_string(), "ndcg@10".to_string()])
            .unwrap();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].name(), "ndcg_at_10");
    }
}
