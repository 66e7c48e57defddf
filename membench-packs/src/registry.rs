use std::collections::HashMap;
use std::sync::Arc;

use membench_core::traits::{BenchmarkPack, PackLookup};
use membench_core::{Registry, RegistryError};

use crate::code::CodeRetrievalPack;
use crate::locomo::LocomoPack;
use crate::longmemeval::LongMemEvalPack;

/// Packs keyed `"{benchmark}:{pack_id}"`, with per-benchmark insertion
/// order retained for `get_latest`.
pub struct PackRegistry {
    inner: Registry<Arc<dyn BenchmarkPack>>,
    order: HashMap<String, Vec<String>>,
}

impl PackRegistry {
    pub fn new() -> Self {
        Self {
            inner: Registry::new("pack"),
            order: HashMap::new(),
        }
    }

    /// Registry with the built-in packs registered.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry
            .register(Arc::new(LongMemEvalPack))
            .expect("built-in packs are conflict-free");
        registry
            .register(Arc::new(LocomoPack))
            .expect("built-in packs are conflict-free");
        for pack in CodeRetrievalPack::builtin() {
            registry
                .register(Arc::new(pack))
                .expect("built-in packs are conflict-free");
        }
        registry
    }

    pub fn register(&mut self, pack: Arc<dyn BenchmarkPack>) -> Result<(), RegistryError> {
        let benchmark = pack.benchmark_name().to_string();
        let key = format!("{benchmark}:{}", pack.pack_id());
        self.inner.register(key.clone(), pack)?;
        self.order.entry(benchmark).or_default().push(key);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<Arc<dyn BenchmarkPack>> {
        self.inner.get(key).cloned()
    }

    /// The first-registered pack for a benchmark.
    // TODO: version-aware ordering once packs carry more than one version
    // per benchmark in practice.
    pub fn get_latest(&self, benchmark: &str) -> Option<Arc<dyn BenchmarkPack>> {
        let key = self.order.get(benchmark)?.first()?;
        self.inner.get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        self.inner.keys()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl Default for PackRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl PackLookup for PackRegistry {
    fn latest_pack(&self, benchmark: &str) -> Option<Arc<dyn BenchmarkPack>> {
        self.get_latest(benchmark)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use membench_core::domain::{BenchmarkItem, Evaluation, SearchResult};
    use membench_core::traits::{EvalContext, RenderedPrompt, SealedSemantics};
    use membench_core::Result;

    struct StubPack {
        id: String,
    }

    #[async_trait]
    impl BenchmarkPack for StubPack {
        fn benchmark_name(&self) -> &str {
            "stub"
        }
        fn pack_id(&self) -> &str {
            &self.id
        }
        fn sealed(&self) -> SealedSemantics {
            SealedSemantics::default()
        }
        fn build_answer_prompt(&self, _ctx: &EvalContext<'_>) -> Result<RenderedPrompt> {
            Ok(RenderedPrompt {
                text: String::new(),
                sha256: String::new(),
            })
        }
        fn build_judge_prompt(
            &self,
            _item: &BenchmarkItem,
            _answer: &str,
        ) -> Option<RenderedPrompt> {
            None
        }
        async fn evaluate(&self, _ctx: &EvalContext<'_>) -> Result<Evaluation> {
            Ok(Evaluation::scored("", 0.0, false))
        }
        fn is_relevant(&self, _item: &BenchmarkItem, _result: &SearchResult) -> bool {
            false
        }
    }

    #[test]
    fn defaults_cover_all_benchmarks() {
        let registry = PackRegistry::with_defaults();
        assert!(registry.get_latest("longmemeval").is_some());
        assert!(registry.get_latest("locomo").is_some());
        assert!(registry.get_latest("code-retrieval-line").is_some());
        assert!(registry.get_latest("code-retrieval-function").is_some());
        assert!(registry.get_latest("code-retrieval-api").is_some());
        assert!(registry.get_latest("code-retrieval-cross-file").is_some());
        assert!(registry.get_latest("unknown").is_none());
    }

    #[test]
    fn keys_are_benchmark_qualified() {
        let registry = PackRegistry::with_defaults();
        assert!(registry
            .keys()
            .contains(&"longmemeval:longmemeval@1.0.0".to_string()));
    }

    #[test]
    fn get_latest_is_first_registered() {
        let mut registry = PackRegistry::new();
        registry
            .register(Arc::new(StubPack { id: "stub@1.0.0".into() }))
            .unwrap();
        registry
            .register(Arc::new(StubPack { id: "stub@2.0.0".into() }))
            .unwrap();
        assert_eq!(registry.get_latest("stub").unwrap().pack_id(), "stub@1.0.0");
    }

    #[test]
    fn duplicate_pack_version_conflicts() {
        let mut registry = PackRegistry::new();
        registry
            .register(Arc::new(StubPack { id: "stub@1.0.0".into() }))
            .unwrap();
        assert!(registry
            .register(Arc::new(StubPack { id: "stub@1.0.0".into() }))
            .is_err());
    }
}
