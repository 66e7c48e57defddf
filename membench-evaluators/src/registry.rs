use std::sync::Arc;

use membench_core::domain::EvaluationConfig;
use membench_core::traits::Evaluator;
use membench_core::{Registry, RegistryError};

use crate::exact_match::ExactMatchEvaluator;
use crate::llm_judge::LlmJudgeEvaluator;
use crate::locomo_qa::LocomoQaEvaluator;

pub struct EvaluatorRegistry {
    inner: Registry<Arc<dyn Evaluator>>,
}

impl EvaluatorRegistry {
    pub fn new() -> Self {
        Self {
            inner: Registry::new("evaluator"),
        }
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry
            .register_with_aliases(
                Arc::new(LlmJudgeEvaluator) as Arc<dyn Evaluator>,
                &["llm_judge", "judge"],
            )
            .expect("built-in evaluators are conflict-free");
        registry
            .register_with_aliases(
                Arc::new(ExactMatchEvaluator) as Arc<dyn Evaluator>,
                &["exact_match", "exact"],
            )
            .expect("built-in evaluators are conflict-free");
        registry
            .register_with_aliases(
                Arc::new(LocomoQaEvaluator) as Arc<dyn Evaluator>,
                &["locomo_qa"],
            )
            .expect("built-in evaluators are conflict-free");
        registry
    }

    pub fn register_with_aliases(
        &mut self,
        evaluator: Arc<dyn Evaluator>,
        aliases: &[&str],
    ) -> Result<(), RegistryError> {
        let name = evaluator.name().to_string();
        self.inner.register_with_aliases(name, evaluator, aliases)
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Evaluator>> {
        self.inner.get(name).cloned()
    }

    pub fn get_required(&self, name: &str) -> Result<Arc<dyn Evaluator>, RegistryError> {
        self.inner.get_required(name).cloned()
    }

    /// Evaluator named by the config: `custom_evaluator` wins over
    /// `method`; the LLM judge is the default.
    pub fn resolve(
        &self,
        evaluation: &EvaluationConfig,
    ) -> Result<Arc<dyn Evaluator>, RegistryError> {
        let name = evaluation
            .custom_evaluator
            .as_deref()
            .or(evaluation.method.as_deref())
            .unwrap_or("llm-judge");
        self.get_required(name)
    }

    pub fn keys(&self) -> Vec<String> {
        self.inner.keys()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.contains(name)
    }
}

impl Default for EvaluatorRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
