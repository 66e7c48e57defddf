//! Evaluators: per-item answer and score production for benchmarks that
//! are not driven by a sealed pack, plus the model routing layer.

pub mod exact_match;
pub mod llm_judge;
pub mod locomo_qa;
pub mod model;
pub mod registry;
pub mod template;

pub use exact_match::ExactMatchEvaluator;
pub use llm_judge::LlmJudgeEvaluator;
pub use locomo_qa::LocomoQaEvaluator;
pub use model::{resolve_model_spec, ModelRouter};
pub use registry::EvaluatorRegistry;
