use async_trait::async_trait;

use membench_core::domain::{
    BenchmarkConfig, BenchmarkItem, ContextKind, ContextSchema, DataFormat, DataSourceConfig,
    DataSourceKind, Evaluation, EvaluationConfig, SchemaConfig, SearchResult,
};
use membench_core::traits::{BenchmarkPack, EvalContext, RenderedPrompt, SealedSemantics};
use membench_core::{validate_sealed_semantics, Registry, Result};

fn config_with_evaluation(evaluation: EvaluationConfig) -> BenchmarkConfig {
    BenchmarkConfig {
        name: "sealed-bench".to_string(),
        display_name: None,
        version: "1.0.0".to_string(),
        tags: vec![],
        data: DataSourceConfig {
            kind: DataSourceKind::Local,
            path: "data.jsonl".to_string(),
            format: DataFormat::JsonLines,
        },
        schema: SchemaConfig {
            id: "id".to_string(),
            question: "question".to_string(),
            answer: "answer".to_string(),
            questions: None,
            context: ContextSchema {
                kind: ContextKind::String,
                field: "context".to_string(),
                item_template: None,
                session_pattern: None,
                date_field: None,
                date_array: None,
                corpus_id_field: None,
                dialog_id_field: None,
                evidence_field: None,
            },
            metadata_fields: Default::default(),
            question_type: None,
            category: None,
        },
        question_types: vec![],
        category_map: Default::default(),
        ingestion: Default::default(),
        search: Default::default(),
        evaluation,
        metrics: vec![],
        runtime: Default::default(),
    }
}

struct FullySealedPack;

#[async_trait]
impl BenchmarkPack for FullySealedPack {
    fn benchmark_name(&self) -> &str {
        "sealed-bench"
    }

    fn pack_id(&self) -> &str {
        "sealed-bench@2.1.0"
    }

    fn sealed(&self) -> SealedSemantics {
        SealedSemantics {
            prompts: true,
            scoring: true,
            relevance: true,
        }
    }

    fn build_answer_prompt(&self, _ctx: &EvalContext<'_>) -> Result<RenderedPrompt> {
        Ok(RenderedPrompt {
            text: String::new(),
            sha256: String::new(),
        })
    }

    fn build_judge_prompt(&self, _item: &BenchmarkItem, _answer: &str) -> Option<RenderedPrompt> {
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
fn sealed_validator_reports_every_violation_at_once() {
    let config = config_with_evaluation(EvaluationConfig {
        method: Some("llm-judge".to_string()),
        answer_prompt: Some("Answer ${question}".to_string()),
        judge_prompt: Some("Judge ${answer}".to_string()),
        custom_evaluator: Some("my-eval".to_string()),
        ..Default::default()
    });

    let err = validate_sealed_semantics(&config, Some(&FullySealedPack)).unwrap_err();
    assert_eq!(err.pack_id, "sealed-bench@2.1.0");
    assert_eq!(
        err.fields,
        vec![
            "evaluation.answer_prompt",
            "evaluation.judge_prompt",
            "evaluation.method",
            "evaluation.custom_evaluator",
        ]
    );
}

#[test]
fn clean_config_passes_sealed_validation() {
    let config = config_with_evaluation(EvaluationConfig::default());
    assert!(validate_sealed_semantics(&config, Some(&FullySealedPack)).is_ok());
    // no pack, anything goes
    let overriding = config_with_evaluation(EvaluationConfig {
        method: Some("exact-match".to_string()),
        ..Default::default()
    });
    assert!(validate_sealed_semantics(&overriding, None).is_ok());
}

#[test]
fn resolve_alias_is_idempotent() {
    let mut registry: Registry<u8> = Registry::new("idempotence");
    registry
        .register_with_aliases("primary", 1, &["alias-a", "alias-b"])
        .unwrap();

    for name in ["primary", "alias-a", "alias-b", "unknown"] {
        let once = registry.resolve_alias(name).to_string();
        let twice = registry.resolve_alias(&once).to_string();
        assert_eq!(once, twice);
    }
}

#[test]
fn strict_registration_preserves_uniqueness() {
    let mut registry: Registry<u8> = Registry::new("uniqueness");
    registry.register_with_aliases("a", 1, &["x"]).unwrap();
    registry.register_with_aliases("b", 2, &["y"]).unwrap();

    // every collision shape is refused
    assert!(registry.register("a", 3).is_err());
    assert!(registry.register("x", 3).is_err());
    assert!(registry.register_with_aliases("c", 3, &["a"]).is_err());
    assert!(registry.register_with_aliases("c", 3, &["y"]).is_err());

    // and the registry is unchanged
    assert_eq!(registry.keys(), vec!["a", "b"]);
    assert_eq!(registry.get("x"), Some(&1));
    assert_eq!(registry.get("c"), None);
}
