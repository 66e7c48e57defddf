//! Sealed-semantics enforcement.
//!
//! When a pack declares a facet sealed, configuration cannot override
//! it. This is the single place that invariant is checked; the config
//! loader calls it before registering a benchmark.

use thiserror::Error;

use crate::domain::BenchmarkConfig;
use crate::traits::BenchmarkPack;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "benchmark '{benchmark}' overrides sealed semantics owned by pack '{pack_id}': {}",
    .fields.join(", ")
)]
pub struct SealedSemanticsError {
    pub benchmark: String,
    pub pack_id: String,
    pub fields: Vec<String>,
}

/// Pure check of a config against the pack that owns its benchmark.
/// Reports all violations at once.
pub fn validate_sealed_semantics(
    config: &BenchmarkConfig,
    pack: Option<&dyn BenchmarkPack>,
) -> Result<(), SealedSemanticsError> {
    let Some(pack) = pack else {
        return Ok(());
    };

    let sealed = pack.sealed();
    let mut fields = Vec::new();

    if sealed.prompts {
        if config.evaluation.answer_prompt.is_some() {
            fields.push("evaluation.answer_prompt".to_string());
        }
        if config.evaluation.judge_prompt.is_some() {
            fields.push("evaluation.judge_prompt".to_string());
        }
    }
    if sealed.scoring {
        if config.evaluation.method.is_some() {
            fields.push("evaluation.method".to_string());
        }
        if config.evaluation.custom_evaluator.is_some() {
            fields.push("evaluation.custom_evaluator".to_string());
        }
    }

    if fields.is_empty() {
        Ok(())
    } else {
        Err(SealedSemanticsError {
            benchmark: config.name.clone(),
            pack_id: pack.pack_id().to_string(),
            fields,
        })
    }
}
