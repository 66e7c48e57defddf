//! Deterministic exact-match scoring over a generated answer.

use async_trait::async_trait;

use membench_core::domain::Evaluation;
use membench_core::text::normalize_answer;
use membench_core::traits::{EvalContext, Evaluator};
use membench_core::Result;

use crate::llm_judge::generate_answer;

pub struct ExactMatchEvaluator;

#[async_trait]
impl Evaluator for ExactMatchEvaluator {
    fn name(&self) -> &str {
        "exact-match"
    }

    async fn evaluate(&self, ctx: &EvalContext<'_>) -> Result<Evaluation> {
        let (answer, answer_latency_ms, usage) = generate_answer(ctx).await?;

        let correct = normalize_answer(&answer) == normalize_answer(&ctx.item.answer);
        let mut evaluation =
            Evaluation::scored(answer, if correct { 1.0 } else { 0.0 }, correct)
                .with_reasoning("normalized exact match");
        evaluation.answer_latency_ms = Some(answer_latency_ms);
        evaluation.usage = usage;
        Ok(evaluation)
    }
}
