//! Token-F1 QA evaluation with LoCoMo's category rules, for
//! conversational datasets that are not driven by the sealed pack.

use async_trait::async_trait;

use membench_core::domain::Evaluation;
use membench_core::traits::{EvalContext, Evaluator};
use membench_core::Result;
use membench_packs::locomo::score_answer;

use crate::llm_judge::generate_answer;

pub struct LocomoQaEvaluator;

#[async_trait]
impl Evaluator for LocomoQaEvaluator {
    fn name(&self) -> &str {
        "locomo-qa"
    }

    async fn evaluate(&self, ctx: &EvalContext<'_>) -> Result<Evaluation> {
        let (answer, answer_latency_ms, usage) = generate_answer(ctx).await?;

        let (score, reasoning) =
            score_answer(ctx.item.category.as_deref(), &ctx.item.answer, &answer);
        let mut evaluation =
            Evaluation::scored(answer, score, score >= 0.5).with_reasoning(reasoning);
        evaluation.answer_latency_ms = Some(answer_latency_ms);
        evaluation.usage = usage;
        Ok(evaluation)
    }
}
