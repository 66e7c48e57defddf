//! Config-templated answer generation plus LLM judging.

use async_trait::async_trait;

use membench_core::domain::{Evaluation, TokenUsage};
use membench_core::traits::{EvalContext, Evaluator, GenerateRequest};
use membench_core::{Result, Timer};

use crate::template::{context_block, fill};

const DEFAULT_ANSWER_MODEL: &str = "anthropic/claude-3-5-haiku";
const DEFAULT_JUDGE_MODEL: &str = "openai/gpt-4o-mini";

const DEFAULT_ANSWER_TEMPLATE: &str = "\
Use the retrieved context to answer the question.

Context:
${context}

Question: ${question}
Answer:";

const DEFAULT_JUDGE_TEMPLATE: &str = "\
I will give you a question, the correct answer, and a model's response. \
Answer yes if the response contains the correct answer; otherwise answer no.

Question: ${question}
Correct answer: ${expected}
Model response: ${answer}

Answer yes or no only.";

pub struct LlmJudgeEvaluator;

fn parse_verdict(text: &str) -> bool {
    text.trim().to_lowercase().starts_with("yes")
}

fn add_usage(total: &mut Option<TokenUsage>, usage: Option<TokenUsage>) {
    if let Some(usage) = usage {
        let current = total.get_or_insert(TokenUsage {
            prompt_tokens: 0,
            completion_tokens: 0,
        });
        current.prompt_tokens += usage.prompt_tokens;
        current.completion_tokens += usage.completion_tokens;
    }
}

/// Generates an answer with the configured answering model and templates;
/// shared by the evaluators that differ only in scoring.
pub(crate) async fn generate_answer(
    ctx: &EvalContext<'_>,
) -> Result<(String, u64, Option<TokenUsage>)> {
    let template = ctx
        .run
        .evaluation
        .answer_prompt
        .as_deref()
        .unwrap_or(DEFAULT_ANSWER_TEMPLATE);
    let context = context_block(ctx.retrieved);
    let prompt = fill(
        template,
        &[("context", context.as_str()), ("question", &ctx.item.question)],
    );
    let model = ctx
        .run
        .evaluation
        .answer_model
        .clone()
        .unwrap_or_else(|| DEFAULT_ANSWER_MODEL.to_string());

    let timer = Timer::start();
    let response = ctx
        .run
        .model
        .generate_text(&GenerateRequest {
            model,
            prompt,
            temperature: ctx.run.evaluation.temperature,
        })
        .await?;
    Ok((
        response.text.trim().to_string(),
        timer.elapsed_ms(),
        response.usage,
    ))
}

#[async_trait]
impl Evaluator for LlmJudgeEvaluator {
    fn name(&self) -> &str {
        "llm-judge"
    }

    async fn evaluate(&self, ctx: &EvalContext<'_>) -> Result<Evaluation> {
        let mut usage = None;
        let (answer, answer_latency_ms, answer_usage) = generate_answer(ctx).await?;
        add_usage(&mut usage, answer_usage);

        let judge_template = ctx
            .run
            .evaluation
            .judge_prompt
            .as_deref()
            .unwrap_or(DEFAULT_JUDGE_TEMPLATE);
        let judge_prompt = fill(
            judge_template,
            &[
                ("question", ctx.item.question.as_str()),
                ("expected", ctx.item.answer.as_str()),
                ("answer", answer.as_str()),
            ],
        );
        let judge_model = ctx
            .run
            .evaluation
            .judge_model
            .clone()
            .unwrap_or_else(|| DEFAULT_JUDGE_MODEL.to_string());

        let timer = Timer::start();
        let judge_response = ctx
            .run
            .model
            .generate_text(&GenerateRequest {
                model: judge_model,
                prompt: judge_prompt,
                temperature: Some(0.0),
            })
            .await?;
        let judge_latency_ms = timer.elapsed_ms();
        add_usage(&mut usage, judge_response.usage);

        let correct = parse_verdict(&judge_response.text);
        let mut evaluation = Evaluation::scored(answer, if correct { 1.0 } else { 0.0 }, correct)
            .with_judge_response(judge_response.text.trim());
        evaluation.answer_latency_ms = Some(answer_latency_ms);
        evaluation.judge_latency_ms = Some(judge_latency_ms);
        evaluation.usage = usage;
        Ok(evaluation)
    }
}
