//! LongMemEval pack: LLM-answered, LLM-judged chat-memory QA with
//! question-type-specific prompts and rubrics.

use async_trait::async_trait;

use membench_core::domain::{BenchmarkItem, Evaluation, SearchResult, TokenUsage};
use membench_core::relevance::parse_ctxid_prefix;
use membench_core::traits::{
    BenchmarkPack, EvalContext, GenerateRequest, RenderedPrompt, SealedSemantics,
};
use membench_core::{keys, Result, Timer};

use crate::prompt::{format_contexts, render};

const PACK_ID: &str = "longmemeval@1.0.0";

const DEFAULT_ANSWER_MODEL: &str = "anthropic/claude-3-5-haiku";
const DEFAULT_JUDGE_MODEL: &str = "openai/gpt-4o-mini";

const ANSWER_TEMPLATE: &str = "\
You are a helpful assistant with access to the user's past conversations.

Relevant conversation history:
{context}

Answer the question based only on the history above. If the history does \
not contain the answer, say so.

Question: {question}
Answer:";

const ANSWER_TEMPLATE_TEMPORAL: &str = "\
You are a helpful assistant with access to the user's past conversations. \
Each history entry may carry the date it took place.

Relevant conversation history:
{context}

Answer the question based only on the history above, reasoning carefully \
about dates and their order. If the history does not contain the answer, \
say so.

Question: {question}
Answer:";

const JUDGE_STANDARD: &str = "\
I will give you a question, the correct answer, and a model's response. \
Answer yes if the response contains the correct answer; otherwise answer no.

Question: {question}
Correct answer: {expected}
Model response: {answer}

Answer yes or no only.";

const JUDGE_TEMPORAL: &str = "\
I will give you a question, the correct answer, and a model's response. \
Answer yes if the response contains the correct answer. If the answer is a \
date, treat any date within one day of the correct one as correct; \
otherwise answer no.

Question: {question}
Correct answer: {expected}
Model response: {answer}

Answer yes or no only.";

const JUDGE_KNOWLEDGE_UPDATE: &str = "\
I will give you a question, the correct (most recently updated) answer, and \
a model's response. Answer yes only if the response reflects the updated \
answer rather than an outdated one; otherwise answer no.

Question: {question}
Correct answer: {expected}
Model response: {answer}

Answer yes or no only.";

const JUDGE_PREFERENCE: &str = "\
I will give you a user question, a description of the user's stated \
preference, and a model's response. Answer yes if the response respects \
the stated preference; otherwise answer no.

Question: {question}
Stated preference: {expected}
Model response: {answer}

Answer yes or no only.";

const JUDGE_ABSTENTION: &str = "\
The following question cannot be answered from the user's conversation \
history. Answer yes if the model's response correctly declines to answer \
or states that the information is unavailable; otherwise answer no.

Question: {question}
Model response: {answer}

Answer yes or no only.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rubric {
    Standard,
    Temporal,
    KnowledgeUpdate,
    Preference,
    Abstention,
}

fn rubric_for(item: &BenchmarkItem) -> Rubric {
    if item.id.ends_with("_abs")
        || item
            .metadata
            .get(keys::IS_ABSTENTION)
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false)
    {
        return Rubric::Abstention;
    }
    match item.question_type.as_deref() {
        Some("temporal-reasoning") => Rubric::Temporal,
        Some("knowledge-update") => Rubric::KnowledgeUpdate,
        Some("single-session-preference") => Rubric::Preference,
        _ => Rubric::Standard,
    }
}

pub struct LongMemEvalPack;

impl LongMemEvalPack {
    fn answer_template(item: &BenchmarkItem) -> &'static str {
        match item.question_type.as_deref() {
            Some("temporal-reasoning") => ANSWER_TEMPLATE_TEMPORAL,
            _ => ANSWER_TEMPLATE,
        }
    }

    fn judge_template(rubric: Rubric) -> &'static str {
        match rubric {
            Rubric::Standard => JUDGE_STANDARD,
            Rubric::Temporal => JUDGE_TEMPORAL,
            Rubric::KnowledgeUpdate => JUDGE_KNOWLEDGE_UPDATE,
            Rubric::Preference => JUDGE_PREFERENCE,
            Rubric::Abstention => JUDGE_ABSTENTION,
        }
    }
}

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

#[async_trait]
impl BenchmarkPack for LongMemEvalPack {
    fn benchmark_name(&self) -> &str {
        "longmemeval"
    }

    fn pack_id(&self) -> &str {
        PACK_ID
    }

    fn sealed(&self) -> SealedSemantics {
        SealedSemantics {
            prompts: true,
            scoring: true,
            relevance: true,
        }
    }

    fn build_answer_prompt(&self, ctx: &EvalContext<'_>) -> Result<RenderedPrompt> {
        let context = format_contexts(ctx.retrieved);
        Ok(render(
            Self::answer_template(ctx.item),
            &[("context", &context), ("question", &ctx.item.question)],
        ))
    }

    fn build_judge_prompt(&self, item: &BenchmarkItem, answer: &str) -> Option<RenderedPrompt> {
        let rubric = rubric_for(item);
        Some(render(
            Self::judge_template(rubric),
            &[
                ("question", item.question.as_str()),
                ("expected", item.answer.as_str()),
                ("answer", answer),
            ],
        ))
    }

    async fn evaluate(&self, ctx: &EvalContext<'_>) -> Result<Evaluation> {
        let mut usage = None;

        let answer_prompt = self.build_answer_prompt(ctx)?;
        let answer_model = ctx
            .run
            .evaluation
            .answer_model
            .clone()
            .unwrap_or_else(|| DEFAULT_ANSWER_MODEL.to_string());
        let timer = Timer::start();
        let answer_response = ctx
            .run
            .model
            .generate_text(&GenerateRequest {
                model: answer_model,
                prompt: answer_prompt.text,
                temperature: ctx.run.evaluation.temperature,
            })
            .await?;
        let answer_latency_ms = timer.elapsed_ms();
        add_usage(&mut usage, answer_response.usage);
        let answer = answer_response.text.trim().to_string();

        let judge_prompt = self
            .build_judge_prompt(ctx.item, &answer)
            .expect("longmemeval always judges");
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
                prompt: judge_prompt.text,
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

    /// Exact membership of the item's answer-bearing session ids against
    /// the chunk's corpus identity.
    fn is_relevant(&self, item: &BenchmarkItem, result: &SearchResult) -> bool {
        let evidence = item.metadata_strings(keys::EVIDENCE_IDS);
        if evidence.is_empty() {
            return false;
        }

        if let Some(corpus_id) = result
            .metadata
            .get(keys::CORPUS_ID)
            .and_then(serde_json::Value::as_str)
        {
            if evidence.iter().any(|e| e == corpus_id) {
                return true;
            }
        }

        if let Some((ids, _)) = parse_ctxid_prefix(&result.content) {
            if ids.iter().any(|id| evidence.contains(id)) {
                return true;
            }
        }

        evidence
            .iter()
            .any(|e| result.id == format!("{}-{e}", item.id) || result.id.ends_with(&format!("-{e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rubric_selection() {
        let standard = BenchmarkItem::new("q1", "?", "a");
        assert_eq!(rubric_for(&standard), Rubric::Standard);

        let temporal =
            BenchmarkItem::new("q2", "?", "a").with_question_type("temporal-reasoning");
        assert_eq!(rubric_for(&temporal), Rubric::Temporal);

        let abstention = BenchmarkItem::new("q3_abs", "?", "a");
        assert_eq!(rubric_for(&abstention), Rubric::Abstention);

        let flagged = BenchmarkItem::new("q4", "?", "a")
            .with_metadata(keys::IS_ABSTENTION, json!(true));
        assert_eq!(rubric_for(&flagged), Rubric::Abstention);
    }

    #[test]
    fn verdict_parsing() {
        assert!(parse_verdict("Yes"));
        assert!(parse_verdict("  yes, it does"));
        assert!(!parse_verdict("No"));
        assert!(!parse_verdict("The answer is yes")); // must lead with the verdict
    }

    #[test]
    fn relevance_matches_corpus_channels() {
        let pack = LongMemEvalPack;
        let item = BenchmarkItem::new("q1", "?", "a")
            .with_metadata(keys::EVIDENCE_IDS, json!(["sess_3"]));

        let by_metadata =
            SearchResult::new("c", "text", 1.0).with_metadata(keys::CORPUS_ID, json!("sess_3"));
        assert!(pack.is_relevant(&item, &by_metadata));

        let by_ctxid = SearchResult::new("c", "[CTXID:sess_3] text", 1.0);
        assert!(pack.is_relevant(&item, &by_ctxid));

        let by_id = SearchResult::new("q1-sess_3", "text", 1.0);
        assert!(pack.is_relevant(&item, &by_id));

        let miss = SearchResult::new("q1-sess_4", "text", 1.0);
        assert!(!pack.is_relevant(&item, &miss));
    }

    #[test]
    fn judge_prompt_is_type_specific_and_stable() {
        let pack = LongMemEvalPack;
        let item = BenchmarkItem::new("q", "When did it happen?", "2023-05-01")
            .with_question_type("temporal-reasoning");
        let first = pack.build_judge_prompt(&item, "May 2nd 2023").unwrap();
        let second = pack.build_judge_prompt(&item, "May 2nd 2023").unwrap();
        assert_eq!(first.sha256, second.sha256);
        assert!(first.text.contains("within one day"));
    }
}
