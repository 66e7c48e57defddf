//! Code-retrieval packs: ground-truth-driven deterministic scoring.
//!
//! All four variants are built from one config table; they differ only in
//! the scoring rule applied to the top-K retrieved chunks.

use async_trait::async_trait;

use membench_core::domain::{BenchmarkItem, Evaluation, GroundTruth, SearchResult};
use membench_core::relevance::{jaccard_similarity, paths_match, span_iou, spans_overlap, LineSpan};
use membench_core::traits::{BenchmarkPack, EvalContext, RenderedPrompt, SealedSemantics};
use membench_core::Result;

use crate::prompt::{format_contexts, render};

pub const DEFAULT_JACCARD_THRESHOLD: f64 = 0.7;
const DEFAULT_TOP_K: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CodeScoring {
    /// Any top-K chunk in the target file whose span overlaps the target
    /// span; an IoU threshold tightens the overlap requirement.
    LineRange { iou_threshold: Option<f64> },
    /// Best Jaccard token-set similarity against any gold snippet.
    JaccardSnippet { threshold: f64 },
    /// Fraction of dependency files represented in the top-K.
    CrossFileCoverage,
    /// Fraction of modified files represented in the top-K; any non-zero
    /// coverage counts as found.
    FileRecall,
}

pub struct CodeRetrievalPack {
    benchmark: String,
    pack_id: String,
    scoring: CodeScoring,
    top_k: usize,
}

impl CodeRetrievalPack {
    pub fn new(benchmark: impl Into<String>, version: &str, scoring: CodeScoring) -> Self {
        let benchmark = benchmark.into();
        Self {
            pack_id: format!("{benchmark}@{version}"),
            benchmark,
            scoring,
            top_k: DEFAULT_TOP_K,
        }
    }

    /// The built-in variants, one pack per code benchmark.
    pub fn builtin() -> Vec<Self> {
        const TABLE: [(&str, CodeScoring); 4] = [
            (
                "code-retrieval-line",
                CodeScoring::LineRange { iou_threshold: None },
            ),
            (
                "code-retrieval-function",
                CodeScoring::JaccardSnippet {
                    threshold: DEFAULT_JACCARD_THRESHOLD,
                },
            ),
            ("code-retrieval-api", CodeScoring::CrossFileCoverage),
            ("code-retrieval-cross-file", CodeScoring::FileRecall),
        ];
        TABLE
            .into_iter()
            .map(|(name, scoring)| Self::new(name, "1.0.0", scoring))
            .collect()
    }

    fn no_ground_truth(&self, channel: &str) -> Evaluation {
        Evaluation::scored("", 0.0, false)
            .with_reasoning(format!("no ground truth available ({channel})"))
    }

    fn evaluate_line_range(
        &self,
        item: &BenchmarkItem,
        chunks: &[&SearchResult],
        k: usize,
        iou_threshold: Option<f64>,
    ) -> Evaluation {
        let Some(target) = GroundTruth::location(&item.metadata) else {
            return self.no_ground_truth("groundTruth location");
        };
        let target_span = LineSpan::new(target.start_line, target.end_line);

        let hits = chunks
            .iter()
            .filter(|chunk| chunk_hits_target(chunk, &target.file, target_span, iou_threshold))
            .count();

        let answer = format!("Found {hits} relevant chunk(s) in top-{k}");
        let reasoning = format!(
            "target {}:{}-{}",
            target.file, target.start_line, target.end_line
        );
        Evaluation::scored(answer, if hits > 0 { 1.0 } else { 0.0 }, hits > 0)
            .with_reasoning(reasoning)
    }

    fn evaluate_jaccard(
        &self,
        item: &BenchmarkItem,
        chunks: &[&SearchResult],
        k: usize,
        threshold: f64,
    ) -> Evaluation {
        let snippets = GroundTruth::snippets(&item.metadata);
        if snippets.is_empty() {
            return self.no_ground_truth("goldSnippets");
        }

        let best = chunks
            .iter()
            .flat_map(|chunk| {
                snippets
                    .iter()
                    .map(|snippet| jaccard_similarity(&chunk.content, snippet))
            })
            .fold(0.0f64, f64::max);

        let correct = best >= threshold;
        let answer = format!(
            "Found {} matching chunk(s) in top-{k}",
            if correct { 1 } else { 0 }
        );
        let reasoning = format!(
            "best Jaccard similarity {best:.2} against gold snippets (threshold {threshold})"
        );
        Evaluation::scored(answer, if correct { 1.0 } else { 0.0 }, correct)
            .with_reasoning(reasoning)
    }

    fn evaluate_file_coverage(
        &self,
        item: &BenchmarkItem,
        chunks: &[&SearchResult],
        k: usize,
        files: Vec<String>,
        channel: &str,
        found_means_any: bool,
    ) -> Evaluation {
        if files.is_empty() {
            return self.no_ground_truth(channel);
        }

        let covered: Vec<&String> = files
            .iter()
            .filter(|target| {
                chunks
                    .iter()
                    .any(|chunk| chunk.filepath().is_some_and(|p| paths_match(p, target)))
            })
            .collect();

        let score = covered.len() as f64 / files.len() as f64;
        let correct = if found_means_any {
            !covered.is_empty()
        } else {
            score >= 0.5
        };
        let answer = format!("Found {}/{} files in top-{k}", covered.len(), files.len());
        let reasoning = format!("coverage {:.1}%", score * 100.0);
        Evaluation::scored(answer, score, correct).with_reasoning(reasoning)
    }
}

/// Chunk views considered for scoring: inner chunks when the provider
/// returned them, the result itself otherwise.
fn chunk_views<'a>(retrieved: &'a [SearchResult], k: usize) -> Vec<&'a SearchResult> {
    retrieved
        .iter()
        .take(k)
        .flat_map(|result| {
            if result.chunks.is_empty() {
                vec![result]
            } else {
                result.chunks.iter().collect()
            }
        })
        .collect()
}

fn chunk_hits_target(
    chunk: &SearchResult,
    target_file: &str,
    target_span: LineSpan,
    iou_threshold: Option<f64>,
) -> bool {
    let Some(path) = chunk.filepath() else {
        return false;
    };
    if !paths_match(path, target_file) {
        return false;
    }
    let Some((start, end)) = chunk.line_span() else {
        return false;
    };
    let span = LineSpan::new(start, end);
    match iou_threshold {
        Some(threshold) => span_iou(span, target_span) >= threshold,
        None => spans_overlap(span, target_span),
    }
}

#[async_trait]
impl BenchmarkPack for CodeRetrievalPack {
    fn benchmark_name(&self) -> &str {
        &self.benchmark
    }

    fn pack_id(&self) -> &str {
        &self.pack_id
    }

    fn sealed(&self) -> SealedSemantics {
        SealedSemantics {
            prompts: false,
            scoring: true,
            relevance: true,
        }
    }

    fn build_answer_prompt(&self, ctx: &EvalContext<'_>) -> Result<RenderedPrompt> {
        let context = format_contexts(ctx.retrieved);
        Ok(render(
            "Retrieval task: {question}\n\nRetrieved code:\n{context}",
            &[("question", &ctx.item.question), ("context", &context)],
        ))
    }

    /// Deterministic scoring; no judge.
    fn build_judge_prompt(&self, _item: &BenchmarkItem, _answer: &str) -> Option<RenderedPrompt> {
        None
    }

    async fn evaluate(&self, ctx: &EvalContext<'_>) -> Result<Evaluation> {
        let k = self.top_k.min(ctx.retrieved.len()).max(1);
        let chunks = chunk_views(ctx.retrieved, k);

        let evaluation = match self.scoring {
            CodeScoring::LineRange { iou_threshold } => {
                self.evaluate_line_range(ctx.item, &chunks, k, iou_threshold)
            }
            CodeScoring::JaccardSnippet { threshold } => {
                self.evaluate_jaccard(ctx.item, &chunks, k, threshold)
            }
            CodeScoring::CrossFileCoverage => self.evaluate_file_coverage(
                ctx.item,
                &chunks,
                k,
                GroundTruth::dependency_files(&ctx.item.metadata),
                "dependencyFiles",
                false,
            ),
            CodeScoring::FileRecall => self.evaluate_file_coverage(
                ctx.item,
                &chunks,
                k,
                GroundTruth::modified_files(&ctx.item.metadata),
                "modifiedFiles",
                true,
            ),
        };
        Ok(evaluation)
    }

    fn is_relevant(&self, item: &BenchmarkItem, result: &SearchResult) -> bool {
        match self.scoring {
            CodeScoring::LineRange { iou_threshold } => {
                let Some(target) = GroundTruth::location(&item.metadata) else {
                    return false;
                };
                chunk_hits_target(
                    result,
                    &target.file,
                    LineSpan::new(target.start_line, target.end_line),
                    iou_threshold,
                )
            }
            CodeScoring::JaccardSnippet { threshold } => {
                GroundTruth::snippets(&item.metadata)
                    .iter()
                    .any(|snippet| jaccard_similarity(&result.content, snippet) >= threshold)
            }
            CodeScoring::CrossFileCoverage => {
                let deps = GroundTruth::dependency_files(&item.metadata);
                result
                    .filepath()
                    .is_some_and(|p| deps.iter().any(|d| paths_match(p, d)))
            }
            CodeScoring::FileRecall => {
                let files = GroundTruth::modified_files(&item.metadata);
                result
                    .filepath()
                    .is_some_and(|p| files.iter().any(|f| paths_match(p, f)))
            }
        }
    }
}
