//! Rank-sensitive retrieval metrics over the stored result lists.
//!
//! All of these resolve relevance through the priority strategy
//! (explicit qrels, then pack-owned, then token fallback) and are
//! invariant under reordering of the outer result list.

use serde_json::json;

use membench_core::domain::{EvalResult, MetricResult};
use membench_core::text::{token_coverage, token_f1, tokenize};
use membench_core::Result;

use crate::calculators::mean;
use crate::registry::{Metric, MetricContext};
use crate::relevance::{row_relevance, DEFAULT_TOKEN_THRESHOLD, SUCCESS_TOKEN_THRESHOLD};

pub struct MrrMetric;

impl Metric for MrrMetric {
    fn name(&self) -> &str {
        "mrr"
    }

    fn description(&self) -> &str {
        "Mean reciprocal rank of the first relevant chunk"
    }

    fn compute(&self, results: &[EvalResult], ctx: &MetricContext) -> Result<MetricResult> {
        let mut with_relevant = 0usize;
        let scores: Vec<f64> = results
            .iter()
            .map(|result| {
                let relevance = row_relevance(result, ctx, DEFAULT_TOKEN_THRESHOLD);
                match relevance.flags.iter().position(|f| *f) {
                    Some(rank) => {
                        with_relevant += 1;
                        1.0 / (rank + 1) as f64
                    }
                    None => 0.0,
                }
            })
            .collect();
        Ok(MetricResult::new(self.name(), mean(&scores))
            .with_details(json!({"items_with_relevant": with_relevant, "total": results.len()})))
    }
}

pub struct PrecisionAtK {
    k: usize,
    name: String,
    alias: String,
}

impl PrecisionAtK {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            name: format!("precision_at_{k}"),
            alias: format!("precision@{k}"),
        }
    }
}

impl Metric for PrecisionAtK {
    fn name(&self) -> &str {
        &self.name
    }

    fn aliases(&self) -> Vec<String> {
        vec![self.alias.clone()]
    }

    fn description(&self) -> &str {
        "Fraction of the top-K chunks that are relevant"
    }

    fn compute(&self, results: &[EvalResult], ctx: &MetricContext) -> Result<MetricResult> {
        let scores: Vec<f64> = results
            .iter()
            .map(|result| {
                let relevance = row_relevance(result, ctx, DEFAULT_TOKEN_THRESHOLD);
                let hits = relevance.flags.iter().take(self.k).filter(|f| **f).count();
                hits as f64 / self.k as f64
            })
            .collect();
        Ok(MetricResult::new(self.name(), mean(&scores)))
    }
}

/// Success if any top-K chunk covers enough of the expected answer's
/// tokens. The coverage rule is one-sided so large chunks are not
/// penalized the way bidirectional F1 would.
pub struct RecallAtK {
    k: usize,
    threshold: f64,
    name: String,
    alias: String,
}

impl RecallAtK {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            threshold: DEFAULT_TOKEN_THRESHOLD,
            name: format!("recall_at_{k}"),
            alias: format!("recall@{k}"),
        }
    }
}

impl Metric for RecallAtK {
    fn name(&self) -> &str {
        &self.name
    }

    fn aliases(&self) -> Vec<String> {
        vec![self.alias.clone()]
    }

    fn description(&self) -> &str {
        "Whether any top-K chunk covers the expected answer's tokens"
    }

    fn compute(&self, results: &[EvalResult], _ctx: &MetricContext) -> Result<MetricResult> {
        let scores: Vec<f64> = results
            .iter()
            .map(|result| {
                let expected = tokenize(&result.expected);
                // K beyond the retrieved list considers all results
                let hit = result.retrieved.iter().take(self.k).any(|chunk| {
                    token_coverage(&expected, &tokenize(&chunk.content)) >= self.threshold
                });
                if hit {
                    1.0
                } else {
                    0.0
                }
            })
            .collect();
        Ok(MetricResult::new(self.name(), mean(&scores)))
    }
}

pub struct NdcgAtK {
    k: usize,
    name: String,
    alias: String,
}

impl NdcgAtK {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            name: format!("ndcg_at_{k}"),
            alias: format!("ndcg@{k}"),
        }
    }
}

impl Metric for NdcgAtK {
    fn name(&self) -> &str {
        &self.name
    }

    fn aliases(&self) -> Vec<String> {
        vec![self.alias.clone()]
    }

    fn description(&self) -> &str {
        "Normalized discounted cumulative gain over the top-K chunks"
    }

    fn compute(&self, results: &[EvalResult], ctx: &MetricContext) -> Result<MetricResult> {
        let scores: Vec<f64> = results
            .iter()
            .map(|result| {
                let relevance = row_relevance(result, ctx, DEFAULT_TOKEN_THRESHOLD);
                if relevance.total_relevant == 0 {
                    return 0.0;
                }

                let dcg: f64 = relevance
                    .flags
                    .iter()
                    .take(self.k)
                    .enumerate()
                    .filter(|(_, f)| **f)
                    .map(|(i, _)| 1.0 / ((i + 2) as f64).log2())
                    .sum();

                // IDCG over the full relevant-set size, not the top-K hit
                // count
                let ideal_hits = self.k.min(relevance.total_relevant);
                let idcg: f64 = (1..=ideal_hits)
                    .map(|i| 1.0 / ((i + 1) as f64).log2())
                    .sum();
                if idcg == 0.0 {
                    0.0
                } else {
                    dcg / idcg
                }
            })
            .collect();
        Ok(MetricResult::new(self.name(), mean(&scores)))
    }
}

/// Correct answer backed by at least one token-matching chunk.
pub struct SuccessAtK {
    k: usize,
    threshold: f64,
    name: String,
    alias: String,
}

impl SuccessAtK {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            threshold: SUCCESS_TOKEN_THRESHOLD,
            name: format!("success_at_{k}"),
            alias: format!("success@{k}"),
        }
    }
}

impl Metric for SuccessAtK {
    fn name(&self) -> &str {
        &self.name
    }

    fn aliases(&self) -> Vec<String> {
        vec![self.alias.clone()]
    }

    fn description(&self) -> &str {
        "Correct answer with at least one supporting chunk in the top-K"
    }

    fn compute(&self, results: &[EvalResult], _ctx: &MetricContext) -> Result<MetricResult> {
        let scores: Vec<f64> = results
            .iter()
            .map(|result| {
                if !result.correct {
                    return 0.0;
                }
                let expected = tokenize(&result.expected);
                let supported = result.retrieved.iter().take(self.k).any(|chunk| {
                    token_f1(&tokenize(&chunk.content), &expected) >= self.threshold
                });
                if supported {
                    1.0
                } else {
                    0.0
                }
            })
            .collect();
        Ok(MetricResult::new(self.name(), mean(&scores)))
    }
}
