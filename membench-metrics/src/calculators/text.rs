//! Text-overlap metrics between expected and generated answers.

use std::collections::HashMap;

use serde_json::json;

use membench_core::domain::{EvalResult, MetricResult};
use membench_core::text::{token_f1, tokenize};
use membench_core::Result;

use crate::calculators::mean;
use crate::registry::{Metric, MetricContext};

/// Macro mean of per-item token F1.
pub struct F1Metric;

impl Metric for F1Metric {
    fn name(&self) -> &str {
        "f1"
    }

    fn description(&self) -> &str {
        "Mean per-item token F1 between generated and expected answers"
    }

    fn compute(&self, results: &[EvalResult], _ctx: &MetricContext) -> Result<MetricResult> {
        let scores: Vec<f64> = results
            .iter()
            .map(|r| token_f1(&tokenize(&r.actual), &tokenize(&r.expected)))
            .collect();
        Ok(MetricResult::new(self.name(), mean(&scores)))
    }
}

/// Clipped unigram precision: predicted counts are capped at the
/// reference counts before dividing.
fn unigram_precision(predicted: &[String], reference: &[String]) -> f64 {
    if predicted.is_empty() {
        return 0.0;
    }

    let mut ref_counts: HashMap<&str, usize> = HashMap::new();
    for token in reference {
        *ref_counts.entry(token.as_str()).or_insert(0) += 1;
    }

    let mut pred_counts: HashMap<&str, usize> = HashMap::new();
    for token in predicted {
        *pred_counts.entry(token.as_str()).or_insert(0) += 1;
    }

    let clipped: usize = pred_counts
        .iter()
        .map(|(token, count)| (*count).min(*ref_counts.get(token).unwrap_or(&0)))
        .sum();
    clipped as f64 / predicted.len() as f64
}

pub struct Bleu1Metric;

impl Metric for Bleu1Metric {
    fn name(&self) -> &str {
        "bleu_1"
    }

    fn description(&self) -> &str {
        "Mean per-item clipped unigram precision"
    }

    fn compute(&self, results: &[EvalResult], _ctx: &MetricContext) -> Result<MetricResult> {
        let scores: Vec<f64> = results
            .iter()
            .map(|r| unigram_precision(&tokenize(&r.actual), &tokenize(&r.expected)))
            .collect();
        Ok(MetricResult::new(self.name(), mean(&scores)))
    }
}

/// LCS length with a two-row DP table.
fn lcs_length(a: &[String], b: &[String]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }

    let mut previous = vec![0usize; b.len() + 1];
    let mut current = vec![0usize; b.len() + 1];
    for token_a in a {
        for (j, token_b) in b.iter().enumerate() {
            current[j + 1] = if token_a == token_b {
                previous[j] + 1
            } else {
                previous[j + 1].max(current[j])
            };
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous[b.len()]
}

fn rouge_l_f1(predicted: &[String], reference: &[String]) -> f64 {
    if predicted.is_empty() || reference.is_empty() {
        return 0.0;
    }
    let lcs = lcs_length(predicted, reference) as f64;
    if lcs == 0.0 {
        return 0.0;
    }
    let precision = lcs / predicted.len() as f64;
    let recall = lcs / reference.len() as f64;
    2.0 * precision * recall / (precision + recall)
}

pub struct RougeLMetric;

impl Metric for RougeLMetric {
    fn name(&self) -> &str {
        "rouge_l"
    }

    fn description(&self) -> &str {
        "Mean per-item LCS-based F1"
    }

    fn compute(&self, results: &[EvalResult], _ctx: &MetricContext) -> Result<MetricResult> {
        let scores: Vec<f64> = results
            .iter()
            .map(|r| rouge_l_f1(&tokenize(&r.actual), &tokenize(&r.expected)))
            .collect();
        Ok(MetricResult::new(self.name(), mean(&scores))
            .with_details(json!({"items": results.len()})))
    }
}
