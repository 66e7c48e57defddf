//! File-level retrieval metrics for code benchmarks. Rows without the
//! relevant ground-truth channel are excluded from the mean; the scored
//! count is reported in details.

use serde_json::json;

use membench_core::domain::{EvalResult, GroundTruth, MetricResult, SearchResult};
use membench_core::relevance::{paths_match, span_iou, LineSpan};
use membench_core::Result;

use crate::calculators::{mean, percentile};
use crate::registry::{Metric, MetricContext};

/// Unique file paths in retrieval order.
fn retrieved_files(retrieved: &[SearchResult]) -> Vec<&str> {
    let mut files = Vec::new();
    for chunk in retrieved {
        if let Some(path) = chunk.filepath() {
            if !files.contains(&path) {
                files.push(path);
            }
        }
    }
    files
}

pub struct FileRecallAtK {
    k: usize,
    name: String,
    alias: String,
}

impl FileRecallAtK {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            name: format!("file_recall_at_{k}"),
            alias: format!("file_recall@{k}"),
        }
    }
}

impl Metric for FileRecallAtK {
    fn name(&self) -> &str {
        &self.name
    }

    fn aliases(&self) -> Vec<String> {
        vec![self.alias.clone()]
    }

    fn description(&self) -> &str {
        "Fraction of modified files represented in the top-K chunks"
    }

    fn compute(&self, results: &[EvalResult], _ctx: &MetricContext) -> Result<MetricResult> {
        let mut scores = Vec::new();
        for result in results {
            let targets = GroundTruth::modified_files(&result.metadata);
            if targets.is_empty() {
                continue;
            }
            let top_k = &result.retrieved[..self.k.min(result.retrieved.len())];
            let covered = targets
                .iter()
                .filter(|target| {
                    top_k
                        .iter()
                        .any(|chunk| chunk.filepath().is_some_and(|p| paths_match(p, target)))
                })
                .count();
            scores.push(covered as f64 / targets.len() as f64);
        }
        Ok(MetricResult::new(self.name(), mean(&scores))
            .with_details(json!({"scored_items": scores.len(), "total": results.len()})))
    }
}

/// Reciprocal rank of the first modified file among the unique retrieved
/// files.
pub struct FileMrrMetric;

impl Metric for FileMrrMetric {
    fn name(&self) -> &str {
        "file_mrr"
    }

    fn description(&self) -> &str {
        "Mean reciprocal rank of the first modified file"
    }

    fn compute(&self, results: &[EvalResult], _ctx: &MetricContext) -> Result<MetricResult> {
        let mut scores = Vec::new();
        for result in results {
            let targets = GroundTruth::modified_files(&result.metadata);
            if targets.is_empty() {
                continue;
            }
            let rank = retrieved_files(&result.retrieved)
                .iter()
                .position(|path| targets.iter().any(|t| paths_match(path, t)));
            scores.push(match rank {
                Some(rank) => 1.0 / (rank + 1) as f64,
                None => 0.0,
            });
        }
        Ok(MetricResult::new(self.name(), mean(&scores))
            .with_details(json!({"scored_items": scores.len(), "total": results.len()})))
    }
}

/// Best line-span IoU within the top-K, restricted to the target file.
/// Missing spans or mismatched files contribute 0.
pub struct IouAtK {
    k: usize,
    name: String,
    alias: String,
}

impl IouAtK {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            name: format!("iou_at_{k}"),
            alias: format!("iou@{k}"),
        }
    }
}

impl Metric for IouAtK {
    fn name(&self) -> &str {
        &self.name
    }

    fn aliases(&self) -> Vec<String> {
        vec![self.alias.clone()]
    }

    fn description(&self) -> &str {
        "Best top-K line-span IoU against the ground-truth location"
    }

    fn compute(&self, results: &[EvalResult], _ctx: &MetricContext) -> Result<MetricResult> {
        let mut scores = Vec::new();
        for result in results {
            let Some(target) = GroundTruth::location(&result.metadata) else {
                continue;
            };
            let target_span = LineSpan::new(target.start_line, target.end_line);
            let best = result
                .retrieved
                .iter()
                .take(self.k)
                .filter(|chunk| {
                    chunk
                        .filepath()
                        .is_some_and(|p| paths_match(p, &target.file))
                })
                .filter_map(|chunk| {
                    chunk
                        .line_span()
                        .map(|(start, end)| span_iou(LineSpan::new(start, end), target_span))
                })
                .fold(0.0f64, f64::max);
            scores.push(best);
        }

        let mut sorted = scores.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).expect("IoU values are finite"));
        Ok(MetricResult::new(self.name(), mean(&scores)).with_details(json!({
            "scored_items": scores.len(),
            "p25": percentile(&sorted, 25.0),
            "p50": percentile(&sorted, 50.0),
            "p75": percentile(&sorted, 75.0),
        })))
    }
}
