//! Answer-quality metrics driven by the stored `correct` flag.

use std::collections::BTreeMap;

use serde_json::json;

use membench_core::domain::{EvalResult, MetricResult};
use membench_core::Result;

use crate::registry::{Metric, MetricContext};

pub struct AccuracyMetric;

impl Metric for AccuracyMetric {
    fn name(&self) -> &str {
        "accuracy"
    }

    fn description(&self) -> &str {
        "Fraction of items judged correct"
    }

    fn compute(&self, results: &[EvalResult], _ctx: &MetricContext) -> Result<MetricResult> {
        let correct = results.iter().filter(|r| r.correct).count();
        let value = if results.is_empty() {
            0.0
        } else {
            correct as f64 / results.len() as f64
        };
        Ok(MetricResult::new(self.name(), value)
            .with_details(json!({"correct": correct, "total": results.len()})))
    }
}

#[derive(Clone, Copy)]
enum GroupKey {
    QuestionType,
    Category,
}

/// Macro-averaged accuracy over per-group rates, with the per-group
/// breakdown in details.
pub struct GroupedAccuracyMetric {
    key: GroupKey,
    name: &'static str,
    description: &'static str,
}

impl GroupedAccuracyMetric {
    pub fn by_question_type() -> Self {
        Self {
            key: GroupKey::QuestionType,
            name: "accuracy_by_question_type",
            description: "Macro mean of per-question-type accuracy",
        }
    }

    pub fn by_category() -> Self {
        Self {
            key: GroupKey::Category,
            name: "accuracy_by_category",
            description: "Macro mean of per-category accuracy",
        }
    }

    fn group_of(&self, result: &EvalResult) -> String {
        match self.key {
            GroupKey::QuestionType => result
                .question_type()
                .unwrap_or("unknown")
                .to_string(),
            GroupKey::Category => result.category().unwrap_or_else(|| "unknown".to_string()),
        }
    }
}

impl Metric for GroupedAccuracyMetric {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        self.description
    }

    fn compute(&self, results: &[EvalResult], _ctx: &MetricContext) -> Result<MetricResult> {
        let mut groups: BTreeMap<String, (usize, usize)> = BTreeMap::new();
        for result in results {
            let entry = groups.entry(self.group_of(result)).or_insert((0, 0));
            entry.1 += 1;
            if result.correct {
                entry.0 += 1;
            }
        }

        let rates: BTreeMap<String, f64> = groups
            .iter()
            .map(|(group, (correct, total))| (group.clone(), *correct as f64 / *total as f64))
            .collect();
        let value = if rates.is_empty() {
            0.0
        } else {
            rates.values().sum::<f64>() / rates.len() as f64
        };

        let breakdown: BTreeMap<&String, serde_json::Value> = groups
            .iter()
            .map(|(group, (correct, total))| {
                (
                    group,
                    json!({"correct": correct, "total": total, "accuracy": rates[group]}),
                )
            })
            .collect();
        Ok(MetricResult::new(self.name(), value).with_details(json!(breakdown)))
    }
}

/// Accuracy over the abstention subset only.
pub struct AbstentionAccuracyMetric;

impl Metric for AbstentionAccuracyMetric {
    fn name(&self) -> &str {
        "abstention_accuracy"
    }

    fn description(&self) -> &str {
        "Accuracy over items flagged as abstention"
    }

    fn compute(&self, results: &[EvalResult], _ctx: &MetricContext) -> Result<MetricResult> {
        let subset: Vec<&EvalResult> = results.iter().filter(|r| r.is_abstention()).collect();
        let correct = subset.iter().filter(|r| r.correct).count();
        let value = if subset.is_empty() {
            0.0
        } else {
            correct as f64 / subset.len() as f64
        };
        Ok(MetricResult::new(self.name(), value)
            .with_details(json!({"correct": correct, "total": subset.len()})))
    }
}
