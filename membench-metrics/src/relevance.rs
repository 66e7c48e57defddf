//! Priority-based relevance resolution for rank-sensitive metrics.
//!
//! Resolution order: explicit qrels carried on the stored row, then the
//! owning pack's relevance oracle, then the token-F1 fallback.

use std::collections::HashSet;
use std::sync::Arc;

use membench_core::domain::{BenchmarkItem, EvalResult, SearchResult};
use membench_core::text::{token_f1, tokenize};
use membench_core::traits::BenchmarkPack;
use membench_core::keys;

use crate::registry::MetricContext;

pub const DEFAULT_TOKEN_THRESHOLD: f64 = 0.3;
pub const SUCCESS_TOKEN_THRESHOLD: f64 = 0.1;

/// The explicit qrels channels, in priority order.
const QRELS_KEYS: [&str; 4] = [
    keys::RELEVANT_IDS,
    keys::RELEVANT_CHUNK_IDS,
    keys::GROUND_TRUTH_IDS,
    keys::QRELS,
];

pub enum RelevanceSource {
    ExplicitQrels(HashSet<String>),
    PackOwned(Arc<dyn BenchmarkPack>),
    TokenFallback { threshold: f64 },
}

/// Picks the relevance strategy for one stored row.
pub fn resolve(result: &EvalResult, ctx: &MetricContext, threshold: f64) -> RelevanceSource {
    for key in QRELS_KEYS {
        let ids = result.metadata_strings(key);
        if !ids.is_empty() {
            return RelevanceSource::ExplicitQrels(ids.into_iter().collect());
        }
    }

    if let Some(packs) = &ctx.packs {
        if let Some(pack) = packs.latest_pack(&result.benchmark) {
            if pack.sealed().relevance {
                return RelevanceSource::PackOwned(pack);
            }
        }
    }

    RelevanceSource::TokenFallback { threshold }
}

/// A minimal item rebuilt from the stored row, for the pack oracle.
/// Checkpoints and results reference items only by the 4-tuple, so the
/// row's own fields are the source of truth here.
pub fn reconstruct_item(result: &EvalResult) -> BenchmarkItem {
    let mut item = BenchmarkItem::new(&result.item_id, &result.question, &result.expected);
    item.metadata = result.metadata.clone();
    item.question_type = result.question_type().map(str::to_string);
    item.category = result.category();
    item
}

fn token_fallback_relevant(expected: &str, chunk: &SearchResult, threshold: f64) -> bool {
    token_f1(&tokenize(&chunk.content), &tokenize(expected)) >= threshold
}

/// Per-chunk relevance flags for one row, plus the relevant-set size
/// used by IDCG. For explicit qrels the set size is the qrels size; for
/// the other strategies it is the number of relevant retrieved chunks.
pub struct RowRelevance {
    pub flags: Vec<bool>,
    pub total_relevant: usize,
}

pub fn row_relevance(result: &EvalResult, ctx: &MetricContext, threshold: f64) -> RowRelevance {
    let source = resolve(result, ctx, threshold);
    let item = match &source {
        RelevanceSource::PackOwned(_) => Some(reconstruct_item(result)),
        _ => None,
    };

    let flags: Vec<bool> = result
        .retrieved
        .iter()
        .map(|chunk| match &source {
            RelevanceSource::ExplicitQrels(qrels) => qrels.contains(&chunk.id),
            RelevanceSource::PackOwned(pack) => {
                pack.is_relevant(item.as_ref().expect("reconstructed above"), chunk)
            }
            RelevanceSource::TokenFallback { threshold } => {
                token_fallback_relevant(&result.expected, chunk, *threshold)
            }
        })
        .collect();

    let total_relevant = match &source {
        RelevanceSource::ExplicitQrels(qrels) => qrels.len(),
        _ => flags.iter().filter(|f| **f).count(),
    };

    RowRelevance {
        flags,
        total_relevant,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;
    use std::collections::HashMap;

    fn row(metadata: HashMap<String, serde_json::Value>, retrieved: Vec<SearchResult>) -> EvalResult {
        EvalResult {
            run_id: "r".into(),
            benchmark: "bench".into(),
            provider: "p".into(),
            item_id: "i".into(),
            question: "q".into(),
            expected: "blue bicycle".into(),
            actual: "blue".into(),
            score: 1.0,
            correct: true,
            retrieved,
            metadata,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn explicit_qrels_win() {
        let mut metadata = HashMap::new();
        metadata.insert(keys::RELEVANT_IDS.to_string(), json!(["c2"]));
        let retrieved = vec![
            SearchResult::new("c1", "blue bicycle", 0.9),
            SearchResult::new("c2", "unrelated", 0.8),
        ];
        let relevance = row_relevance(&row(metadata, retrieved), &MetricContext::empty(), 0.3);
        // qrels say c2 even though c1's text matches the answer
        assert_eq!(relevance.flags, vec![false, true]);
        assert_eq!(relevance.total_relevant, 1);
    }

    #[test]
    fn token_fallback_applies_without_qrels_or_pack() {
        let retrieved = vec![
            SearchResult::new("c1", "a blue bicycle parked outside", 0.9),
            SearchResult::new("c2", "entirely unrelated text here", 0.8),
        ];
        let relevance = row_relevance(&row(HashMap::new(), retrieved), &MetricContext::empty(), 0.3);
        assert_eq!(relevance.flags, vec![true, false]);
    }

    #[test]
    fn reconstructed_item_carries_row_fields() {
        let mut metadata = HashMap::new();
        metadata.insert(keys::QUESTION_TYPE.to_string(), json!("multi-session"));
        metadata.insert(keys::CATEGORY.to_string(), json!(2));
        let item = reconstruct_item(&row(metadata, vec![]));
        assert_eq!(item.id, "i");
        assert_eq!(item.answer, "blue bicycle");
        assert_eq!(item.question_type.as_deref(), Some("multi-session"));
        assert_eq!(item.category.as_deref(), Some("2"));
    }
}
