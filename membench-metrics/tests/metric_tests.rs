use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde_json::json;

use membench_core::domain::{EvalResult, SearchResult};
use membench_core::keys;
use membench_metrics::{
    AccuracyMetric, FileRecallAtK, IouAtK, Metric, MetricContext, MetricRegistry, MrrMetric,
    NdcgAtK, PrecisionAtK, RecallAtK,
};
use membench_packs::PackRegistry;

fn row(item_id: &str, correct: bool, retrieved: Vec<SearchResult>) -> EvalResult {
    EvalResult {
        run_id: "run-1".into(),
        benchmark: "bench".into(),
        provider: "prov".into(),
        item_id: item_id.into(),
        question: "q".into(),
        expected: "blue bicycle".into(),
        actual: if correct { "blue bicycle" } else { "red car" }.into(),
        score: if correct { 1.0 } else { 0.0 },
        correct,
        retrieved,
        metadata: HashMap::new(),
        created_at: Utc::now(),
    }
}

fn with_qrels(mut result: EvalResult, ids: &[&str]) -> EvalResult {
    result.metadata.insert(
        keys::RELEVANT_IDS.to_string(),
        json!(ids.iter().collect::<Vec<_>>()),
    );
    result
}

#[test]
fn ndcg_empty_relevant_set_is_zero() {
    let results = vec![row("i1", false, vec![SearchResult::new("c1", "zzz", 0.9)])];
    let metric = NdcgAtK::new(10);
    let value = metric.compute(&results, &MetricContext::empty()).unwrap();
    assert_eq!(value.value, 0.0);
}

#[test]
fn ndcg_perfect_ranking_is_one() {
    let results = vec![with_qrels(
        row(
            "i1",
            true,
            vec![
                SearchResult::new("c1", "x", 0.9),
                SearchResult::new("c2", "y", 0.8),
            ],
        ),
        &["c1", "c2"],
    )];
    let metric = NdcgAtK::new(10);
    let value = metric.compute(&results, &MetricContext::empty()).unwrap();
    assert!((value.value - 1.0).abs() < 1e-9);
}

#[test]
fn ndcg_idcg_uses_full_relevant_set_size() {
    // 2 relevant by qrels, only 1 retrieved at rank 1
    let results = vec![with_qrels(
        row("i1", true, vec![SearchResult::new("c1", "x", 0.9)]),
        &["c1", "c9"],
    )];
    let metric = NdcgAtK::new(10);
    let value = metric.compute(&results, &MetricContext::empty()).unwrap();
    // dcg = 1; idcg = 1/log2(2) + 1/log2(3)
    let idcg = 1.0 + 1.0 / 3f64.log2();
    assert!((value.value - 1.0 / idcg).abs() < 1e-9);
}

#[test]
fn recall_with_k_beyond_retrieved_considers_all_without_padding() {
    let results = vec![row(
        "i1",
        true,
        vec![SearchResult::new("c1", "she rode the blue bicycle", 0.9)],
    )];
    let metric = RecallAtK::new(10);
    let value = metric.compute(&results, &MetricContext::empty()).unwrap();
    assert_eq!(value.value, 1.0);
}

#[test]
fn precision_divides_by_k() {
    let results = vec![with_qrels(
        row(
            "i1",
            true,
            vec![
                SearchResult::new("c1", "x", 0.9),
                SearchResult::new("c2", "y", 0.8),
                SearchResult::new("c3", "z", 0.7),
            ],
        ),
        &["c1", "c3"],
    )];
    let metric = PrecisionAtK::new(3);
    let value = metric.compute(&results, &MetricContext::empty()).unwrap();
    assert!((value.value - 2.0 / 3.0).abs() < 1e-9);
}

#[test]
fn mrr_is_zero_when_nothing_is_relevant() {
    let results = vec![row("i1", false, vec![SearchResult::new("c1", "zzz", 0.9)])];
    let value = MrrMetric.compute(&results, &MetricContext::empty()).unwrap();
    assert_eq!(value.value, 0.0);
}

#[test]
fn iou_is_zero_without_span_or_on_file_mismatch() {
    let mut result = row("i1", true, vec![
        // right file, no line span
        SearchResult::new("c1", "x", 0.9).with_metadata(keys::FILEPATH, json!("src/auth.py")),
        // wrong file with a span
        SearchResult::new("c2", "y", 0.8)
            .with_metadata(keys::FILEPATH, json!("src/other.py"))
            .with_metadata(keys::START_LINE, json!(10))
            .with_metadata(keys::END_LINE, json!(20)),
    ]);
    result.metadata.insert(
        keys::GROUND_TRUTH.to_string(),
        json!({"file": "src/auth.py", "startLine": 10, "endLine": 20}),
    );
    let metric = IouAtK::new(10);
    let value = metric.compute(&[result], &MetricContext::empty()).unwrap();
    assert_eq!(value.value, 0.0);
}

#[test]
fn file_recall_skips_rows_without_ground_truth() {
    let mut scored = row("i1", true, vec![
        SearchResult::new("c1", "x", 0.9).with_metadata(keys::FILEPATH, json!("src/fix.py")),
    ]);
    scored.metadata.insert(
        keys::MODIFIED_FILES.to_string(),
        json!(["src/fix.py", "src/test.py"]),
    );
    let unscored = row("i2", true, vec![]);

    let metric = FileRecallAtK::new(5);
    let value = metric
        .compute(&[scored, unscored], &MetricContext::empty())
        .unwrap();
    assert_eq!(value.value, 0.5);
    assert_eq!(value.details.unwrap()["scored_items"], json!(1));
}

#[test]
fn rank_metrics_are_invariant_under_outer_reordering() {
    let a = with_qrels(
        row("i1", true, vec![SearchResult::new("c1", "x", 0.9)]),
        &["c1"],
    );
    let b = with_qrels(
        row(
            "i2",
            false,
            vec![
                SearchResult::new("d1", "x", 0.9),
                SearchResult::new("d2", "y", 0.8),
            ],
        ),
        &["d2"],
    );

    let forward = MrrMetric
        .compute(&[a.clone(), b.clone()], &MetricContext::empty())
        .unwrap();
    let backward = MrrMetric.compute(&[b, a], &MetricContext::empty()).unwrap();
    assert_eq!(forward.value, backward.value);
}

#[test]
fn pack_owned_relevance_resolves_through_the_registry() {
    let packs = Arc::new(PackRegistry::with_defaults());
    let ctx = MetricContext::with_packs(packs);

    let mut result = row(
        "i1",
        true,
        vec![
            SearchResult::new("c1", "x", 0.9)
                .with_metadata(keys::FILEPATH, json!("src/auth.py"))
                .with_metadata(keys::START_LINE, json!(15))
                .with_metadata(keys::END_LINE, json!(25)),
            SearchResult::new("c2", "y", 0.8)
                .with_metadata(keys::FILEPATH, json!("src/other.py"))
                .with_metadata(keys::START_LINE, json!(1))
                .with_metadata(keys::END_LINE, json!(5)),
        ],
    );
    result.benchmark = "code-retrieval-line".to_string();
    result.metadata.insert(
        keys::GROUND_TRUTH.to_string(),
        json!({"file": "src/auth.py", "startLine": 10, "endLine": 20}),
    );

    let metric = PrecisionAtK::new(1);
    let value = metric.compute(&[result], &ctx).unwrap();
    assert_eq!(value.value, 1.0);
}

#[test]
fn compute_all_validates_before_computing() {
    let registry = MetricRegistry::with_defaults();
    let results = vec![row("i1", true, vec![])];

    let err = registry.compute_all(
        &["accuracy".to_string(), "unknown_metric".to_string()],
        &results,
        &MetricContext::empty(),
    );
    assert!(err.is_err());

    let computed = registry
        .compute_all(&["accuracy".to_string()], &results, &MetricContext::empty())
        .unwrap();
    assert_eq!(computed.len(), 1);
    assert_eq!(computed[0].value, 1.0);
}

#[test]
fn accuracy_counts_correct_flags() {
    let results = vec![
        row("i1", true, vec![]),
        row("i2", false, vec![]),
        row("i3", true, vec![]),
    ];
    let value = AccuracyMetric
        .compute(&results, &MetricContext::empty())
        .unwrap();
    assert!((value.value - 2.0 / 3.0).abs() < 1e-9);
}
