use std::collections::HashMap;

use chrono::Utc;
use serde_json::json;

use membench_core::domain::{EvalResult, RunRecord, SearchResult};
use membench_core::keys;
use membench_storage::{parse_export, ResultsStore};

fn result(run_id: &str, benchmark: &str, provider: &str, item_id: &str, correct: bool) -> EvalResult {
    let mut metadata = HashMap::new();
    metadata.insert(keys::QUESTION_TYPE.to_string(), json!("single-session"));
    metadata.insert(keys::CATEGORY.to_string(), json!("1"));
    EvalResult {
        run_id: run_id.into(),
        benchmark: benchmark.into(),
        provider: provider.into(),
        item_id: item_id.into(),
        question: "what, exactly?".into(),
        expected: "a \"quoted\" answer, with commas".into(),
        actual: "an answer".into(),
        score: if correct { 1.0 } else { 0.0 },
        correct,
        retrieved: vec![SearchResult::new("c1", "chunk text", 0.9)],
        metadata,
        created_at: Utc::now(),
    }
}

#[tokio::test]
async fn upsert_keeps_one_row_per_item() {
    let store = ResultsStore::in_memory().await.unwrap();
    store
        .insert_run(&RunRecord::new("run-1", vec!["b".into()], vec!["p".into()]))
        .await
        .unwrap();

    let mut first = result("run-1", "b", "p", "item-1", false);
    store.upsert_result(&first).await.unwrap();

    first.correct = true;
    first.score = 1.0;
    first.actual = "revised".into();
    store.upsert_result(&first).await.unwrap();

    let rows = store.results_for_run("run-1").await.unwrap();
    assert_eq!(rows.len(), 1);
    assert!(rows[0].correct);
    assert_eq!(rows[0].actual, "revised");
}

#[tokio::test]
async fn aggregates_group_by_pair_and_metadata() {
    let store = ResultsStore::in_memory().await.unwrap();
    store
        .insert_run(&RunRecord::new(
            "run-1",
            vec!["b".into()],
            vec!["p1".into(), "p2".into()],
        ))
        .await
        .unwrap();

    store.upsert_result(&result("run-1", "b", "p1", "i1", true)).await.unwrap();
    store.upsert_result(&result("run-1", "b", "p1", "i2", false)).await.unwrap();
    store.upsert_result(&result("run-1", "b", "p2", "i1", true)).await.unwrap();

    let pairs = store.aggregate_pairs("run-1").await.unwrap();
    assert_eq!(pairs.len(), 2);
    let p1 = pairs.iter().find(|a| a.provider == "p1").unwrap();
    assert_eq!(p1.total, 2);
    assert_eq!(p1.correct, 1);
    assert!((p1.avg_score - 0.5).abs() < 1e-9);

    let by_type = store.aggregate_by_question_type("run-1").await.unwrap();
    assert_eq!(by_type.len(), 1);
    assert_eq!(by_type[0].group, "single-session");
    assert_eq!(by_type[0].total, 3);

    let comparison = store
        .compare_providers("run-1", "b", &["p2".to_string()])
        .await
        .unwrap();
    assert_eq!(comparison.len(), 1);
    assert_eq!(comparison[0].provider, "p2");
}

#[tokio::test]
async fn json_export_round_trips() {
    let store = ResultsStore::in_memory().await.unwrap();
    store
        .insert_run(
            &RunRecord::new("run-1", vec!["b".into()], vec!["p".into()])
                .with_config(json!({"limit": 10})),
        )
        .await
        .unwrap();
    store.upsert_result(&result("run-1", "b", "p", "i1", true)).await.unwrap();
    store.upsert_result(&result("run-1", "b", "p", "i2", false)).await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("run-1.json");
    store.export_json("run-1", &path).await.unwrap();

    let raw = std::fs::read_to_string(&path).unwrap();
    let reparsed = parse_export(&raw).unwrap();
    assert_eq!(reparsed.run.id, "run-1");
    assert_eq!(reparsed.results.len(), 2);

    let original = store.results_for_run("run-1").await.unwrap();
    for (a, b) in original.iter().zip(reparsed.results.iter()) {
        assert_eq!(a.item_id, b.item_id);
        assert_eq!(a.score, b.score);
        assert_eq!(a.correct, b.correct);
        assert_eq!(a.retrieved, b.retrieved);
        assert_eq!(a.metadata, b.metadata);
    }
}

#[tokio::test]
async fn csv_export_quotes_content_fields() {
    let store = ResultsStore::in_memory().await.unwrap();
    store
        .insert_run(&RunRecord::new("run-1", vec!["b".into()], vec!["p".into()]))
        .await
        .unwrap();
    store.upsert_result(&result("run-1", "b", "p", "i1", true)).await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("run-1.csv");
    store.export_csv("run-1", &path).await.unwrap();

    let raw = std::fs::read_to_string(&path).unwrap();
    // embedded quotes doubled inside a quoted field
    assert!(raw.contains(r#""a ""quoted"" answer, with commas""#));

    let mut reader = csv::Reader::from_reader(raw.as_bytes());
    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 1);
    assert_eq!(&rows[0][3], "i1");
    assert_eq!(&rows[0][5], "a \"quoted\" answer, with commas");
}

#[tokio::test]
async fn missing_run_export_is_not_found() {
    let store = ResultsStore::in_memory().await.unwrap();
    let err = store.export_document("missing").await.unwrap_err();
    assert!(err.to_string().contains("missing"));
}

#[tokio::test]
async fn list_runs_paginates_newest_first() {
    let store = ResultsStore::in_memory().await.unwrap();
    for i in 0..3 {
        let mut run = RunRecord::new(format!("run-{i}"), vec![], vec![]);
        run.started_at = Utc::now() + chrono::Duration::seconds(i);
        store.insert_run(&run).await.unwrap();
    }
    let page = store.list_runs(2, 0).await.unwrap();
    assert_eq!(page.len(), 2);
    assert_eq!(page[0].id, "run-2");
    let rest = store.list_runs(2, 2).await.unwrap();
    assert_eq!(rest.len(), 1);
    assert_eq!(rest[0].id, "run-0");
}
