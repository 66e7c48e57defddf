//! Aggregation queries over stored results.

use serde::{Deserialize, Serialize};
use sqlx::Row;

use membench_core::Result;

use crate::store::ResultsStore;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PairAggregate {
    pub benchmark: String,
    pub provider: String,
    pub total: i64,
    pub correct: i64,
    pub avg_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GroupAggregate {
    pub group: String,
    pub total: i64,
    pub correct: i64,
    pub avg_score: f64,
}

impl ResultsStore {
    /// `(benchmark, provider)` rollup for one run.
    pub async fn aggregate_pairs(&self, run_id: &str) -> Result<Vec<PairAggregate>> {
        let rows = sqlx::query(
            "SELECT benchmark, provider, COUNT(*) AS total, SUM(correct) AS correct, \
                    AVG(score) AS avg_score \
             FROM results WHERE run_id = ?1 \
             GROUP BY benchmark, provider ORDER BY benchmark, provider",
        )
        .bind(run_id)
        .fetch_all(self.pool())
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| PairAggregate {
                benchmark: row.get("benchmark"),
                provider: row.get("provider"),
                total: row.get("total"),
                correct: row.get::<Option<i64>, _>("correct").unwrap_or(0),
                avg_score: row.get::<Option<f64>, _>("avg_score").unwrap_or(0.0),
            })
            .collect())
    }

    pub async fn aggregate_by_question_type(&self, run_id: &str) -> Result<Vec<GroupAggregate>> {
        self.aggregate_by_metadata(run_id, "$.questionType").await
    }

    pub async fn aggregate_by_category(&self, run_id: &str) -> Result<Vec<GroupAggregate>> {
        self.aggregate_by_metadata(run_id, "$.category").await
    }

    async fn aggregate_by_metadata(
        &self,
        run_id: &str,
        json_path: &str,
    ) -> Result<Vec<GroupAggregate>> {
        let rows = sqlx::query(
            "SELECT COALESCE(json_extract(metadata, ?2), 'unknown') AS grp, \
                    COUNT(*) AS total, SUM(correct) AS correct, AVG(score) AS avg_score \
             FROM results WHERE run_id = ?1 GROUP BY grp ORDER BY grp",
        )
        .bind(run_id)
        .bind(json_path)
        .fetch_all(self.pool())
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| GroupAggregate {
                group: row.get("grp"),
                total: row.get("total"),
                correct: row.get::<Option<i64>, _>("correct").unwrap_or(0),
                avg_score: row.get::<Option<f64>, _>("avg_score").unwrap_or(0.0),
            })
            .collect())
    }

    /// Per-provider aggregates for one benchmark, restricted to the
    /// requested provider names when any are given.
    pub async fn compare_providers(
        &self,
        run_id: &str,
        benchmark: &str,
        providers: &[String],
    ) -> Result<Vec<PairAggregate>> {
        let mut aggregates: Vec<PairAggregate> = self
            .aggregate_pairs(run_id)
            .await?
            .into_iter()
            .filter(|a| a.benchmark == benchmark)
            .collect();
        if !providers.is_empty() {
            aggregates.retain(|a| providers.contains(&a.provider));
        }
        Ok(aggregates)
    }
}
