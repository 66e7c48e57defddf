//! SQLite-backed results store. One file per deployment, JSON-typed
//! columns stored as serialized TEXT.

use std::path::Path;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};

use membench_core::domain::{EvalResult, RunRecord};
use membench_core::{CoreError, Result};

#[derive(Clone)]
pub struct ResultsStore {
    pool: SqlitePool,
}

impl ResultsStore {
    /// Opens (or creates) the store at `path` and applies the schema.
    pub async fn open(path: &Path) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// In-memory store for tests.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS runs (
                id TEXT PRIMARY KEY,
                started_at TEXT NOT NULL,
                completed_at TEXT,
                benchmarks TEXT NOT NULL,
                providers TEXT NOT NULL,
                config TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS results (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                run_id TEXT NOT NULL,
                benchmark TEXT NOT NULL,
                provider TEXT NOT NULL,
                item_id TEXT NOT NULL,
                question TEXT NOT NULL,
                expected TEXT NOT NULL,
                actual TEXT NOT NULL,
                score REAL NOT NULL,
                correct INTEGER NOT NULL,
                retrieved_context TEXT NOT NULL,
                metadata TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        for statement in [
            "CREATE INDEX IF NOT EXISTS idx_results_run ON results(run_id)",
            "CREATE INDEX IF NOT EXISTS idx_results_benchmark ON results(benchmark)",
            "CREATE INDEX IF NOT EXISTS idx_results_provider ON results(provider)",
            "CREATE UNIQUE INDEX IF NOT EXISTS uq_results_item \
             ON results(run_id, benchmark, provider, item_id)",
        ] {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    // ===== Runs =====

    pub async fn insert_run(&self, run: &RunRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO runs (id, started_at, completed_at, benchmarks, providers, config)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&run.id)
        .bind(run.started_at.to_rfc3339())
        .bind(run.completed_at.map(|t| t.to_rfc3339()))
        .bind(serde_json::to_string(&run.benchmarks)?)
        .bind(serde_json::to_string(&run.providers)?)
        .bind(serde_json::to_string(&run.config)?)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn complete_run(&self, run_id: &str) -> Result<()> {
        sqlx::query("UPDATE runs SET completed_at = ?1 WHERE id = ?2")
            .bind(Utc::now().to_rfc3339())
            .bind(run_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn get_run(&self, run_id: &str) -> Result<Option<RunRecord>> {
        let row = sqlx::query(
            "SELECT id, started_at, completed_at, benchmarks, providers, config \
             FROM runs WHERE id = ?1",
        )
        .bind(run_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(row_to_run).transpose()
    }

    pub async fn list_runs(&self, limit: i64, offset: i64) -> Result<Vec<RunRecord>> {
        let rows = sqlx::query(
            "SELECT id, started_at, completed_at, benchmarks, providers, config \
             FROM runs ORDER BY started_at DESC LIMIT ?1 OFFSET ?2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(row_to_run).collect()
    }

    // ===== Results =====

    /// Insert-or-replace on the `(run_id, benchmark, provider, item_id)`
    /// unique index, so re-running an item upserts its row.
    pub async fn upsert_result(&self, result: &EvalResult) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO results (
                run_id, benchmark, provider, item_id, question, expected, actual,
                score, correct, retrieved_context, metadata, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            ON CONFLICT(run_id, benchmark, provider, item_id) DO UPDATE SET
                question = excluded.question,
                expected = excluded.expected,
                actual = excluded.actual,
                score = excluded.score,
                correct = excluded.correct,
                retrieved_context = excluded.retrieved_context,
                metadata = excluded.metadata,
                created_at = excluded.created_at
            "#,
        )
        .bind(&result.run_id)
        .bind(&result.benchmark)
        .bind(&result.provider)
        .bind(&result.item_id)
        .bind(&result.question)
        .bind(&result.expected)
        .bind(&result.actual)
        .bind(result.score)
        .bind(result.correct as i64)
        .bind(serde_json::to_string(&result.retrieved)?)
        .bind(serde_json::to_string(&result.metadata)?)
        .bind(result.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn results_for_run(&self, run_id: &str) -> Result<Vec<EvalResult>> {
        let rows = sqlx::query(
            "SELECT run_id, benchmark, provider, item_id, question, expected, actual, \
                    score, correct, retrieved_context, metadata, created_at \
             FROM results WHERE run_id = ?1 ORDER BY benchmark, provider, id",
        )
        .bind(run_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(row_to_result).collect()
    }

    pub async fn results_for_pair(
        &self,
        run_id: &str,
        benchmark: &str,
        provider: &str,
    ) -> Result<Vec<EvalResult>> {
        let rows = sqlx::query(
            "SELECT run_id, benchmark, provider, item_id, question, expected, actual, \
                    score, correct, retrieved_context, metadata, created_at \
             FROM results WHERE run_id = ?1 AND benchmark = ?2 AND provider = ?3 \
             ORDER BY id",
        )
        .bind(run_id)
        .bind(benchmark)
        .bind(provider)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(row_to_result).collect()
    }

    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn parse_timestamp(raw: String) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| CoreError::Database(format!("bad timestamp '{raw}': {e}")))
}

fn row_to_run(row: sqlx::sqlite::SqliteRow) -> Result<RunRecord> {
    let completed_at: Option<String> = row.get("completed_at");
    Ok(RunRecord {
        id: row.get("id"),
        started_at: parse_timestamp(row.get("started_at"))?,
        completed_at: completed_at.map(parse_timestamp).transpose()?,
        benchmarks: serde_json::from_str(row.get::<String, _>("benchmarks").as_str())?,
        providers: serde_json::from_str(row.get::<String, _>("providers").as_str())?,
        config: serde_json::from_str(row.get::<String, _>("config").as_str())?,
    })
}

fn row_to_result(row: sqlx::sqlite::SqliteRow) -> Result<EvalResult> {
    Ok(EvalResult {
        run_id: row.get("run_id"),
        benchmark: row.get("benchmark"),
        provider: row.get("provider"),
        item_id: row.get("item_id"),
        question: row.get("question"),
        expected: row.get("expected"),
        actual: row.get("actual"),
        score: row.get("score"),
        correct: row.get::<i64, _>("correct") != 0,
        retrieved: serde_json::from_str(row.get::<String, _>("retrieved_context").as_str())?,
        metadata: serde_json::from_str(row.get::<String, _>("metadata").as_str())?,
        created_at: parse_timestamp(row.get("created_at"))?,
    })
}
