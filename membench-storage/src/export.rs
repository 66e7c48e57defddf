//! Run export: a structured JSON document mirroring the stored shape, or
//! a flat CSV with standard quoting.

use std::path::Path;

use serde::{Deserialize, Serialize};

use membench_core::domain::{EvalResult, RunRecord};
use membench_core::{CoreError, Result};

use crate::store::ResultsStore;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunExport {
    pub run: RunRecord,
    pub results: Vec<EvalResult>,
}

impl ResultsStore {
    pub async fn export_document(&self, run_id: &str) -> Result<RunExport> {
        let run = self
            .get_run(run_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("run '{run_id}'")))?;
        let results = self.results_for_run(run_id).await?;
        Ok(RunExport { run, results })
    }

    pub async fn export_json(&self, run_id: &str, path: &Path) -> Result<()> {
        let document = self.export_document(run_id).await?;
        let json = serde_json::to_string_pretty(&document)?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    /// Flat CSV. Content fields are quoted as needed and embedded quotes
    /// doubled, per standard CSV rules.
    pub async fn export_csv(&self, run_id: &str, path: &Path) -> Result<()> {
        let results = self.results_for_run(run_id).await?;

        let mut writer = csv::Writer::from_path(path)
            .map_err(|e| CoreError::Io(e.to_string()))?;
        writer
            .write_record([
                "run_id",
                "benchmark",
                "provider",
                "item_id",
                "question",
                "expected",
                "actual",
                "score",
                "correct",
                "retrieved_context",
                "metadata",
                "created_at",
            ])
            .map_err(|e| CoreError::Io(e.to_string()))?;

        for result in &results {
            writer
                .write_record([
                    result.run_id.as_str(),
                    result.benchmark.as_str(),
                    result.provider.as_str(),
                    result.item_id.as_str(),
                    result.question.as_str(),
                    result.expected.as_str(),
                    result.actual.as_str(),
                    &result.score.to_string(),
                    if result.correct { "1" } else { "0" },
                    &serde_json::to_string(&result.retrieved)?,
                    &serde_json::to_string(&result.metadata)?,
                    &result.created_at.to_rfc3339(),
                ])
                .map_err(|e| CoreError::Io(e.to_string()))?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Reparses a JSON export; the inverse of [`ResultsStore::export_json`].
pub fn parse_export(raw: &str) -> Result<RunExport> {
    Ok(serde_json::from_str(raw)?)
}
