//! Durable per-pair progress records.
//!
//! Every mutation is written to a temporary file and atomically renamed
//! into place; a crash mid-write can never corrupt an existing
//! checkpoint. Writes sit on the critical path on purpose.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tokio::sync::RwLock;
use tracing::debug;

use membench_core::domain::{Checkpoint, ItemStatus, Phase};
use membench_core::{CoreError, Result};

pub struct CheckpointManager {
    root: PathBuf,
    cache: RwLock<HashMap<String, Checkpoint>>,
}

impl CheckpointManager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    fn cache_key(run_id: &str, benchmark: &str, provider: &str) -> String {
        format!("{run_id}/{benchmark}-{provider}")
    }

    /// `checkpoints/{run_id}/{benchmark}-{provider}.json`
    pub fn file_path(&self, run_id: &str, benchmark: &str, provider: &str) -> PathBuf {
        self.root
            .join(run_id)
            .join(format!("{benchmark}-{provider}.json"))
    }

    /// Returns the existing checkpoint or creates a fresh one, caching it
    /// in memory. A corrupted file is fatal for the pair.
    pub async fn load_or_create(
        &self,
        run_id: &str,
        benchmark: &str,
        provider: &str,
    ) -> Result<Checkpoint> {
        let key = Self::cache_key(run_id, benchmark, provider);
        if let Some(checkpoint) = self.cache.read().await.get(&key) {
            return Ok(checkpoint.clone());
        }

        let path = self.file_path(run_id, benchmark, provider);
        let checkpoint = if path.exists() {
            let raw = tokio::fs::read_to_string(&path).await?;
            serde_json::from_str(&raw).map_err(|e| {
                CoreError::Checkpoint(format!("corrupted checkpoint {}: {e}", path.display()))
            })?
        } else {
            Checkpoint::new(run_id, benchmark, provider)
        };

        self.cache
            .write()
            .await
            .insert(key, checkpoint.clone());
        Ok(checkpoint)
    }

    /// True iff a record exists for `item_id` with status completed at a
    /// phase >= the requested one.
    pub async fn should_skip(
        &self,
        run_id: &str,
        benchmark: &str,
        provider: &str,
        item_id: &str,
        phase: Phase,
    ) -> bool {
        let key = Self::cache_key(run_id, benchmark, provider);
        self.cache
            .read()
            .await
            .get(&key)
            .map(|cp| cp.is_done(item_id, phase))
            .unwrap_or(false)
    }

    pub async fn mark_in_progress(
        &self,
        run_id: &str,
        benchmark: &str,
        provider: &str,
        item_id: &str,
        phase: Phase,
    ) -> Result<()> {
        self.record(run_id, benchmark, provider, item_id, ItemStatus::InProgress, phase, None)
            .await
    }

    pub async fn mark_complete(
        &self,
        run_id: &str,
        benchmark: &str,
        provider: &str,
        item_id: &str,
        phase: Phase,
    ) -> Result<()> {
        self.record(run_id, benchmark, provider, item_id, ItemStatus::Completed, phase, None)
            .await
    }

    pub async fn mark_failed(
        &self,
        run_id: &str,
        benchmark: &str,
        provider: &str,
        item_id: &str,
        phase: Phase,
        error: String,
    ) -> Result<()> {
        self.record(
            run_id,
            benchmark,
            provider,
            item_id,
            ItemStatus::Failed,
            phase,
            Some(error),
        )
        .await
    }

    /// Current in-memory state of one pair's checkpoint.
    pub async fn snapshot(
        &self,
        run_id: &str,
        benchmark: &str,
        provider: &str,
    ) -> Option<Checkpoint> {
        let key = Self::cache_key(run_id, benchmark, provider);
        self.cache.read().await.get(&key).cloned()
    }

    async fn record(
        &self,
        run_id: &str,
        benchmark: &str,
        provider: &str,
        item_id: &str,
        status: ItemStatus,
        phase: Phase,
        error: Option<String>,
    ) -> Result<()> {
        let key = Self::cache_key(run_id, benchmark, provider);
        let checkpoint = {
            let mut cache = self.cache.write().await;
            let checkpoint = cache
                .entry(key)
                .or_insert_with(|| Checkpoint::new(run_id, benchmark, provider));
            checkpoint.record(item_id, status, phase, error);
            checkpoint.clone()
        };

        self.persist(&checkpoint).await
    }

    async fn persist(&self, checkpoint: &Checkpoint) -> Result<()> {
        let path = self.file_path(&checkpoint.run_id, &checkpoint.benchmark, &checkpoint.provider);
        let parent = path
            .parent()
            .ok_or_else(|| CoreError::Checkpoint("checkpoint path has no parent".to_string()))?;
        tokio::fs::create_dir_all(parent).await?;

        let json = serde_json::to_string_pretty(checkpoint)?;
        write_atomic(parent, &path, &json)?;
        debug!(path = %path.display(), "checkpoint persisted");
        Ok(())
    }
}

/// Write-to-temp-then-rename in the destination directory, so the rename
/// stays on one filesystem.
fn write_atomic(dir: &Path, path: &Path, content: &str) -> Result<()> {
    use std::io::Write;

    let mut temp = tempfile::NamedTempFile::new_in(dir)?;
    temp.write_all(content.as_bytes())?;
    temp.flush()?;
    temp.persist(path)
        .map_err(|e| CoreError::Checkpoint(format!("atomic rename failed: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn load_or_create_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(dir.path());

        manager
            .mark_complete("run-1", "bench", "prov", "item-1", Phase::Evaluate)
            .await
            .unwrap();

        // a fresh manager re-reads the persisted file
        let reloaded = CheckpointManager::new(dir.path());
        let checkpoint = reloaded
            .load_or_create("run-1", "bench", "prov")
            .await
            .unwrap();
        assert!(checkpoint.is_done("item-1", Phase::Evaluate));
        assert!(
            reloaded
                .should_skip("run-1", "bench", "prov", "item-1", Phase::Ingest)
                .await
        );
    }

    #[tokio::test]
    async fn failed_items_are_not_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(dir.path());
        manager
            .mark_failed("run-1", "b", "p", "item-1", Phase::Evaluate, "boom".into())
            .await
            .unwrap();
        assert!(
            !manager
                .should_skip("run-1", "b", "p", "item-1", Phase::Evaluate)
                .await
        );
    }

    #[tokio::test]
    async fn corrupted_checkpoint_is_fatal_for_the_pair() {
        let dir = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(dir.path());
        let path = manager.file_path("run-1", "b", "p");
        tokio::fs::create_dir_all(path.parent().unwrap()).await.unwrap();
        tokio::fs::write(&path, "{not json").await.unwrap();

        let err = manager.load_or_create("run-1", "b", "p").await.unwrap_err();
        assert!(matches!(err, CoreError::Checkpoint(_)));
    }

    #[tokio::test]
    async fn checkpoint_file_lands_at_the_documented_path() {
        let dir = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(dir.path());
        manager
            .mark_complete("run-9", "locomo", "vectordb", "i", Phase::Ingest)
            .await
            .unwrap();
        assert!(dir
            .path()
            .join("run-9")
            .join("locomo-vectordb.json")
            .exists());
    }
}
