use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Phases of one (benchmark, provider) task, in execution order. The
/// derived `Ord` is load-bearing: an item completed at phase P counts as
/// completed for every earlier phase.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Ingest,
    Search,
    Evaluate,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointEntry {
    pub item_id: String,
    pub status: ItemStatus,
    pub phase: Phase,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Durable progress record for one (run, benchmark, provider) pair.
/// Entries keep insertion order; persistence is handled by the runner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub run_id: String,
    pub benchmark: String,
    pub provider: String,
    pub entries: Vec<CheckpointEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Checkpoint {
    pub fn new(
        run_id: impl Into<String>,
        benchmark: impl Into<String>,
        provider: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            run_id: run_id.into(),
            benchmark: benchmark.into(),
            provider: provider.into(),
            entries: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn entry(&self, item_id: &str) -> Option<&CheckpointEntry> {
        self.entries.iter().find(|e| e.item_id == item_id)
    }

    /// True iff the item is completed at `phase` or any later phase.
    pub fn is_done(&self, item_id: &str, phase: Phase) -> bool {
        self.entry(item_id)
            .map(|e| e.status == ItemStatus::Completed && e.phase >= phase)
            .unwrap_or(false)
    }

    pub fn record(
        &mut self,
        item_id: &str,
        status: ItemStatus,
        phase: Phase,
        error: Option<String>,
    ) {
        let now = Utc::now();
        self.updated_at = now;
        if let Some(entry) = self.entries.iter_mut().find(|e| e.item_id == item_id) {
            entry.status = status;
            entry.phase = phase;
            entry.timestamp = now;
            entry.error = error;
        } else {
            self.entries.push(CheckpointEntry {
                item_id: item_id.to_string(),
                status,
                phase,
                timestamp: now,
                error,
            });
        }
    }

    /// Failed entries at `phase` or later. Item failures are counted by
    /// passing `Phase::Search`, which excludes ingest-phase context
    /// entries.
    pub fn count_failed_since(&self, phase: Phase) -> usize {
        self.entries
            .iter()
            .filter(|e| e.status == ItemStatus::Failed && e.phase >= phase)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_order() {
        assert!(Phase::Ingest < Phase::Search);
        assert!(Phase::Search < Phase::Evaluate);
    }

    #[test]
    fn later_phase_covers_earlier() {
        let mut cp = Checkpoint::new("r", "b", "p");
        cp.record("item-1", ItemStatus::Completed, Phase::Evaluate, None);

        assert!(cp.is_done("item-1", Phase::Ingest));
        assert!(cp.is_done("item-1", Phase::Search));
        assert!(cp.is_done("item-1", Phase::Evaluate));
    }

    #[test]
    fn earlier_phase_does_not_cover_later() {
        let mut cp = Checkpoint::new("r", "b", "p");
        cp.record("item-1", ItemStatus::Completed, Phase::Ingest, None);

        assert!(cp.is_done("item-1", Phase::Ingest));
        assert!(!cp.is_done("item-1", Phase::Evaluate));
    }

    #[test]
    fn failed_items_are_not_done() {
        let mut cp = Checkpoint::new("r", "b", "p");
        cp.record("item-1", ItemStatus::Failed, Phase::Evaluate, Some("boom".into()));
        assert!(!cp.is_done("item-1", Phase::Evaluate));
        assert_eq!(cp.entry("item-1").unwrap().error.as_deref(), Some("boom"));
    }

    #[test]
    fn failed_count_excludes_ingest_contexts() {
        let mut cp = Checkpoint::new("r", "b", "p");
        cp.record("item-1-ctx-0", ItemStatus::Failed, Phase::Ingest, Some("io".into()));
        cp.record("item-1", ItemStatus::Failed, Phase::Search, Some("timeout".into()));
        cp.record("item-2", ItemStatus::Failed, Phase::Evaluate, Some("model".into()));
        cp.record("item-3", ItemStatus::Completed, Phase::Evaluate, None);

        assert_eq!(cp.count_failed_since(Phase::Search), 2);
        assert_eq!(cp.count_failed_since(Phase::Ingest), 3);
        assert_eq!(cp.count_failed_since(Phase::Evaluate), 1);
    }

    #[test]
    fn record_updates_in_place() {
        let mut cp = Checkpoint::new("r", "b", "p");
        cp.record("item-1", ItemStatus::InProgress, Phase::Evaluate, None);
        cp.record("item-1", ItemStatus::Completed, Phase::Evaluate, None);
        assert_eq!(cp.entries.len(), 1);
        assert!(cp.is_done("item-1", Phase::Evaluate));
    }
}
