//! Snapshot persistence
//!
//! Every detection run is stored as one [`TrendSnapshot`]. Backends:
//!
//! - [`FileSnapshotStore`] - one JSON file per snapshot, written atomically
//! - [`SqliteSnapshotStore`] - one row per snapshot, inserted in a transaction
//! - [`MemorySnapshotStore`] - process memory, for tests and dry runs
//!
//! Snapshot ids sort in insertion order, so "most recent" means "largest id".

pub mod file;
pub mod memory;
pub mod sqlite;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::{StorageBackend, StorageConfig};
use crate::trends::TrendSnapshot;

pub use file::FileSnapshotStore;
pub use memory::MemorySnapshotStore;
pub use sqlite::SqliteSnapshotStore;

/// Listing entry for a stored snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotSummary {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub trend_count: usize,
    pub spike_count: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SnapshotSummary {
    pub fn from_snapshot(id: impl Into<String>, snapshot: &TrendSnapshot) -> Self {
        Self {
            id: id.into(),
            timestamp: snapshot.timestamp,
            trend_count: snapshot.trend_count(),
            spike_count: snapshot.spikes.len(),
            error: snapshot.trending_topics.error.clone(),
        }
    }
}

/// Durable store of detection snapshots
pub trait SnapshotRepository: Send + Sync {
    /// Backend name for logs
    fn backend(&self) -> &str;

    /// Persist a snapshot, returning its id
    fn append(&self, snapshot: &TrendSnapshot) -> Result<String>;

    /// All snapshot ids, newest first
    fn ids(&self) -> Result<Vec<String>>;

    /// Load one snapshot
    fn load(&self, id: &str) -> Result<Option<TrendSnapshot>>;

    /// Delete one snapshot; false if it did not exist
    fn delete(&self, id: &str) -> Result<bool>;

    /// Most recent snapshot
    fn load_latest(&self) -> Result<Option<TrendSnapshot>> {
        match self.ids()?.first() {
            Some(id) => self.load(id),
            None => Ok(None),
        }
    }

    /// Summaries of the `limit` newest snapshots, newest first
    fn list_recent(&self, limit: usize) -> Result<Vec<SnapshotSummary>> {
        let mut summaries = Vec::new();
        for id in self.ids()?.into_iter().take(limit) {
            if let Some(snapshot) = self.load(&id)? {
                summaries.push(SnapshotSummary::from_snapshot(id, &snapshot));
            }
        }
        Ok(summaries)
    }

    /// Keep the `keep` newest snapshots; returns how many were removed
    fn prune(&self, keep: usize) -> Result<usize> {
        let mut removed = 0;
        for id in self.ids()?.into_iter().skip(keep) {
            if self.delete(&id)? {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

/// Open the configured backend
pub fn open(config: &StorageConfig) -> Result<Arc<dyn SnapshotRepository>> {
    let store: Arc<dyn SnapshotRepository> = match config.backend {
        StorageBackend::File => Arc::new(FileSnapshotStore::new(&config.dir)?),
        StorageBackend::Sqlite => Arc::new(SqliteSnapshotStore::new(&config.sqlite_path)?),
        StorageBackend::Memory => Arc::new(MemorySnapshotStore::new()),
    };

    tracing::debug!(backend = store.backend(), "Snapshot store opened");
    Ok(store)
}
