//! In-process snapshot store

use anyhow::Result;
use std::sync::{Mutex, MutexGuard};

use super::SnapshotRepository;
use crate::trends::TrendSnapshot;

/// Snapshots held in memory, oldest first
#[derive(Default)]
pub struct MemorySnapshotStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    next_id: u64,
    snapshots: Vec<(u64, TrendSnapshot)>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored snapshots
    pub fn len(&self) -> usize {
        self.lock().map(|inner| inner.snapshots.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| anyhow::anyhow!("Snapshot store lock poisoned"))
    }
}

impl SnapshotRepository for MemorySnapshotStore {
    fn backend(&self) -> &str {
        "memory"
    }

    fn append(&self, snapshot: &TrendSnapshot) -> Result<String> {
        let mut inner = self.lock()?;
        inner.next_id += 1;
        let id = inner.next_id;
        inner.snapshots.push((id, snapshot.clone()));
        Ok(id.to_string())
    }

    fn ids(&self) -> Result<Vec<String>> {
        let inner = self.lock()?;
        Ok(inner
            .snapshots
            .iter()
            .rev()
            .map(|(id, _)| id.to_string())
            .collect())
    }

    fn load(&self, id: &str) -> Result<Option<TrendSnapshot>> {
        let Ok(id) = id.parse::<u64>() else {
            return Ok(None);
        };
        let inner = self.lock()?;
        Ok(inner
            .snapshots
            .iter()
            .find(|(sid, _)| *sid == id)
            .map(|(_, snapshot)| snapshot.clone()))
    }

    fn delete(&self, id: &str) -> Result<bool> {
        let Ok(id) = id.parse::<u64>() else {
            return Ok(false);
        };
        let mut inner = self.lock()?;
        let before = inner.snapshots.len();
        inner.snapshots.retain(|(sid, _)| *sid != id);
        Ok(inner.snapshots.len() < before)
    }
}
