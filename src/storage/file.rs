//! One JSON file per snapshot
//!
//! Files are named `trends_{id}.json` where `id` is a zero-padded, strictly
//! increasing number derived from the wall clock in nanoseconds. Writes go to
//! a `.tmp` file first and are renamed into place. Temp files left behind by
//! an interrupted write are removed when the store is opened.

use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use super::SnapshotRepository;
use crate::trends::TrendSnapshot;

const PREFIX: &str = "trends_";
const SUFFIX: &str = ".json";

/// Snapshot store backed by a directory
pub struct FileSnapshotStore {
    /// Directory holding snapshot files
    dir: PathBuf,

    /// Largest id handed out or found on disk
    last_id: AtomicU64,
}

impl FileSnapshotStore {
    /// Open (and create) a snapshot directory
    pub fn new(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create snapshot directory: {}", dir.display()))?;

        let store = Self {
            dir: dir.to_path_buf(),
            last_id: AtomicU64::new(0),
        };

        let removed = store.remove_stale_temp_files()?;
        if removed > 0 {
            tracing::warn!(dir = %dir.display(), removed, "Removed interrupted snapshot writes");
        }

        let newest = store.scan()?.first().map(|(n, _)| *n).unwrap_or(0);
        store.last_id.store(newest, Ordering::SeqCst);

        tracing::debug!(dir = %dir.display(), newest, "File snapshot store opened");
        Ok(store)
    }

    /// Snapshot directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &str) -> Option<PathBuf> {
        // Ids are plain numbers; anything else cannot name a snapshot file
        if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        Some(self.dir.join(format!("{PREFIX}{id}{SUFFIX}")))
    }

    fn next_id(&self) -> u64 {
        let now = chrono::Utc::now()
            .timestamp_nanos_opt()
            .map(|n| n.max(0) as u64)
            .unwrap_or(0);

        let previous = self
            .last_id
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last.saturating_add(1)))
            })
            .unwrap_or_else(|last| last);

        now.max(previous.saturating_add(1))
    }

    /// Delete `trends_*.json.tmp` files, returning how many were removed
    fn remove_stale_temp_files(&self) -> Result<usize> {
        let mut removed = 0;

        let entries = fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to list snapshot directory: {}", self.dir.display()))?;

        for entry in entries {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            let is_temp = name.starts_with(PREFIX)
                && name.strip_suffix(".tmp").is_some_and(|n| n.ends_with(SUFFIX));
            if !is_temp {
                continue;
            }

            let path = entry.path();
            fs::remove_file(&path)
                .with_context(|| format!("Failed to remove temp file: {}", path.display()))?;
            removed += 1;
        }

        Ok(removed)
    }

    /// Snapshot files on disk as (numeric id, id text), newest first
    fn scan(&self) -> Result<Vec<(u64, String)>> {
        let mut ids = Vec::new();

        let entries = fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to list snapshot directory: {}", self.dir.display()))?;

        for entry in entries {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            let Some(id) = name
                .strip_prefix(PREFIX)
                .and_then(|rest| rest.strip_suffix(SUFFIX))
            else {
                continue;
            };
            if let Ok(n) = id.parse::<u64>() {
                ids.push((n, id.to_string()));
            }
        }

        ids.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(ids)
    }
}

impl SnapshotRepository for FileSnapshotStore {
    fn backend(&self) -> &str {
        "file"
    }

    fn append(&self, snapshot: &TrendSnapshot) -> Result<String> {
        let id = format!("{:020}", self.next_id());
        let filename = format!("{PREFIX}{id}{SUFFIX}");
        let filepath = self.dir.join(&filename);

        // Write to temp file first, then rename (atomic)
        let temp_path = self.dir.join(format!("{filename}.tmp"));

        let file = File::create(&temp_path)
            .with_context(|| format!("Failed to create snapshot file: {}", temp_path.display()))?;

        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, snapshot)
            .context("Failed to serialize snapshot")?;
        writer
            .flush()
            .with_context(|| format!("Failed to write snapshot file: {}", temp_path.display()))?;
        drop(writer);

        if let Err(e) = fs::rename(&temp_path, &filepath) {
            let _ = fs::remove_file(&temp_path);
            return Err(e).with_context(|| {
                format!("Failed to rename snapshot file: {}", filepath.display())
            });
        }

        tracing::debug!(path = %filepath.display(), "Snapshot saved");
        Ok(id)
    }

    fn ids(&self) -> Result<Vec<String>> {
        Ok(self.scan()?.into_iter().map(|(_, id)| id).collect())
    }

    fn load(&self, id: &str) -> Result<Option<TrendSnapshot>> {
        let Some(filepath) = self.path_for(id) else {
            return Ok(None);
        };

        if !filepath.exists() {
            return Ok(None);
        }

        let file = File::open(&filepath)
            .with_context(|| format!("Failed to open snapshot file: {}", filepath.display()))?;

        let reader = BufReader::new(file);
        let snapshot = serde_json::from_reader(reader)
            .with_context(|| format!("Failed to parse snapshot file: {}", filepath.display()))?;

        Ok(Some(snapshot))
    }

    fn delete(&self, id: &str) -> Result<bool> {
        let Some(filepath) = self.path_for(id) else {
            return Ok(false);
        };

        if !filepath.exists() {
            return Ok(false);
        }

        fs::remove_file(&filepath)
            .with_context(|| format!("Failed to delete snapshot: {}", filepath.display()))?;
        tracing::debug!(path = %filepath.display(), "Snapshot deleted");
        Ok(true)
    }
}
