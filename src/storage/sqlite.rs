//! SQLite snapshot store
//!
//! Uses `Mutex` to ensure thread-safety for the SQLite connection. Summary
//! columns are stored next to the JSON payload so listing does not parse it.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::{SnapshotRepository, SnapshotSummary};
use crate::trends::TrendSnapshot;

/// Snapshot store backed by a SQLite table
pub struct SqliteSnapshotStore {
    conn: Mutex<Connection>,
}

impl SqliteSnapshotStore {
    /// Open (and create) a database file
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        // Create parent directory if needed
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path).context("Failed to open SQLite database")?;

        // Enable WAL mode for better concurrency
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.create_schema()?;

        tracing::info!(path = %path.display(), "SQLite snapshot store initialized");
        Ok(store)
    }

    /// Create in-memory store (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to create in-memory SQLite")?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.create_schema()?;
        Ok(store)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow::anyhow!("SQLite connection lock poisoned"))
    }

    /// Create database schema
    fn create_schema(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch(
            r#"
                CREATE TABLE IF NOT EXISTS trend_snapshots (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    created_at TEXT NOT NULL,
                    trend_count INTEGER NOT NULL,
                    spike_count INTEGER NOT NULL,
                    error_message TEXT,
                    payload TEXT NOT NULL
                );
                "#,
        )
        .context("Failed to create SQLite schema")?;

        Ok(())
    }

    fn parse_id(id: &str) -> Option<i64> {
        id.parse::<i64>().ok()
    }
}

impl SnapshotRepository for SqliteSnapshotStore {
    fn backend(&self) -> &str {
        "sqlite"
    }

    fn append(&self, snapshot: &TrendSnapshot) -> Result<String> {
        let payload = serde_json::to_string(snapshot).context("Failed to serialize snapshot")?;

        let mut conn = self.lock()?;
        let tx = conn.transaction().context("Failed to begin transaction")?;

        tx.execute(
            r#"
                INSERT INTO trend_snapshots (created_at, trend_count, spike_count, error_message, payload)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            params![
                snapshot.timestamp.to_rfc3339(),
                snapshot.trend_count() as i64,
                snapshot.spikes.len() as i64,
                snapshot.trending_topics.error,
                payload
            ],
        )
        .context("Failed to insert snapshot")?;

        let id = tx.last_insert_rowid();
        tx.commit().context("Failed to commit snapshot")?;

        tracing::debug!(id, "Snapshot saved");
        Ok(id.to_string())
    }

    fn ids(&self) -> Result<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT id FROM trend_snapshots ORDER BY id DESC")
            .context("Failed to prepare id query")?;

        let ids = stmt
            .query_map([], |row| row.get::<_, i64>(0))?
            .collect::<rusqlite::Result<Vec<i64>>>()
            .context("Failed to list snapshots")?;

        Ok(ids.into_iter().map(|id| id.to_string()).collect())
    }

    fn load(&self, id: &str) -> Result<Option<TrendSnapshot>> {
        let Some(id) = Self::parse_id(id) else {
            return Ok(None);
        };

        let conn = self.lock()?;
        let payload: Option<String> = conn
            .query_row(
                "SELECT payload FROM trend_snapshots WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()
            .context("Failed to load snapshot")?;

        match payload {
            Some(payload) => Ok(Some(
                serde_json::from_str(&payload)
                    .with_context(|| format!("Failed to parse snapshot {id}"))?,
            )),
            None => Ok(None),
        }
    }

    fn load_latest(&self) -> Result<Option<TrendSnapshot>> {
        let conn = self.lock()?;
        let row: Option<(i64, String)> = conn
            .query_row(
                "SELECT id, payload FROM trend_snapshots ORDER BY id DESC LIMIT 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .context("Failed to load latest snapshot")?;

        match row {
            Some((id, payload)) => Ok(Some(
                serde_json::from_str(&payload)
                    .with_context(|| format!("Failed to parse snapshot {id}"))?,
            )),
            None => Ok(None),
        }
    }

    fn delete(&self, id: &str) -> Result<bool> {
        let Some(id) = Self::parse_id(id) else {
            return Ok(false);
        };

        let conn = self.lock()?;
        let affected = conn
            .execute("DELETE FROM trend_snapshots WHERE id = ?1", params![id])
            .context("Failed to delete snapshot")?;
        Ok(affected > 0)
    }

    fn list_recent(&self, limit: usize) -> Result<Vec<SnapshotSummary>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, created_at, trend_count, spike_count, error_message
                 FROM trend_snapshots ORDER BY id DESC LIMIT ?1",
            )
            .context("Failed to prepare summary query")?;

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let summaries = stmt
            .query_map(params![limit], |row| {
                Ok(SnapshotSummary {
                    id: row.get::<_, i64>(0)?.to_string(),
                    timestamp: DateTime::parse_from_rfc3339(&row.get::<_, String>(1)?)
                        .map(|dt| dt.with_timezone(&Utc))
                        .unwrap_or_default(),
                    trend_count: row.get::<_, i64>(2)?.max(0) as usize,
                    spike_count: row.get::<_, i64>(3)?.max(0) as usize,
                    error: row.get(4)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to list snapshots")?;

        Ok(summaries)
    }

    fn prune(&self, keep: usize) -> Result<usize> {
        let keep = i64::try_from(keep).unwrap_or(i64::MAX);
        let mut conn = self.lock()?;
        let tx = conn.transaction().context("Failed to begin transaction")?;

        let removed = tx
            .execute(
                "DELETE FROM trend_snapshots WHERE id NOT IN (
                     SELECT id FROM trend_snapshots ORDER BY id DESC LIMIT ?1
                 )",
                params![keep],
            )
            .context("Failed to prune snapshots")?;

        tx.commit().context("Failed to commit prune")?;
        Ok(removed)
    }
}
