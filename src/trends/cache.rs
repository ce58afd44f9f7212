//! Time-boxed cache of the last report

use chrono::{DateTime, Utc};
use std::time::Duration;

use super::types::TrendReport;

/// Last report and when it was produced
#[derive(Debug, Clone, Default)]
pub struct TrendCache {
    last_processed: Option<DateTime<Utc>>,
    results: Option<TrendReport>,
}

impl TrendCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the cached report
    pub fn store(&mut self, at: DateTime<Utc>, report: TrendReport) {
        self.last_processed = Some(at);
        self.results = Some(report);
    }

    /// Replace the cached report unless the cache already holds a newer one
    pub fn store_if_newer(&mut self, at: DateTime<Utc>, report: TrendReport) -> bool {
        if self.last_processed.is_some_and(|last| last > at) {
            return false;
        }
        self.store(at, report);
        true
    }

    /// Cached report if `now - last_processed < ttl`
    pub fn fresh(&self, now: DateTime<Utc>, ttl: Duration) -> Option<&TrendReport> {
        let last = self.last_processed?;
        let results = self.results.as_ref()?;

        // A TTL too large for chrono never expires
        let fresh = match chrono::Duration::from_std(ttl) {
            Ok(ttl) => now.signed_duration_since(last) < ttl,
            Err(_) => true,
        };

        fresh.then_some(results)
    }

    pub fn last_processed(&self) -> Option<DateTime<Utc>> {
        self.last_processed
    }

    pub fn clear(&mut self) {
        self.last_processed = None;
        self.results = None;
    }
}
