//! Trend detection pipeline
//!
//! [`TrendManager`] runs one detection pass over a batch of content:
//!
//! ```text
//! items ──► extractor (timeout) ──► topic assignments ─┐
//!   │                                                  │
//!   ├──► engagement ──► spike detection ──► spikes ────┼──► fuse ──► rank
//!   │                                                  │
//!   └──► velocity analysis ──► per-group growth ───────┘
//!                                                            │
//!                                          persist snapshot ◄┴► update cache
//! ```
//!
//! Extraction failures degrade the report instead of aborting it, storage
//! failures are logged and counted, and invalid options produce a `Failed`
//! report. `detect_trends` and `get_recent_trends` never return `Err`.

pub mod cache;
pub mod context;
pub mod fusion;
pub mod options;
pub mod types;

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, instrument, warn};

use crate::analytics::{analyze_velocity, detect_spikes};
use crate::config::Config;
use crate::engagement;
use crate::error::{ExtractorError, Result};
use crate::metrics;
use crate::models::ContentItem;
use crate::storage::{SnapshotRepository, SnapshotSummary};
use crate::topics::{default_name_stopwords, Extraction, TopicRequest};

pub use cache::TrendCache;
pub use context::{Clock, ManualClock, SystemClock, TrendContext};
pub use options::DetectOptions;
pub use types::{ReportStatus, TrendRecord, TrendReport, TrendSnapshot, NO_RECENT_DATA};

/// Snapshots kept after each run by default
pub const DEFAULT_RETENTION: usize = 20;

/// Default extractor timeout
pub const DEFAULT_EXTRACTOR_TIMEOUT: Duration = Duration::from_secs(120);

/// Default freshness window for `get_recent_trends`
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60 * 60);

/// Manager tuning that is not per-run
#[derive(Debug, Clone, PartialEq)]
pub struct ManagerSettings {
    /// Snapshots kept after each run
    pub retention: usize,

    /// Upper bound on one extractor call
    pub extractor_timeout: Duration,

    /// Words stripped from topic names
    pub name_stopwords: Vec<String>,
}

impl Default for ManagerSettings {
    fn default() -> Self {
        Self {
            retention: DEFAULT_RETENTION,
            extractor_timeout: DEFAULT_EXTRACTOR_TIMEOUT,
            name_stopwords: default_name_stopwords(),
        }
    }
}

impl ManagerSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            retention: config.storage.retention,
            extractor_timeout: config.extractor.timeout(),
            name_stopwords: config.extractor.name_stopwords.clone(),
        }
    }
}

/// Orchestrates extraction, detection, fusion, persistence and caching
///
/// Shareable across tasks via `Arc`.
pub struct TrendManager {
    ctx: TrendContext,
    settings: ManagerSettings,
    cache: RwLock<TrendCache>,

    /// Serializes persist + prune + cache update and the reload path
    write_lock: Mutex<()>,
}

impl TrendManager {
    pub fn new(ctx: TrendContext) -> Self {
        Self::with_settings(ctx, ManagerSettings::default())
    }

    pub fn with_settings(ctx: TrendContext, settings: ManagerSettings) -> Self {
        Self {
            ctx,
            settings,
            cache: RwLock::new(TrendCache::new()),
            write_lock: Mutex::new(()),
        }
    }

    /// Build collaborators and settings from configuration
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let ctx = TrendContext::from_config(config)?;
        Ok(Self::with_settings(ctx, ManagerSettings::from_config(config)))
    }

    pub fn settings(&self) -> &ManagerSettings {
        &self.settings
    }

    pub fn context(&self) -> &TrendContext {
        &self.ctx
    }

    /// Run one detection pass
    ///
    /// Always returns a report; failures are carried in its status and
    /// `error` field.
    #[instrument(skip_all, fields(items = items.len()))]
    pub async fn detect_trends(&self, items: &[ContentItem], options: &DetectOptions) -> TrendReport {
        let started = Instant::now();
        info!("Starting trend detection");

        let report = match self.run_pipeline(items, options).await {
            Ok((report, spikes)) => {
                metrics::record_run(
                    report.status.as_str(),
                    started.elapsed().as_secs_f64(),
                    spikes,
                    report.trends.len(),
                );
                report
            }
            Err(e) => {
                warn!(error = %e, "Trend detection failed");
                metrics::record_run(
                    ReportStatus::Failed.as_str(),
                    started.elapsed().as_secs_f64(),
                    0,
                    0,
                );
                TrendReport::failed(e.to_string(), self.ctx.clock.now())
            }
        };

        info!(
            status = %report.status,
            trends = report.trends.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Trend detection finished"
        );
        report
    }

    async fn run_pipeline(
        &self,
        items: &[ContentItem],
        options: &DetectOptions,
    ) -> Result<(TrendReport, usize)> {
        options.validate()?;

        let extraction = self.extract(items, options).await;
        if let Some(reason) = extraction.error() {
            warn!(reason, "Topic extraction degraded; continuing without full topic data");
        }
        let topics = extraction.into_results();

        let annotated = engagement::annotate(items, self.ctx.engagement.as_ref());

        let spikes = detect_spikes(&annotated, &options.spike_config());
        debug!(spikes = spikes.len(), "Spike detection complete");

        let velocity = analyze_velocity(&annotated, &options.velocity_config());
        debug!(
            groups = velocity.topic_velocity.len(),
            "Velocity analysis complete"
        );

        // Runs are stamped in completion order, under the writer lock
        let _guard = self.write_lock.lock().await;
        let now = self.ctx.clock.now();

        let mut trends = fusion::fuse(&spikes, &topics, &velocity, now);
        fusion::rank(&mut trends);
        debug!(trends = trends.len(), "Fusion complete");

        let report = TrendReport::from_run(&topics, trends, now);
        let spike_count = spikes.len();
        let snapshot = TrendSnapshot {
            timestamp: now,
            topics,
            spikes,
            velocity_data: velocity,
            trending_topics: report.clone(),
        };

        self.persist(snapshot).await;
        if !self.cache.write().await.store_if_newer(now, report.clone()) {
            warn!(timestamp = %now, "Cache holds a newer report; keeping it");
        }

        Ok((report, spike_count))
    }

    /// Call the extractor under the timeout and validate its answer
    async fn extract(&self, items: &[ContentItem], options: &DetectOptions) -> Extraction {
        let request = TopicRequest::from_items(items, options.num_topics, options.min_cluster_size);
        let timeout = self.settings.extractor_timeout;

        let outcome = match tokio::time::timeout(timeout, self.ctx.extractor.extract(&request)).await
        {
            Ok(result) => result,
            Err(_) => Err(ExtractorError::Timeout(timeout)),
        };

        let extraction = match outcome {
            Ok(response) => Extraction::from_response(response, &self.settings.name_stopwords),
            Err(e) => {
                metrics::record_extractor_failure(failure_reason(&e));
                Extraction::from_error(&e)
            }
        };

        if let Extraction::Degraded { .. } = extraction {
            metrics::record_extractor_failure("reported");
        }

        debug!(
            extractor = self.ctx.extractor.name(),
            success = extraction.is_success(),
            "Topic extraction complete"
        );
        extraction
    }

    /// Write the snapshot and apply retention; failures are logged only
    async fn persist(&self, snapshot: TrendSnapshot) {
        let retention = self.settings.retention;
        let outcome = self
            .with_store(move |store| {
                let id = store.append(&snapshot)?;
                Ok((id, store.prune(retention)))
            })
            .await;

        let pruned = match outcome {
            Ok((id, pruned)) => {
                debug!(id = %id, backend = self.ctx.store.backend(), "Snapshot persisted");
                pruned
            }
            Err(e) => {
                warn!(error = %format!("{e:#}"), "Failed to persist trend snapshot");
                metrics::record_snapshot_failure();
                return;
            }
        };

        match pruned {
            Ok(removed) => metrics::record_pruned(removed),
            Err(e) => {
                warn!(error = %format!("{e:#}"), "Failed to prune old trend snapshots");
                metrics::record_snapshot_failure();
            }
        }
    }

    /// Run blocking store work off the async runtime
    async fn with_store<T, F>(&self, f: F) -> anyhow::Result<T>
    where
        F: FnOnce(&dyn SnapshotRepository) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.ctx.store);
        tokio::task::spawn_blocking(move || f(store.as_ref()))
            .await
            .context("Snapshot store task failed")?
    }

    /// Latest report, from cache while fresh, else from the newest snapshot
    #[instrument(skip(self))]
    pub async fn get_recent_trends(&self, ttl: Duration) -> TrendReport {
        let now = self.ctx.clock.now();

        if let Some(report) = self.cache.read().await.fresh(now, ttl) {
            metrics::record_cache_lookup("hit");
            return report.clone();
        }

        let _guard = self.write_lock.lock().await;

        // Another task may have refreshed the cache while we waited
        if let Some(report) = self.cache.read().await.fresh(now, ttl) {
            metrics::record_cache_lookup("hit");
            return report.clone();
        }

        match self.with_store(|store| store.load_latest()).await {
            Ok(Some(snapshot)) => {
                metrics::record_cache_lookup("reload");
                info!(timestamp = %snapshot.timestamp, "Reloaded trends from latest snapshot");
                let report = snapshot.trending_topics;
                self.cache
                    .write()
                    .await
                    .store(snapshot.timestamp, report.clone());
                report
            }
            Ok(None) => {
                metrics::record_cache_lookup("miss");
                TrendReport::empty(NO_RECENT_DATA)
            }
            Err(e) => {
                metrics::record_cache_lookup("miss");
                warn!(error = %format!("{e:#}"), "Error loading recent trends");
                TrendReport::empty(NO_RECENT_DATA)
            }
        }
    }

    /// Summaries of the `limit` newest snapshots
    pub async fn history(&self, limit: usize) -> Result<Vec<SnapshotSummary>> {
        Ok(self.with_store(move |store| store.list_recent(limit)).await?)
    }

    /// Keep only the `keep` newest snapshots
    pub async fn prune(&self, keep: usize) -> Result<usize> {
        let _guard = self.write_lock.lock().await;
        let removed = self.with_store(move |store| store.prune(keep)).await?;
        metrics::record_pruned(removed);
        info!(removed, keep, "Pruned trend snapshots");
        Ok(removed)
    }

    /// Forget the cached report
    pub async fn invalidate_cache(&self) {
        let _guard = self.write_lock.lock().await;
        self.cache.write().await.clear();
        debug!("Trend cache invalidated");
    }
}

fn failure_reason(err: &ExtractorError) -> &'static str {
    match err {
        ExtractorError::Timeout(_) => "timeout",
        ExtractorError::Spawn(_) | ExtractorError::Io(_) => "io",
        ExtractorError::ExitStatus { .. } => "exit_status",
        ExtractorError::EmptyOutput | ExtractorError::Malformed(_) => "malformed",
        ExtractorError::Http(_) | ExtractorError::HttpStatus { .. } => "http",
        ExtractorError::Disabled => "disabled",
    }
}
