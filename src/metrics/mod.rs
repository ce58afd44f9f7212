//! Prometheus metrics for the trend pipeline
//!
//! This module provides metrics tracking for:
//! - Detection runs: outcome by status, duration
//! - Extraction: failures by reason
//! - Output: spikes detected, trends emitted
//! - Snapshot store and cache: write failures, cache hits/misses
//!
//! # Usage
//!
//! Call `init_metrics()` at application startup to register all metrics.
//! If initialization fails, metrics operations become no-ops.

use prometheus::{
    register_counter, register_counter_vec, register_histogram, Counter, CounterVec, Encoder,
    Histogram, TextEncoder,
};
use std::sync::OnceLock;

// ============================================================================
// Metrics Storage
// ============================================================================

/// Container for all pipeline metrics
struct PipelineMetrics {
    runs: CounterVec,
    run_duration: Histogram,
    extractor_failures: CounterVec,
    spikes_detected: Counter,
    trends_emitted: Counter,
    snapshot_write_failures: Counter,
    snapshots_pruned: Counter,
    cache_lookups: CounterVec,
}

/// Global storage for pipeline metrics
static PIPELINE_METRICS: OnceLock<PipelineMetrics> = OnceLock::new();

/// Flag to track if initialization was attempted
static METRICS_INIT_ATTEMPTED: OnceLock<bool> = OnceLock::new();

// ============================================================================
// Initialization
// ============================================================================

/// Initialize all Prometheus metrics
///
/// Idempotent. If registration fails the error is returned and every
/// recorder in this module stays a no-op.
///
/// # Example
///
/// ```ignore
/// if let Err(e) = zeitgeist::metrics::init_metrics() {
///     eprintln!("Warning: Metrics initialization failed: {}", e);
/// }
/// ```
pub fn init_metrics() -> Result<(), Box<dyn std::error::Error>> {
    // Prevent double initialization
    if METRICS_INIT_ATTEMPTED.get().is_some() {
        return Ok(());
    }
    METRICS_INIT_ATTEMPTED.set(true).ok();

    let pipeline = PipelineMetrics {
        runs: register_counter_vec!(
            "zeitgeist_detection_runs_total",
            "Total trend detection runs by report status",
            &["status"]
        )?,
        run_duration: register_histogram!(
            "zeitgeist_detection_run_duration_seconds",
            "Trend detection run duration in seconds",
            vec![0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0]
        )?,
        extractor_failures: register_counter_vec!(
            "zeitgeist_extractor_failures_total",
            "Topic extraction calls that failed or degraded",
            &["reason"]
        )?,
        spikes_detected: register_counter!(
            "zeitgeist_spikes_detected_total",
            "Total volume spikes detected"
        )?,
        trends_emitted: register_counter!(
            "zeitgeist_trends_emitted_total",
            "Total trend records emitted"
        )?,
        snapshot_write_failures: register_counter!(
            "zeitgeist_snapshot_write_failures_total",
            "Snapshot persistence or retention failures"
        )?,
        snapshots_pruned: register_counter!(
            "zeitgeist_snapshots_pruned_total",
            "Snapshots removed by retention"
        )?,
        cache_lookups: register_counter_vec!(
            "zeitgeist_cache_lookups_total",
            "Recent-trends lookups by result",
            &["result"]
        )?,
    };

    PIPELINE_METRICS
        .set(pipeline)
        .map_err(|_| "Pipeline metrics already initialized")?;

    tracing::info!("Prometheus metrics initialized successfully");
    Ok(())
}

/// Check if metrics have been initialized
pub fn metrics_initialized() -> bool {
    PIPELINE_METRICS.get().is_some()
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, Box<dyn std::error::Error>> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

/// Record a finished detection run
pub fn record_run(status: &str, duration_secs: f64, spikes: usize, trends: usize) {
    let Some(m) = PIPELINE_METRICS.get() else {
        return;
    };

    m.runs.with_label_values(&[status]).inc();
    m.run_duration.observe(duration_secs);

    if spikes > 0 {
        m.spikes_detected.inc_by(spikes as f64);
    }
    if trends > 0 {
        m.trends_emitted.inc_by(trends as f64);
    }
}

/// Record an extraction that did not fully succeed
pub fn record_extractor_failure(reason: &str) {
    if let Some(m) = PIPELINE_METRICS.get() {
        m.extractor_failures.with_label_values(&[reason]).inc();
    }
}

/// Record a snapshot write or prune failure
pub fn record_snapshot_failure() {
    if let Some(m) = PIPELINE_METRICS.get() {
        m.snapshot_write_failures.inc();
    }
}

/// Record snapshots removed by retention
pub fn record_pruned(count: usize) {
    let Some(m) = PIPELINE_METRICS.get() else {
        return;
    };

    if count > 0 {
        m.snapshots_pruned.inc_by(count as f64);
    }
}

/// Record a recent-trends lookup
///
/// `result` is `hit`, `reload` or `miss`.
pub fn record_cache_lookup(result: &str) {
    if let Some(m) = PIPELINE_METRICS.get() {
        m.cache_lookups.with_label_values(&[result]).inc();
    }
}

// ============================================================================
// Tests
// ============================================================================
