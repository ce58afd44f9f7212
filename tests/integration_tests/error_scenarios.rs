//! Error scenario tests
//!
//! Extractor failures degrade a run, storage failures are survivable, and
//! bad options fail fast without touching the store.

use chrono::Duration as ChronoDuration;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use zeitgeist::storage::{MemorySnapshotStore, SnapshotRepository};
use zeitgeist::topics::DisabledExtractor;
use zeitgeist::trends::{DetectOptions, ManagerSettings, ReportStatus, NO_RECENT_DATA};

use super::fixtures::{
    trend_corpus, BrokenStore, CrashingExtractor, Harness, ReportingExtractor,
    VocabularyExtractor, BURST_DOMAIN,
};

fn options() -> DetectOptions {
    DetectOptions::default().with_time_window(ChronoDuration::hours(8))
}

// ============================================================================
// Extractor Failures
// ============================================================================

#[tokio::test]
async fn test_extractor_reported_error_degrades_run() {
    let store = Arc::new(MemorySnapshotStore::new());
    let harness = Harness::new(
        Arc::new(ReportingExtractor("Not enough documents for clustering")),
        store.clone(),
        ManagerSettings::default(),
    );

    let report = harness.manager.detect_trends(&trend_corpus(), &options()).await;

    assert_eq!(report.status, ReportStatus::Degraded);
    assert_eq!(
        report.error.as_deref(),
        Some("Not enough documents for clustering")
    );
    assert!(report.trends.is_empty());

    // Spike detection still ran and was persisted
    let snapshot = store.load_latest().unwrap().unwrap();
    assert!(snapshot.spikes.iter().any(|s| s.group_key == BURST_DOMAIN));
    assert!(!snapshot.velocity_data.topic_velocity.is_empty());
    assert_eq!(snapshot.topics.error, report.error);
}

#[tokio::test]
async fn test_extractor_crash_degrades_run() {
    let store = Arc::new(MemorySnapshotStore::new());
    let harness = Harness::new(
        Arc::new(CrashingExtractor),
        store.clone(),
        ManagerSettings::default(),
    );

    let report = harness.manager.detect_trends(&trend_corpus(), &options()).await;

    assert_eq!(report.status, ReportStatus::Degraded);
    let error = report.error.unwrap();
    assert!(error.contains("exited with status"), "{error}");
    assert!(error.contains("model failed to load"), "{error}");
    assert!(report.topics.is_empty());

    assert_eq!(store.len(), 1);
    assert!(!store.load_latest().unwrap().unwrap().spikes.is_empty());
}

#[tokio::test]
async fn test_disabled_extractor_degrades_run() {
    let harness = Harness::new(
        Arc::new(DisabledExtractor),
        Arc::new(MemorySnapshotStore::new()),
        ManagerSettings::default(),
    );

    let report = harness.manager.detect_trends(&trend_corpus(), &options()).await;

    assert_eq!(report.status, ReportStatus::Degraded);
    assert_eq!(report.error.as_deref(), Some("Topic extraction disabled"));
}

// ============================================================================
// Storage Failures
// ============================================================================

#[tokio::test]
async fn test_storage_failure_does_not_fail_run() {
    let store = Arc::new(BrokenStore::default());
    let harness = Harness::new(
        Arc::new(VocabularyExtractor::default()),
        store.clone(),
        ManagerSettings::default(),
    );

    let report = harness.manager.detect_trends(&trend_corpus(), &options()).await;

    assert_eq!(report.status, ReportStatus::Complete);
    assert_eq!(report.trends[0].group_key, BURST_DOMAIN);
    assert_eq!(store.append_attempts.load(Ordering::SeqCst), 1);

    // The cache still holds the report even though nothing was written
    let recent = harness
        .manager
        .get_recent_trends(Duration::from_secs(3600))
        .await;
    assert_eq!(recent, report);
}

#[tokio::test]
async fn test_storage_read_failure_yields_empty_report() {
    let harness = Harness::new(
        Arc::new(VocabularyExtractor::default()),
        Arc::new(BrokenStore::default()),
        ManagerSettings::default(),
    );

    let recent = harness
        .manager
        .get_recent_trends(Duration::from_secs(3600))
        .await;

    assert_eq!(recent.status, ReportStatus::Empty);
    assert_eq!(recent.error.as_deref(), Some(NO_RECENT_DATA));
}

#[tokio::test]
async fn test_history_surfaces_storage_errors() {
    let harness = Harness::new(
        Arc::new(VocabularyExtractor::default()),
        Arc::new(BrokenStore::default()),
        ManagerSettings::default(),
    );

    let err = harness.manager.history(5).await.unwrap_err();
    assert!(err.to_string().contains("storage offline"), "{err}");
    assert!(harness.manager.prune(1).await.is_err());
}

// ============================================================================
// Invalid Options
// ============================================================================

#[tokio::test]
async fn test_invalid_options_fail_without_side_effects() {
    let extractor = Arc::new(VocabularyExtractor::default());
    let store = Arc::new(MemorySnapshotStore::new());
    let harness = Harness::new(extractor.clone(), store.clone(), ManagerSettings::default());

    let cases = [
        DetectOptions::default().with_threshold(0.0),
        DetectOptions::default().with_threshold(f64::NAN),
        DetectOptions::default().with_time_window(ChronoDuration::zero()),
        DetectOptions::default().with_window_size(ChronoDuration::hours(-1)),
        DetectOptions::default().with_group_by("  "),
        DetectOptions {
            num_topics: 0,
            ..Default::default()
        },
    ];

    for options in cases {
        let report = harness.manager.detect_trends(&trend_corpus(), &options).await;
        assert_eq!(report.status, ReportStatus::Failed, "{options:?}");
        assert!(report.is_failed());
        assert!(report.error.is_some());
        assert!(report.trends.is_empty());
    }

    assert_eq!(extractor.calls(), 0);
    assert!(store.is_empty());

    // A failed run never replaces the cache
    let recent = harness
        .manager
        .get_recent_trends(Duration::from_secs(3600))
        .await;
    assert_eq!(recent.status, ReportStatus::Empty);
}

// ============================================================================
// Malformed Input
// ============================================================================

#[tokio::test]
async fn test_unparsable_timestamps_are_skipped() {
    let harness = Harness::in_memory();
    let mut items = trend_corpus();
    for item in items.iter_mut().take(10) {
        item.timestamp = "not a timestamp".to_string();
    }

    let report = harness.manager.detect_trends(&items, &options()).await;

    assert_eq!(report.status, ReportStatus::Complete);
    let top = &report.trends[0];
    assert_eq!(top.group_key, BURST_DOMAIN);
    assert_eq!(top.count, 15);
}

#[tokio::test]
async fn test_empty_input_completes_with_no_trends() {
    let harness = Harness::in_memory();
    let report = harness.manager.detect_trends(&[], &options()).await;

    assert_eq!(report.status, ReportStatus::Complete);
    assert!(report.trends.is_empty());
    assert!(report.topics.is_empty());
}
