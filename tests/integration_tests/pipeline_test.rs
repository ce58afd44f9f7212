//! Pipeline integration tests
//!
//! End-to-end detection over the fixture corpus, ranking, snapshot round
//! trips, retention and the recent-trends cache.

use chrono::Duration as ChronoDuration;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use zeitgeist::storage::{FileSnapshotStore, MemorySnapshotStore, SnapshotRepository, SqliteSnapshotStore};
use zeitgeist::trends::{
    DetectOptions, ManagerSettings, ReportStatus, DEFAULT_CACHE_TTL,
};

use super::fixtures::{
    trend_corpus, GatedExtractor, Harness, VocabularyExtractor, BURST_DOMAIN, DOMAINS,
};

fn eight_hour_options() -> DetectOptions {
    DetectOptions::default()
        .with_time_window(ChronoDuration::hours(8))
        .with_threshold(2.0)
}

// ============================================================================
// End-to-end
// ============================================================================

#[tokio::test]
async fn test_burst_domain_becomes_top_trend() {
    let store = Arc::new(MemorySnapshotStore::new());
    let harness = Harness::new(
        Arc::new(VocabularyExtractor::default()),
        store.clone(),
        ManagerSettings::default(),
    );

    let items = trend_corpus();
    assert_eq!(items.len(), 100);

    let report = harness
        .manager
        .detect_trends(&items, &eight_hour_options())
        .await;

    assert_eq!(report.status, ReportStatus::Complete);
    assert!(report.error.is_none());
    assert_eq!(report.topics.len(), DOMAINS.len());
    assert!(!report.trends.is_empty());

    let top = &report.trends[0];
    assert_eq!(top.group_key, BURST_DOMAIN);
    assert!(top.multiplier >= 2.0, "multiplier {}", top.multiplier);
    assert_eq!(top.count, 25);
    assert_eq!(top.name, "music");

    let burst_words: HashSet<&str> = DOMAINS[0].1.iter().copied().collect();
    assert!(top.keywords.iter().any(|k| burst_words.contains(k.as_str())));
    assert!(top.keywords.len() <= 5);

    // The snapshot carries the spike that produced the trend
    let snapshot = store.load_latest().unwrap().unwrap();
    let spike = snapshot
        .spikes
        .iter()
        .find(|s| s.group_key == BURST_DOMAIN)
        .expect("burst spike persisted");
    assert!(spike.multiplier >= 2.0);
    assert_eq!(spike.count, 25);
    assert_eq!(spike.engagement, 25 * 42);
    assert_eq!(snapshot.trending_topics, report);
}

#[tokio::test]
async fn test_trend_ids_are_deterministic() {
    let first = Harness::in_memory();
    let second = Harness::in_memory();
    let items = trend_corpus();

    let a = first.manager.detect_trends(&items, &eight_hour_options()).await;
    second.clock.advance(ChronoDuration::minutes(5));
    let b = second.manager.detect_trends(&items, &eight_hour_options()).await;

    let ids_a: Vec<&str> = a.trends.iter().map(|t| t.id.as_str()).collect();
    let ids_b: Vec<&str> = b.trends.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids_a, ids_b);
    assert_ne!(a.trends[0].created_at, b.trends[0].created_at);
}

#[tokio::test]
async fn test_trends_are_ranked_by_score() {
    let harness = Harness::in_memory();
    let report = harness
        .manager
        .detect_trends(&trend_corpus(), &eight_hour_options().with_threshold(1.2))
        .await;

    assert!(report.trends.len() > 1);
    for pair in report.trends.windows(2) {
        assert!(pair[0].score() >= pair[1].score());
    }
}

#[tokio::test]
async fn test_group_by_attribute() {
    let harness = Harness::in_memory();
    let items: Vec<_> = trend_corpus()
        .into_iter()
        .map(|mut item| {
            let domain = item.group_key.take().unwrap_or_default();
            item.with_attribute("domainId", domain)
        })
        .collect();

    // Default grouping finds nothing once groupKey is gone
    let report = harness
        .manager
        .detect_trends(&items, &eight_hour_options())
        .await;
    assert!(report.trends.is_empty());

    let report = harness
        .manager
        .detect_trends(&items, &eight_hour_options().with_group_by("domainId"))
        .await;
    assert_eq!(report.trends[0].group_key, BURST_DOMAIN);
}

// ============================================================================
// Persistence
// ============================================================================

#[tokio::test]
async fn test_snapshot_round_trip_through_file_store() {
    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(FileSnapshotStore::new(temp_dir.path()).unwrap());
    let harness = Harness::new(
        Arc::new(VocabularyExtractor::default()),
        store.clone(),
        ManagerSettings::default(),
    );

    let report = harness
        .manager
        .detect_trends(&trend_corpus(), &eight_hour_options())
        .await;

    let persisted = store.load_latest().unwrap().unwrap();
    assert_eq!(persisted.trending_topics, report);

    // A fresh manager over the same directory serves the same report
    let restarted = Harness::new(
        Arc::new(VocabularyExtractor::default()),
        Arc::new(FileSnapshotStore::new(temp_dir.path()).unwrap()),
        ManagerSettings::default(),
    );
    let recent = restarted.manager.get_recent_trends(DEFAULT_CACHE_TTL).await;
    assert_eq!(recent, report);
}

#[tokio::test]
async fn test_snapshot_round_trip_through_sqlite_store() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("trends.db");
    let harness = Harness::new(
        Arc::new(VocabularyExtractor::default()),
        Arc::new(SqliteSnapshotStore::new(&path).unwrap()),
        ManagerSettings::default(),
    );

    let report = harness
        .manager
        .detect_trends(&trend_corpus(), &eight_hour_options())
        .await;

    let store = SqliteSnapshotStore::new(&path).unwrap();
    assert_eq!(store.load_latest().unwrap().unwrap().trending_topics, report);
}

#[tokio::test]
async fn test_retention_keeps_newest_twenty() {
    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(FileSnapshotStore::new(temp_dir.path()).unwrap());
    let harness = Harness::new(
        Arc::new(VocabularyExtractor::default()),
        store.clone(),
        ManagerSettings::default(),
    );

    let items = trend_corpus();
    let mut timestamps = Vec::new();
    for _ in 0..25 {
        harness.clock.advance(ChronoDuration::minutes(1));
        let report = harness.manager.detect_trends(&items, &eight_hour_options()).await;
        timestamps.push(report.timestamp.unwrap());
    }

    let history = harness.manager.history(100).await.unwrap();
    assert_eq!(history.len(), 20);

    let kept: Vec<_> = history.iter().map(|s| s.timestamp).collect();
    let expected: Vec<_> = timestamps.iter().rev().take(20).copied().collect();
    assert_eq!(kept, expected);
}

#[tokio::test]
async fn test_custom_retention_and_explicit_prune() {
    let settings = ManagerSettings {
        retention: 3,
        ..Default::default()
    };
    let store = Arc::new(MemorySnapshotStore::new());
    let harness = Harness::new(
        Arc::new(VocabularyExtractor::default()),
        store.clone(),
        settings,
    );

    for _ in 0..5 {
        harness.clock.advance(ChronoDuration::minutes(1));
        harness.manager.detect_trends(&[], &DetectOptions::default()).await;
    }
    assert_eq!(store.len(), 3);

    assert_eq!(harness.manager.prune(1).await.unwrap(), 2);
    assert_eq!(harness.manager.history(10).await.unwrap().len(), 1);
}

// ============================================================================
// Cache
// ============================================================================

#[tokio::test]
async fn test_recent_trends_served_from_cache() {
    let extractor = Arc::new(VocabularyExtractor::default());
    let harness = Harness::new(
        extractor.clone(),
        Arc::new(MemorySnapshotStore::new()),
        ManagerSettings::default(),
    );

    let report = harness
        .manager
        .detect_trends(&trend_corpus(), &eight_hour_options())
        .await;

    harness.clock.advance(ChronoDuration::minutes(30));
    let recent = harness.manager.get_recent_trends(Duration::from_secs(3600)).await;

    assert_eq!(recent, report);
    assert_eq!(extractor.calls(), 1);
}

#[tokio::test]
async fn test_stale_cache_reloads_latest_snapshot() {
    let harness = Harness::in_memory();
    let report = harness
        .manager
        .detect_trends(&trend_corpus(), &eight_hour_options())
        .await;

    harness.clock.advance(ChronoDuration::hours(2));
    let recent = harness.manager.get_recent_trends(Duration::from_secs(3600)).await;

    // Reloaded from the store, which holds the same report
    assert_eq!(recent, report);
    assert_eq!(recent.timestamp, report.timestamp);
}

#[tokio::test]
async fn test_no_data_yields_empty_report() {
    let harness = Harness::in_memory();
    let recent = harness.manager.get_recent_trends(DEFAULT_CACHE_TTL).await;

    assert_eq!(recent.status, ReportStatus::Empty);
    assert!(recent.trends.is_empty());
    assert!(recent.topics.is_empty());
    assert_eq!(recent.error.as_deref(), Some(zeitgeist::trends::NO_RECENT_DATA));
}

#[tokio::test]
async fn test_concurrent_runs_share_manager() {
    let harness = Arc::new(Harness::in_memory());
    let items = Arc::new(trend_corpus());

    let mut handles = Vec::new();
    for _ in 0..4 {
        let harness = harness.clone();
        let items = items.clone();
        handles.push(tokio::spawn(async move {
            harness
                .manager
                .detect_trends(&items, &DetectOptions::default())
                .await
        }));
    }

    for handle in handles {
        let report = handle.await.unwrap();
        assert_eq!(report.status, ReportStatus::Complete);
    }

    assert_eq!(harness.manager.history(10).await.unwrap().len(), 4);
}

#[tokio::test]
async fn test_overlapping_runs_stamped_in_completion_order() {
    let extractor = Arc::new(GatedExtractor::default());
    let store = Arc::new(MemorySnapshotStore::new());
    let harness = Arc::new(Harness::new(
        extractor.clone(),
        store.clone(),
        ManagerSettings::default(),
    ));

    // First run starts and stalls inside extraction
    let slow = {
        let harness = harness.clone();
        tokio::spawn(async move {
            harness
                .manager
                .detect_trends(&trend_corpus(), &DetectOptions::default())
                .await
        })
    };
    extractor.entered.notified().await;

    // Second run starts later and finishes first
    harness.clock.advance(ChronoDuration::minutes(1));
    let fast = harness
        .manager
        .detect_trends(&trend_corpus(), &DetectOptions::default())
        .await;
    assert_eq!(fast.topics, vec![1]);

    harness.clock.advance(ChronoDuration::minutes(1));
    extractor.release.notify_one();
    let slow = slow.await.unwrap();
    assert_eq!(slow.topics, vec![0]);

    // The run that finished last is the newest everywhere
    assert!(slow.timestamp > fast.timestamp);
    let recent = harness.manager.get_recent_trends(Duration::from_secs(3600)).await;
    assert_eq!(recent, slow);
    assert_eq!(store.load_latest().unwrap().unwrap().trending_topics, slow);

    let history = harness.manager.history(10).await.unwrap();
    assert_eq!(history[0].timestamp, slow.timestamp.unwrap());
    assert_eq!(history[1].timestamp, fast.timestamp.unwrap());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_file_store_on_multi_thread_runtime() {
    let temp_dir = TempDir::new().unwrap();
    let harness = Arc::new(Harness::new(
        Arc::new(VocabularyExtractor::default()),
        Arc::new(FileSnapshotStore::new(temp_dir.path()).unwrap()),
        ManagerSettings {
            retention: 2,
            ..Default::default()
        },
    ));

    let mut handles = Vec::new();
    for _ in 0..4 {
        let harness = harness.clone();
        handles.push(tokio::spawn(async move {
            harness
                .manager
                .detect_trends(&trend_corpus(), &DetectOptions::default())
                .await
        }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap().status, ReportStatus::Complete);
    }

    assert_eq!(harness.manager.history(10).await.unwrap().len(), 2);
    harness.manager.invalidate_cache().await;
    let recent = harness.manager.get_recent_trends(DEFAULT_CACHE_TTL).await;
    assert_eq!(recent.status, ReportStatus::Complete);
    assert_eq!(harness.manager.prune(1).await.unwrap(), 1);
}
