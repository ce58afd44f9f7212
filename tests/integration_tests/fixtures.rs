//! Test fixtures for pipeline integration tests
//!
//! A six-domain corpus with a deterministic burst in one domain, a fake topic
//! extractor that clusters by domain vocabulary, and stores that fail on
//! demand.

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

use zeitgeist::engagement::FixedEngagement;
use zeitgeist::models::ContentItem;
use zeitgeist::storage::{MemorySnapshotStore, SnapshotRepository};
use zeitgeist::topics::{
    ExtractorError, TopicDetail, TopicExtractor, TopicRequest, TopicResponse, TopicWord,
};
use zeitgeist::trends::{
    ManagerSettings, ManualClock, TrendContext, TrendManager, TrendSnapshot,
};

/// Domain whose volume bursts in the corpus
pub const BURST_DOMAIN: &str = "music";

/// Domains and the words their content is written with
pub const DOMAINS: &[(&str, &[&str])] = &[
    ("music", &["jazz", "saxophone", "concert", "album", "bebop"]),
    ("sports", &["football", "goal", "league", "stadium", "coach"]),
    ("politics", &["election", "senate", "ballot", "policy", "campaign"]),
    ("science", &["quantum", "telescope", "genome", "particle", "neuron"]),
    ("finance", &["bond", "equity", "inflation", "dividend", "yield"]),
    ("travel", &["airline", "passport", "itinerary", "resort", "luggage"]),
];

/// Fixed clock reading for every pipeline test
pub fn test_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 10, 14, 0, 0).unwrap()
}

fn vocabulary(domain: &str) -> &'static [&'static str] {
    DOMAINS
        .iter()
        .find(|(d, _)| *d == domain)
        .map(|(_, words)| *words)
        .unwrap_or(&[])
}

fn text_for(domain: &str, i: usize) -> String {
    let words = vocabulary(domain);
    format!(
        "{} {} and {} news",
        words[i % words.len()],
        words[(i + 1) % words.len()],
        words[(i + 2) % words.len()]
    )
}

/// 100 items: a 25-item burst in [`BURST_DOMAIN`] during the last six hours,
/// plus 75 baseline items over six domains spread across the preceding
/// three days
pub fn trend_corpus() -> Vec<ContentItem> {
    let now = test_now();
    let mut items = Vec::with_capacity(100);

    for i in 0..25 {
        items.push(ContentItem::new(
            format!("burst-{i}"),
            text_for(BURST_DOMAIN, i),
            now - Duration::minutes(10 + i as i64 * 13),
            BURST_DOMAIN,
        ));
    }

    for i in 0..75 {
        let (domain, _) = DOMAINS[i % DOMAINS.len()];
        let hours_ago = 7 + (i as i64 * 64) / 74;
        let minutes_ago = (i as i64 * 7) % 60;
        items.push(ContentItem::new(
            format!("base-{i}"),
            text_for(domain, i),
            now - Duration::hours(hours_ago) - Duration::minutes(minutes_ago),
            domain,
        ));
    }

    items
}

/// Clusters documents by which domain vocabulary they use
///
/// Topic ids follow [`DOMAINS`] order. Counts calls so tests can check
/// whether extraction ran.
#[derive(Default)]
pub struct VocabularyExtractor {
    pub calls: AtomicUsize,
}

impl VocabularyExtractor {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TopicExtractor for VocabularyExtractor {
    fn name(&self) -> &str {
        "vocabulary"
    }

    async fn extract(&self, request: &TopicRequest) -> Result<TopicResponse, ExtractorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let mut response = TopicResponse::default();
        let mut counts: BTreeMap<i64, usize> = BTreeMap::new();

        for doc in &request.items {
            let topic = DOMAINS
                .iter()
                .position(|(_, words)| words.iter().any(|w| doc.text.contains(w)))
                .map(|p| p as i64)
                .unwrap_or(-1);
            response.doc_id_to_topic.insert(doc.id.clone(), topic);
            if topic >= 0 {
                *counts.entry(topic).or_default() += 1;
            }
        }

        for (topic, count) in counts {
            let (domain, words) = DOMAINS[topic as usize];
            response.topics.push(topic);
            response.topic_details.insert(
                topic.to_string(),
                TopicDetail {
                    topic_id: String::new(),
                    // "content" is a name stopword and gets stripped
                    name: format!("{domain} content"),
                    words: words
                        .iter()
                        .enumerate()
                        .map(|(rank, w)| TopicWord {
                            word: w.to_string(),
                            weight: 1.0 / (rank as f64 + 1.0),
                        })
                        .collect(),
                    document_count: count,
                },
            );
        }

        Ok(response)
    }
}

/// Extractor that reports a problem alongside no data
pub struct ReportingExtractor(pub &'static str);

#[async_trait]
impl TopicExtractor for ReportingExtractor {
    fn name(&self) -> &str {
        "reporting"
    }

    async fn extract(&self, _request: &TopicRequest) -> Result<TopicResponse, ExtractorError> {
        Ok(TopicResponse {
            error: Some(self.0.to_string()),
            ..Default::default()
        })
    }
}

/// Extractor whose process exits non-zero
pub struct CrashingExtractor;

#[async_trait]
impl TopicExtractor for CrashingExtractor {
    fn name(&self) -> &str {
        "crashing"
    }

    async fn extract(&self, _request: &TopicRequest) -> Result<TopicResponse, ExtractorError> {
        Err(ExtractorError::ExitStatus {
            code: Some(1),
            stderr: "Traceback: model failed to load".to_string(),
        })
    }
}

/// Extractor whose first call blocks until released
///
/// Each call answers with its own call index as the only topic.
#[derive(Default)]
pub struct GatedExtractor {
    calls: AtomicUsize,
    pub entered: Notify,
    pub release: Notify,
}

#[async_trait]
impl TopicExtractor for GatedExtractor {
    fn name(&self) -> &str {
        "gated"
    }

    async fn extract(&self, _request: &TopicRequest) -> Result<TopicResponse, ExtractorError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call == 0 {
            self.entered.notify_one();
            self.release.notified().await;
        }
        Ok(TopicResponse {
            topics: vec![call as i64],
            ..Default::default()
        })
    }
}

/// Store whose writes always fail; reads see nothing
#[derive(Default)]
pub struct BrokenStore {
    pub append_attempts: AtomicUsize,
}

impl SnapshotRepository for BrokenStore {
    fn backend(&self) -> &str {
        "broken"
    }

    fn append(&self, _snapshot: &TrendSnapshot) -> anyhow::Result<String> {
        self.append_attempts.fetch_add(1, Ordering::SeqCst);
        anyhow::bail!("disk full")
    }

    fn ids(&self) -> anyhow::Result<Vec<String>> {
        anyhow::bail!("storage offline")
    }

    fn load(&self, _id: &str) -> anyhow::Result<Option<TrendSnapshot>> {
        anyhow::bail!("storage offline")
    }

    fn delete(&self, _id: &str) -> anyhow::Result<bool> {
        anyhow::bail!("storage offline")
    }
}

/// Manager wired to test doubles with a manual clock
pub struct Harness {
    pub manager: TrendManager,
    pub clock: Arc<ManualClock>,
}

impl Harness {
    pub fn new(
        extractor: Arc<dyn TopicExtractor>,
        store: Arc<dyn SnapshotRepository>,
        settings: ManagerSettings,
    ) -> Self {
        let clock = Arc::new(ManualClock::new(test_now()));
        let ctx = TrendContext::new(extractor, store)
            .with_engagement(Arc::new(FixedEngagement(42)))
            .with_clock(clock.clone());
        Self {
            manager: TrendManager::with_settings(ctx, settings),
            clock,
        }
    }

    /// Vocabulary extractor over an in-memory store
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(VocabularyExtractor::default()),
            Arc::new(MemorySnapshotStore::new()),
            ManagerSettings::default(),
        )
    }
}
