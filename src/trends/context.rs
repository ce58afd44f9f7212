//! Collaborators a trend manager runs against

use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};

use crate::config::Config;
use crate::engagement::{EngagementSource, RandomEngagement};
use crate::storage::{self, SnapshotRepository};
use crate::topics::{self, TopicExtractor};

/// Source of "now"
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(at) }
    }

    pub fn set(&self, at: DateTime<Utc>) {
        match self.now.lock() {
            Ok(mut now) => *now = at,
            Err(poisoned) => *poisoned.into_inner() = at,
        }
    }

    pub fn advance(&self, by: chrono::Duration) {
        let at = self.now() + by;
        self.set(at);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        match self.now.lock() {
            Ok(now) => *now,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

/// Everything outside the pipeline itself
#[derive(Clone)]
pub struct TrendContext {
    pub extractor: Arc<dyn TopicExtractor>,
    pub store: Arc<dyn SnapshotRepository>,
    pub engagement: Arc<dyn EngagementSource>,
    pub clock: Arc<dyn Clock>,
}

impl TrendContext {
    /// Context with random engagement and the system clock
    pub fn new(extractor: Arc<dyn TopicExtractor>, store: Arc<dyn SnapshotRepository>) -> Self {
        Self {
            extractor,
            store,
            engagement: Arc::new(RandomEngagement),
            clock: Arc::new(SystemClock),
        }
    }

    /// Build extractor and store from configuration
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let extractor = topics::from_config(&config.extractor)?;
        let store = storage::open(&config.storage)?;
        Ok(Self::new(extractor, store))
    }

    pub fn with_engagement(mut self, engagement: Arc<dyn EngagementSource>) -> Self {
        self.engagement = engagement;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

impl std::fmt::Debug for TrendContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrendContext")
            .field("extractor", &self.extractor.name())
            .field("store", &self.store.backend())
            .finish_non_exhaustive()
    }
}
