//! Trend records, reports and persisted snapshots

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::analytics::{Spike, VelocityReport};
use crate::topics::{TopicDetail, TopicResults};

/// Message returned when neither cache nor store has data
pub const NO_RECENT_DATA: &str = "No recent trend data available";

/// A topic that is both coherent and spiking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendRecord {
    /// `trend-{topicId}-{groupKey}-{spikeMillis}`
    pub id: String,
    pub topic_id: i64,
    pub name: String,

    /// Top five topic words
    pub keywords: Vec<String>,

    pub multiplier: f64,
    pub count: usize,

    /// Average velocity of the topic, 0 when unknown
    pub velocity: f64,

    /// Group the originating spike came from
    pub group_key: String,

    /// Bucket start of the originating spike
    pub spike_timestamp: DateTime<Utc>,

    /// Run that produced the record
    pub created_at: DateTime<Utc>,
}

impl TrendRecord {
    /// Deterministic id for a (topic, spike) pair
    pub fn make_id(topic_id: i64, group_key: &str, spike_timestamp: DateTime<Utc>) -> String {
        format!(
            "trend-{topic_id}-{group_key}-{}",
            spike_timestamp.timestamp_millis()
        )
    }

    /// Ranking score: spike strength boosted by growth
    pub fn score(&self) -> f64 {
        self.multiplier * (1.0 + self.velocity / 10.0)
    }
}

/// Outcome class of a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    /// Every stage succeeded
    #[default]
    Complete,
    /// Topic extraction failed or flagged a problem; spikes and velocity still ran
    Degraded,
    /// The run was aborted; no data
    Failed,
    /// No run and no stored snapshot to answer from
    Empty,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Complete => "complete",
            Self::Degraded => "degraded",
            Self::Failed => "failed",
            Self::Empty => "empty",
        }
    }
}

impl std::fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What callers of the manager receive
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendReport {
    pub status: ReportStatus,

    #[serde(default)]
    pub topics: Vec<i64>,

    #[serde(default)]
    pub topic_details: BTreeMap<String, TopicDetail>,

    /// Ranked, highest score first
    #[serde(default)]
    pub trends: Vec<TrendRecord>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TrendReport {
    /// Report for a finished run; degraded when topic data carries an error
    pub fn from_run(topics: &TopicResults, trends: Vec<TrendRecord>, at: DateTime<Utc>) -> Self {
        let status = if topics.error.is_some() {
            ReportStatus::Degraded
        } else {
            ReportStatus::Complete
        };

        Self {
            status,
            topics: topics.topics.clone(),
            topic_details: topics.topic_details.clone(),
            trends,
            timestamp: Some(at),
            error: topics.error.clone(),
        }
    }

    /// Aborted run
    pub fn failed(error: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            status: ReportStatus::Failed,
            timestamp: Some(at),
            error: Some(error.into()),
            ..Default::default()
        }
    }

    /// Nothing to report
    pub fn empty(error: impl Into<String>) -> Self {
        Self {
            status: ReportStatus::Empty,
            error: Some(error.into()),
            ..Default::default()
        }
    }

    pub fn is_failed(&self) -> bool {
        self.status == ReportStatus::Failed
    }
}

/// One persisted detection run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendSnapshot {
    pub timestamp: DateTime<Utc>,
    pub topics: TopicResults,
    pub spikes: Vec<Spike>,
    pub velocity_data: VelocityReport,
    pub trending_topics: TrendReport,
}

impl TrendSnapshot {
    /// Number of ranked trends in the snapshot
    pub fn trend_count(&self) -> usize {
        self.trending_topics.trends.len()
    }
}
