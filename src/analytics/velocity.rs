//! Content velocity: how quickly each group's volume is growing
//!
//! Volume is bucketed into fixed windows per group; velocity is the relative
//! change between consecutive non-empty buckets, averaged per group.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::anomaly::{bucketize, group_items};
use crate::models::{ContentItem, DEFAULT_GROUP_FIELD};

/// Number of entries kept in each summary list
pub const SUMMARY_LIMIT: usize = 5;

/// Groups spanning less than this many hours are skipped
const MIN_SPAN_HOURS: i64 = 1;

/// Velocity analysis settings
#[derive(Debug, Clone, PartialEq)]
pub struct VelocityConfig {
    /// Bucket width (default: 8 hours)
    pub window: Duration,

    /// Field used to partition items (default: `groupKey`)
    pub group_by: String,
}

impl Default for VelocityConfig {
    fn default() -> Self {
        Self {
            window: Duration::hours(8),
            group_by: DEFAULT_GROUP_FIELD.to_string(),
        }
    }
}

/// Change in volume between two consecutive buckets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VelocityPoint {
    pub group_key: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub start_count: usize,
    pub end_count: usize,

    /// `(end_count - start_count) / start_count`, or 0 when `start_count` is 0
    pub velocity: f64,
}

impl VelocityPoint {
    fn between(
        group_key: &str,
        start: (DateTime<Utc>, usize),
        end: (DateTime<Utc>, usize),
    ) -> Self {
        let velocity = if start.1 > 0 {
            (end.1 as f64 - start.1 as f64) / start.1 as f64
        } else {
            0.0
        };

        Self {
            group_key: group_key.to_string(),
            start_time: start.0,
            end_time: end.0,
            start_count: start.1,
            end_count: end.1,
            velocity,
        }
    }
}

/// Group and its average velocity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupVelocity {
    pub key: String,
    pub velocity: f64,
}

/// Top gainers and losers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VelocitySummary {
    /// Positive velocities, highest first
    pub fastest_growing: Vec<GroupVelocity>,

    /// Negative velocities, most negative first
    pub declining: Vec<GroupVelocity>,
}

/// Result of a velocity analysis run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VelocityReport {
    /// Pairwise velocity points per group, oldest first
    pub velocity_by_group: BTreeMap<String, Vec<VelocityPoint>>,

    /// Average velocity per group (groups with at least one point only)
    pub topic_velocity: BTreeMap<String, f64>,

    pub summary: VelocitySummary,
}

impl VelocityReport {
    /// Average velocity of `key`, 0 when unknown
    pub fn velocity_of(&self, key: &str) -> f64 {
        self.topic_velocity.get(key).copied().unwrap_or(0.0)
    }
}

/// Compute per-group velocity
pub fn analyze_velocity(items: &[ContentItem], config: &VelocityConfig) -> VelocityReport {
    let mut report = VelocityReport::default();

    if config.window <= Duration::zero() {
        return report;
    }

    for (key, members) in group_items(items, &config.group_by) {
        let (Some(first), Some(last)) = (members.first(), members.last()) else {
            continue;
        };

        // Minimum-signal guard
        if last.0 - first.0 < Duration::hours(MIN_SPAN_HOURS) {
            tracing::trace!(group = %key, "Skipping group with less than one hour of data");
            continue;
        }

        let buckets = bucketize(&members, config.window);
        let series: Vec<(DateTime<Utc>, usize)> = buckets
            .values()
            .map(|b| (b.representative_timestamp, b.count))
            .collect();

        let points: Vec<VelocityPoint> = series
            .windows(2)
            .map(|pair| VelocityPoint::between(&key, pair[0], pair[1]))
            .collect();

        if points.is_empty() {
            continue;
        }

        let average = points.iter().map(|p| p.velocity).sum::<f64>() / points.len() as f64;
        report.topic_velocity.insert(key.clone(), average);
        report.velocity_by_group.insert(key, points);
    }

    report.summary = summarize(&report.topic_velocity);

    tracing::debug!(
        items = items.len(),
        groups = report.topic_velocity.len(),
        window_secs = config.window.num_seconds(),
        "Velocity analysis complete"
    );

    report
}

fn summarize(topic_velocity: &BTreeMap<String, f64>) -> VelocitySummary {
    let mut growing: Vec<GroupVelocity> = topic_velocity
        .iter()
        .filter(|(_, v)| **v > 0.0)
        .map(|(k, &v)| GroupVelocity { key: k.clone(), velocity: v })
        .collect();
    growing.sort_by(|a, b| {
        b.velocity
            .partial_cmp(&a.velocity)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    growing.truncate(SUMMARY_LIMIT);

    let mut declining: Vec<GroupVelocity> = topic_velocity
        .iter()
        .filter(|(_, v)| **v < 0.0)
        .map(|(k, &v)| GroupVelocity { key: k.clone(), velocity: v })
        .collect();
    declining.sort_by(|a, b| {
        a.velocity
            .partial_cmp(&b.velocity)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    declining.truncate(SUMMARY_LIMIT);

    VelocitySummary {
        fastest_growing: growing,
        declining,
    }
}
