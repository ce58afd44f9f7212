//! Volume spike detection over fixed time windows
//!
//! This module provides:
//! - Per-group bucketing of content into fixed-size time windows
//! - Spike detection against the group's own average bucket count
//! - A generic z-score outlier detector for plain numeric series

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::models::{ContentItem, DEFAULT_GROUP_FIELD};

/// Default z-score / multiplier threshold
pub const DEFAULT_THRESHOLD: f64 = 2.0;

/// Spike detection settings
#[derive(Debug, Clone, PartialEq)]
pub struct SpikeConfig {
    /// Bucket width (default: 24 hours)
    pub window: Duration,

    /// Field used to partition items (default: `groupKey`)
    pub group_by: String,

    /// A bucket spikes when `count > average * threshold_multiplier`
    pub threshold_multiplier: f64,
}

impl Default for SpikeConfig {
    fn default() -> Self {
        Self {
            window: Duration::hours(24),
            group_by: DEFAULT_GROUP_FIELD.to_string(),
            threshold_multiplier: DEFAULT_THRESHOLD,
        }
    }
}

/// A time window whose volume is anomalously high for its group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Spike {
    /// Group the spike belongs to
    pub group_key: String,

    /// Items in the spiking bucket
    pub count: usize,

    /// Mean bucket count of the group
    pub average_count: f64,

    /// `count / average_count`
    pub multiplier: f64,

    /// Start of the spiking bucket
    pub timestamp: DateTime<Utc>,

    /// Member item ids, oldest first
    pub item_ids: Vec<String>,

    /// Summed engagement of member items
    #[serde(default)]
    pub engagement: u64,
}

/// Ephemeral per-window aggregate
#[derive(Debug, Clone, PartialEq)]
pub struct TimeBucket {
    pub count: usize,
    pub item_ids: Vec<String>,
    pub representative_timestamp: DateTime<Utc>,
    pub engagement: u64,
}

/// Index of the window containing `timestamp`
pub(crate) fn bucket_index(timestamp: DateTime<Utc>, window_ms: i64) -> i64 {
    timestamp.timestamp_millis().div_euclid(window_ms)
}

/// Start instant of bucket `index`
pub(crate) fn bucket_start(index: i64, window_ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(index.saturating_mul(window_ms)).unwrap_or_default()
}

/// Partition items by group, preserving first-seen group order
///
/// Items without a group value or with an unparsable timestamp are dropped.
/// Each group is sorted by timestamp (stable, so ties keep input order).
pub(crate) fn group_items<'a>(
    items: &'a [ContentItem],
    group_by: &str,
) -> Vec<(String, Vec<(DateTime<Utc>, &'a ContentItem)>)> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(String, Vec<(DateTime<Utc>, &ContentItem)>)> = Vec::new();

    for item in items {
        let Some(key) = item.group_value(group_by) else {
            continue;
        };
        let Some(ts) = item.parsed_timestamp() else {
            continue;
        };

        let key = key.into_owned();
        let slot = match index.get(&key) {
            Some(&slot) => slot,
            None => {
                groups.push((key.clone(), Vec::new()));
                index.insert(key, groups.len() - 1);
                groups.len() - 1
            }
        };
        groups[slot].1.push((ts, item));
    }

    for (_, members) in &mut groups {
        members.sort_by_key(|(ts, _)| *ts);
    }

    groups
}

/// Bucket one group's (already sorted) items into fixed windows
pub fn bucketize(
    members: &[(DateTime<Utc>, &ContentItem)],
    window: Duration,
) -> BTreeMap<i64, TimeBucket> {
    let window_ms = window.num_milliseconds().max(1);
    let mut buckets: BTreeMap<i64, TimeBucket> = BTreeMap::new();

    for (ts, item) in members {
        let idx = bucket_index(*ts, window_ms);
        let bucket = buckets.entry(idx).or_insert_with(|| TimeBucket {
            count: 0,
            item_ids: Vec::new(),
            representative_timestamp: bucket_start(idx, window_ms),
            engagement: 0,
        });
        bucket.count += 1;
        bucket.item_ids.push(item.id.clone());
        bucket.engagement += u64::from(item.engagement.unwrap_or(0));
    }

    buckets
}

/// Detect volume spikes per group
///
/// The average is computed over the group's own non-empty buckets, so a
/// group with a single bucket always has `multiplier == 1` and never spikes.
/// Output is sorted by multiplier, highest first; ties keep encounter order.
pub fn detect_spikes(items: &[ContentItem], config: &SpikeConfig) -> Vec<Spike> {
    let mut spikes = Vec::new();

    if items.is_empty() || config.window <= Duration::zero() {
        return spikes;
    }

    for (key, members) in group_items(items, &config.group_by) {
        let buckets = bucketize(&members, config.window);
        if buckets.is_empty() {
            continue;
        }

        let total: usize = buckets.values().map(|b| b.count).sum();
        let average = total as f64 / buckets.len() as f64;
        let cutoff = average * config.threshold_multiplier;

        for bucket in buckets.into_values() {
            if bucket.count as f64 > cutoff {
                spikes.push(Spike {
                    group_key: key.clone(),
                    count: bucket.count,
                    average_count: average,
                    multiplier: bucket.count as f64 / average,
                    timestamp: bucket.representative_timestamp,
                    item_ids: bucket.item_ids,
                    engagement: bucket.engagement,
                });
            }
        }
    }

    // sort_by is stable
    spikes.sort_by(|a, b| {
        b.multiplier
            .partial_cmp(&a.multiplier)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    tracing::debug!(
        items = items.len(),
        spikes = spikes.len(),
        window_secs = config.window.num_seconds(),
        "Spike detection complete"
    );

    spikes
}

/// Indices of values whose absolute z-score exceeds `threshold`
///
/// Uses the population standard deviation. A constant (or empty) series has
/// no outliers.
pub fn z_score_anomalies(values: &[f64], threshold: f64) -> Vec<usize> {
    if values.is_empty() {
        return Vec::new();
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|&x| (x - mean).powi(2)).sum::<f64>() / n;
    let std_dev = variance.sqrt();

    values
        .iter()
        .enumerate()
        .filter_map(|(i, &x)| {
            let z = if std_dev > 0.0 {
                (x - mean).abs() / std_dev
            } else {
                0.0
            };
            (z > threshold).then_some(i)
        })
        .collect()
}
