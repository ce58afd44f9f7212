//! Join spikes with topics and rank the result

use chrono::{DateTime, Utc};
use std::cmp::Ordering;

use crate::analytics::{Spike, VelocityReport};
use crate::topics::TopicResults;

use super::types::TrendRecord;

/// Keywords copied from a topic into each record
pub const TREND_KEYWORDS: usize = 5;

/// Emit one record per (spike, known topic) pair
///
/// Topics are resolved through the spike's member items. Items with no topic
/// are ignored, each topic appears once per spike in first-seen order, and
/// topics without details are dropped. Output follows spike order.
pub fn fuse(
    spikes: &[Spike],
    topics: &TopicResults,
    velocity: &VelocityReport,
    created_at: DateTime<Utc>,
) -> Vec<TrendRecord> {
    let mut trends = Vec::new();

    if topics.topic_details.is_empty() {
        return trends;
    }

    for spike in spikes {
        let mut related: Vec<i64> = Vec::new();
        for item_id in &spike.item_ids {
            if let Some(topic_id) = topics.topic_of(item_id) {
                if !related.contains(&topic_id) {
                    related.push(topic_id);
                }
            }
        }

        for topic_id in related {
            let Some(detail) = topics.detail(topic_id) else {
                continue;
            };

            trends.push(TrendRecord {
                id: TrendRecord::make_id(topic_id, &spike.group_key, spike.timestamp),
                topic_id,
                name: detail.name.clone(),
                keywords: detail.top_keywords(TREND_KEYWORDS),
                multiplier: spike.multiplier,
                count: spike.count,
                velocity: velocity.velocity_of(&topic_id.to_string()),
                group_key: spike.group_key.clone(),
                spike_timestamp: spike.timestamp,
                created_at,
            });
        }
    }

    trends
}

/// Sort by score, highest first; equal scores keep their order
pub fn rank(trends: &mut [TrendRecord]) {
    trends.sort_by(|a, b| b.score().partial_cmp(&a.score()).unwrap_or(Ordering::Equal));
}
