//! Common test utilities

use chrono::{DateTime, Duration, TimeZone, Utc};
use zeitgeist::models::ContentItem;

/// Fixed "now" used by pipeline tests
pub fn test_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 10, 14, 0, 0).unwrap()
}

/// Item in `group` posted `minutes_ago` before [`test_now`]
#[allow(dead_code)]
pub fn item_at(id: &str, group: &str, minutes_ago: i64) -> ContentItem {
    ContentItem::new(
        id,
        format!("{group} content {id}"),
        test_now() - Duration::minutes(minutes_ago),
        group,
    )
}

/// `count` items in `group`, all inside one hour-aligned window
#[allow(dead_code)]
pub fn burst(prefix: &str, group: &str, count: usize, hours_ago: i64) -> Vec<ContentItem> {
    (0..count)
        .map(|i| {
            item_at(
                &format!("{prefix}-{i}"),
                group,
                hours_ago * 60 - (i as i64 % 30),
            )
        })
        .collect()
}
