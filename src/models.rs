// Core data structures for the trend pipeline

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;

/// Field name that resolves to [`ContentItem::group_key`]
pub const DEFAULT_GROUP_FIELD: &str = "groupKey";

/// A timestamped piece of content (news article, abstract, post)
///
/// `timestamp` is kept exactly as the caller supplied it. Items whose
/// timestamp does not parse are skipped by every time-series stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    pub id: String,
    pub content: String,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engagement: Option<u32>,

    /// Additional grouping attributes (e.g. `domainId`, `source`)
    #[serde(flatten)]
    pub attributes: BTreeMap<String, serde_json::Value>,
}

impl ContentItem {
    /// Create an item with a group key and no engagement
    pub fn new(
        id: impl Into<String>,
        content: impl Into<String>,
        timestamp: DateTime<Utc>,
        group_key: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            timestamp: timestamp.to_rfc3339(),
            group_key: Some(group_key.into()),
            ..Default::default()
        }
    }

    /// Builder-style engagement setter
    #[must_use]
    pub fn with_engagement(mut self, engagement: u32) -> Self {
        self.engagement = Some(engagement);
        self
    }

    /// Builder-style attribute setter
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes
            .insert(key.into(), serde_json::Value::String(value.into()));
        self
    }

    /// Parsed timestamp, or `None` if the raw value is not a valid instant
    pub fn parsed_timestamp(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.timestamp)
    }

    /// Resolve the grouping value for `field`
    ///
    /// `groupKey` maps to the dedicated field; anything else is looked up in
    /// the extra attributes, where numbers group by their decimal form.
    /// Empty strings count as missing.
    pub fn group_value(&self, field: &str) -> Option<Cow<'_, str>> {
        let value = if field == DEFAULT_GROUP_FIELD {
            self.group_key.as_deref().map(Cow::Borrowed)
        } else {
            match self.attributes.get(field)? {
                serde_json::Value::String(s) => Some(Cow::Borrowed(s.as_str())),
                serde_json::Value::Number(n) => Some(Cow::Owned(n.to_string())),
                _ => None,
            }
        };
        value.filter(|v| !v.is_empty())
    }
}

/// Parse a caller-supplied timestamp
///
/// Accepted forms: RFC 3339, `YYYY-MM-DD HH:MM:SS` (UTC), `YYYY-MM-DD`
/// (midnight UTC), and integer epoch milliseconds.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(Utc.from_utc_datetime(&naive));
    }

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|n| Utc.from_utc_datetime(&n));
    }

    raw.parse::<i64>()
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
}
