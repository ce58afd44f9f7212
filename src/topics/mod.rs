//! Topic extraction collaborator
//!
//! The clustering model runs out of process. This module defines the
//! request/response schema, the [`TopicExtractor`] transport trait, and the
//! single place where a raw response is validated into an [`Extraction`].
//!
//! # Transports
//!
//! - [`SubprocessExtractor`] - request JSON on stdin, response JSON on stdout
//! - [`HttpExtractor`] - request JSON POSTed to an endpoint
//! - [`DisabledExtractor`] - always fails; the pipeline degrades gracefully

pub mod http;
pub mod subprocess;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{ExtractorConfig, ExtractorKind};
use crate::models::ContentItem;

pub use http::HttpExtractor;
pub use subprocess::SubprocessExtractor;

/// Topic id the extractor uses for "no topic assigned"
pub const NO_TOPIC: i64 = -1;

/// Words stripped from topic names by default
pub const DEFAULT_NAME_STOPWORDS: &[&str] = &["hours", "created", "content", "ago"];

/// Errors raised by extractor transports
#[derive(Debug, thiserror::Error)]
pub enum ExtractorError {
    #[error("Failed to spawn extractor process: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("Extractor I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Extractor timed out after {0:?}")]
    Timeout(Duration),

    #[error("Extractor exited with status {code:?}: {stderr}")]
    ExitStatus { code: Option<i32>, stderr: String },

    #[error("Extractor produced no output")]
    EmptyOutput,

    #[error("Malformed extractor payload: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Extractor HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Extractor returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Topic extraction disabled")]
    Disabled,
}

// ============================================================================
// Wire Types
// ============================================================================

/// One document handed to the extractor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicDocument {
    pub id: String,
    pub text: String,
    pub timestamp: String,
}

/// Extraction request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicRequest {
    pub items: Vec<TopicDocument>,
    pub num_topics: usize,
    pub min_cluster_size: usize,
}

impl TopicRequest {
    /// Build a request from content items
    pub fn from_items(items: &[ContentItem], num_topics: usize, min_cluster_size: usize) -> Self {
        Self {
            items: items
                .iter()
                .map(|item| TopicDocument {
                    id: item.id.clone(),
                    text: item.content.clone(),
                    timestamp: item.timestamp.clone(),
                })
                .collect(),
            num_topics,
            min_cluster_size,
        }
    }
}

/// Weighted topic keyword
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicWord {
    pub word: String,
    #[serde(default)]
    pub weight: f64,
}

/// Descriptor of one extracted topic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicDetail {
    /// Filled from the `topicDetails` map key during validation
    #[serde(default)]
    pub topic_id: String,

    pub name: String,

    /// Keywords, most representative first
    #[serde(default)]
    pub words: Vec<TopicWord>,

    #[serde(default, rename = "count")]
    pub document_count: usize,
}

impl TopicDetail {
    /// First `n` keyword strings
    pub fn top_keywords(&self, n: usize) -> Vec<String> {
        self.words.iter().take(n).map(|w| w.word.clone()).collect()
    }
}

/// Raw extractor response, every field optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicResponse {
    #[serde(default)]
    pub topics: Vec<i64>,
    #[serde(default)]
    pub topic_details: BTreeMap<String, TopicDetail>,
    #[serde(default)]
    pub doc_id_to_topic: BTreeMap<String, i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Topic data consumed by fusion and stored in snapshots
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicResults {
    #[serde(default)]
    pub topics: Vec<i64>,
    #[serde(default)]
    pub topic_details: BTreeMap<String, TopicDetail>,
    #[serde(default)]
    pub doc_id_to_topic: BTreeMap<String, i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TopicResults {
    /// Empty topic data carrying an error message
    pub fn empty_with_error(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Default::default()
        }
    }

    /// Topic assigned to `item_id`, ignoring the no-topic sentinel
    pub fn topic_of(&self, item_id: &str) -> Option<i64> {
        self.doc_id_to_topic
            .get(item_id)
            .copied()
            .filter(|&t| t != NO_TOPIC)
    }

    /// Detail for a topic id
    pub fn detail(&self, topic_id: i64) -> Option<&TopicDetail> {
        self.topic_details.get(&topic_id.to_string())
    }
}

// ============================================================================
// Validated Outcome
// ============================================================================

/// Validated result of one extraction call
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    /// Full topic data
    Success(TopicResults),

    /// Extractor answered but flagged a problem; data may be partial
    Degraded { results: TopicResults, reason: String },

    /// Extractor unusable for this run
    Failed { reason: String },
}

impl Extraction {
    /// Validate a raw response
    ///
    /// Topic ids are copied into their details and names are cleaned of
    /// `stopwords`. A response carrying `error` is degraded even when it also
    /// carries data.
    pub fn from_response(response: TopicResponse, stopwords: &[String]) -> Self {
        let TopicResponse {
            topics,
            topic_details,
            doc_id_to_topic,
            error,
        } = response;

        let topic_details = topic_details
            .into_iter()
            .map(|(id, mut detail)| {
                detail.topic_id = id.clone();
                detail.name = clean_topic_name(&detail.name, stopwords);
                (id, detail)
            })
            .collect();

        let results = TopicResults {
            topics,
            topic_details,
            doc_id_to_topic,
            error: None,
        };

        match error {
            Some(reason) => Self::Degraded { results, reason },
            None => Self::Success(results),
        }
    }

    /// Map a transport error to a failed extraction
    pub fn from_error(err: &ExtractorError) -> Self {
        Self::Failed {
            reason: err.to_string(),
        }
    }

    /// Error message, if any
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Success(_) => None,
            Self::Degraded { reason, .. } | Self::Failed { reason } => Some(reason),
        }
    }

    /// Whether full topic data is available
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Collapse into topic data, keeping the error message
    pub fn into_results(self) -> TopicResults {
        match self {
            Self::Success(results) => results,
            Self::Degraded {
                mut results,
                reason,
            } => {
                results.error = Some(reason);
                results
            }
            Self::Failed { reason } => TopicResults::empty_with_error(reason),
        }
    }
}

/// Remove stopwords and single-character words from a topic name
///
/// Stopwords match case-sensitively, so capitalized words such as proper
/// nouns survive. Falls back to the original name when nothing survives.
pub fn clean_topic_name(name: &str, stopwords: &[String]) -> String {
    let kept: Vec<&str> = name
        .split_whitespace()
        .filter(|word| word.chars().count() > 1)
        .filter(|word| !stopwords.iter().any(|s| s == word))
        .collect();

    if kept.is_empty() {
        name.to_string()
    } else {
        kept.join(" ")
    }
}

/// Default stopword list as owned strings
pub fn default_name_stopwords() -> Vec<String> {
    DEFAULT_NAME_STOPWORDS.iter().map(|s| s.to_string()).collect()
}

// ============================================================================
// Transport Trait
// ============================================================================

/// Out-of-process topic extraction
///
/// Implementations only move bytes; validation happens in
/// [`Extraction::from_response`].
#[async_trait]
pub trait TopicExtractor: Send + Sync {
    /// Transport name for logs
    fn name(&self) -> &str;

    /// Run one extraction
    async fn extract(&self, request: &TopicRequest) -> Result<TopicResponse, ExtractorError>;
}

/// Extractor used when no transport is configured
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledExtractor;

#[async_trait]
impl TopicExtractor for DisabledExtractor {
    fn name(&self) -> &str {
        "disabled"
    }

    async fn extract(&self, _request: &TopicRequest) -> Result<TopicResponse, ExtractorError> {
        Err(ExtractorError::Disabled)
    }
}

/// Build the configured extractor
pub fn from_config(config: &ExtractorConfig) -> anyhow::Result<Arc<dyn TopicExtractor>> {
    let extractor: Arc<dyn TopicExtractor> = match config.kind {
        ExtractorKind::Subprocess => Arc::new(SubprocessExtractor::from_command_line(
            &config.command,
        )?),
        ExtractorKind::Http => Arc::new(HttpExtractor::with_timeout(
            &config.endpoint,
            config.timeout(),
        )?),
        ExtractorKind::Disabled => Arc::new(DisabledExtractor),
    };

    tracing::debug!(extractor = extractor.name(), "Topic extractor configured");
    Ok(extractor)
}
