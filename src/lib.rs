//! zeitgeist - trend detection over timestamped content
//!
//! Turns a batch of content items (articles, abstracts) into a ranked list of
//! trending topics by combining three signals: topic clusters from an
//! external extractor, volume spikes per group, and growth velocity.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`models`] - Content items and timestamp/group resolution
//! - [`analytics`] - Spike detection, z-score outliers and velocity analysis
//! - [`topics`] - Topic extractor contract and transports (subprocess, HTTP)
//! - [`trends`] - The trend manager: fusion, ranking, caching, persistence
//! - [`storage`] - Snapshot stores (file, SQLite, memory)
//! - [`engagement`] - Engagement synthesis for items without one
//! - [`config`] - Configuration management and settings
//! - [`error`] - Unified error type
//! - [`metrics`] - Prometheus metrics
//!
//! # Example
//!
//! ```no_run
//! use zeitgeist::config::Config;
//! use zeitgeist::trends::{DetectOptions, TrendManager};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let manager = TrendManager::from_config(&config)?;
//!     let report = manager.detect_trends(&[], &DetectOptions::default()).await;
//!     println!("{}", serde_json::to_string_pretty(&report)?);
//!     Ok(())
//! }
//! ```

pub mod analytics;
pub mod config;
pub mod engagement;
pub mod error;
pub mod metrics;
pub mod models;
pub mod storage;
pub mod topics;
pub mod trends;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{Error, ErrorCategory, Result, ZeitgeistErrorTrait};
    pub use crate::models::ContentItem;
    pub use crate::storage::SnapshotRepository;
    pub use crate::topics::{Extraction, TopicExtractor};
    pub use crate::trends::{
        DetectOptions, ReportStatus, TrendContext, TrendManager, TrendRecord, TrendReport,
    };
}

// Direct re-exports for convenience
pub use models::ContentItem;
pub use trends::{DetectOptions, TrendManager, TrendReport};
