//! Configuration management for zeitgeist
//!
//! This module handles loading and validating configuration from environment variables,
//! TOML files, and command-line arguments.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::models::DEFAULT_GROUP_FIELD;
use crate::topics::DEFAULT_NAME_STOPWORDS;

/// Largest accepted detection window (ten years)
pub const MAX_WINDOW_HOURS: i64 = 24 * 365 * 10;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Detection defaults used when a caller omits options
    pub detection: DetectionConfig,

    /// Topic extractor transport
    pub extractor: ExtractorConfig,

    /// Snapshot storage
    pub storage: StorageConfig,

    /// Recent-trends cache
    pub cache: CacheConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Default detection options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Spike bucket width in hours
    pub time_window_hours: i64,

    /// Velocity bucket width in hours
    pub window_size_hours: i64,

    /// Spike threshold multiplier
    pub threshold_multiplier: f64,

    /// Item field used for grouping
    pub group_by: String,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            time_window_hours: 24,
            window_size_hours: 8,
            threshold_multiplier: 2.0,
            group_by: DEFAULT_GROUP_FIELD.to_string(),
        }
    }
}

/// How the topic extractor is reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractorKind {
    /// Child process speaking JSON on stdin/stdout
    #[default]
    Subprocess,
    /// HTTP endpoint accepting a JSON POST
    Http,
    /// No extraction; every run is degraded
    Disabled,
}

impl std::str::FromStr for ExtractorKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "subprocess" => Ok(Self::Subprocess),
            "http" => Ok(Self::Http),
            "disabled" | "none" => Ok(Self::Disabled),
            other => anyhow::bail!("Unknown extractor kind: {other}"),
        }
    }
}

/// Topic extractor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Transport
    pub kind: ExtractorKind,

    /// Command line for the subprocess transport
    pub command: String,

    /// URL for the HTTP transport
    pub endpoint: String,

    /// Whole-call timeout in seconds
    pub timeout_secs: u64,

    /// Requested number of topics
    pub num_topics: usize,

    /// Minimum documents per topic
    pub min_cluster_size: usize,

    /// Words stripped from topic names
    pub name_stopwords: Vec<String>,
}

impl ExtractorConfig {
    /// Extraction timeout as Duration
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            kind: ExtractorKind::Subprocess,
            command: String::from("python3 topic_model.py"),
            endpoint: String::from("http://localhost:8000/topics"),
            timeout_secs: 120,
            num_topics: 10,
            min_cluster_size: 5,
            name_stopwords: DEFAULT_NAME_STOPWORDS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Snapshot storage backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// One JSON file per snapshot
    #[default]
    File,
    /// Rows in a SQLite database
    Sqlite,
    /// Process memory only
    Memory,
}

impl std::str::FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "file" => Ok(Self::File),
            "sqlite" => Ok(Self::Sqlite),
            "memory" => Ok(Self::Memory),
            other => anyhow::bail!("Unknown storage backend: {other}"),
        }
    }
}

/// Snapshot storage configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Backend
    pub backend: StorageBackend,

    /// Directory for the file backend
    pub dir: PathBuf,

    /// Database path for the SQLite backend
    pub sqlite_path: PathBuf,

    /// Snapshots kept after each run
    pub retention: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::File,
            dir: PathBuf::from("data/trends"),
            sqlite_path: PathBuf::from("data/trends.db"),
            retention: 20,
        }
    }
}

/// Cache configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Freshness window for recent trends in seconds
    pub ttl_secs: u64,
}

impl CacheConfig {
    /// TTL as Duration
    #[must_use]
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_secs: 3600 }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse::<T>().ok())
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    ///
    /// Missing sections and fields fall back to defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// File (if given) overlaid with environment variables
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Overlay `ZEITGEIST_*` environment variables
    fn apply_env(&mut self) -> Result<()> {
        if let Some(v) = env_parse("ZEITGEIST_TIME_WINDOW_HOURS") {
            self.detection.time_window_hours = v;
        }
        if let Some(v) = env_parse("ZEITGEIST_WINDOW_SIZE_HOURS") {
            self.detection.window_size_hours = v;
        }
        if let Some(v) = env_parse("ZEITGEIST_THRESHOLD") {
            self.detection.threshold_multiplier = v;
        }
        if let Ok(v) = std::env::var("ZEITGEIST_GROUP_BY") {
            self.detection.group_by = v;
        }

        if let Ok(v) = std::env::var("ZEITGEIST_EXTRACTOR") {
            self.extractor.kind = v.parse()?;
        }
        if let Ok(v) = std::env::var("ZEITGEIST_EXTRACTOR_COMMAND") {
            self.extractor.command = v;
        }
        if let Ok(v) = std::env::var("ZEITGEIST_EXTRACTOR_URL") {
            self.extractor.endpoint = v;
        }
        if let Some(v) = env_parse("ZEITGEIST_EXTRACTOR_TIMEOUT") {
            self.extractor.timeout_secs = v;
        }
        if let Some(v) = env_parse("ZEITGEIST_NUM_TOPICS") {
            self.extractor.num_topics = v;
        }
        if let Some(v) = env_parse("ZEITGEIST_MIN_CLUSTER_SIZE") {
            self.extractor.min_cluster_size = v;
        }

        if let Ok(v) = std::env::var("ZEITGEIST_STORAGE") {
            self.storage.backend = v.parse()?;
        }
        if let Ok(v) = std::env::var("ZEITGEIST_STORAGE_DIR") {
            self.storage.dir = v.into();
        }
        if let Ok(v) = std::env::var("ZEITGEIST_SQLITE_PATH") {
            self.storage.sqlite_path = v.into();
        }
        if let Some(v) = env_parse("ZEITGEIST_RETENTION") {
            self.storage.retention = v;
        }

        if let Some(v) = env_parse("ZEITGEIST_CACHE_TTL") {
            self.cache.ttl_secs = v;
        }

        if let Ok(v) = std::env::var("ZEITGEIST_LOG_LEVEL") {
            self.logging.level = v;
        }
        if let Ok(v) = std::env::var("ZEITGEIST_LOG_FORMAT") {
            self.logging.format = v;
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_WINDOW_HOURS).contains(&self.detection.time_window_hours) {
            anyhow::bail!("time_window_hours must be between 1 and {MAX_WINDOW_HOURS}");
        }

        if !(1..=MAX_WINDOW_HOURS).contains(&self.detection.window_size_hours) {
            anyhow::bail!("window_size_hours must be between 1 and {MAX_WINDOW_HOURS}");
        }

        if !self.detection.threshold_multiplier.is_finite()
            || self.detection.threshold_multiplier <= 0.0
        {
            anyhow::bail!("threshold_multiplier must be positive");
        }

        if self.extractor.num_topics == 0 {
            anyhow::bail!("num_topics must be greater than 0");
        }

        if self.extractor.timeout_secs == 0 {
            anyhow::bail!("extractor timeout must be greater than 0");
        }

        match self.extractor.kind {
            ExtractorKind::Subprocess if self.extractor.command.trim().is_empty() => {
                anyhow::bail!("extractor command is required for the subprocess transport")
            }
            ExtractorKind::Http if self.extractor.endpoint.trim().is_empty() => {
                anyhow::bail!("extractor endpoint is required for the http transport")
            }
            _ => {}
        }

        if self.storage.retention == 0 {
            anyhow::bail!("retention must be greater than 0");
        }

        Ok(())
    }
}
