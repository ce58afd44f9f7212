//! Unified error handling for the zeitgeist crate
//!
//! This module provides a unified error type that consolidates domain-specific
//! errors into a single `Error` enum.
//!
//! # Architecture
//!
//! - [`ZeitgeistErrorTrait`] - Common interface implemented by all error types
//! - [`ErrorCategory`] - Classification of errors for handling strategies
//! - [`Error`] - Unified error enum wrapping all domain-specific errors
//!
//! The trend manager never surfaces these to callers directly; they are
//! folded into the report's `error` field. The CLI and storage layers use
//! them with `?`.

use std::io;
use thiserror::Error;

pub use crate::topics::ExtractorError;

/// Common trait for all zeitgeist error types
pub trait ZeitgeistErrorTrait: std::error::Error {
    /// Check if this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Get the error category for handling strategies
    fn category(&self) -> ErrorCategory;
}

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Topic extractor unavailable or misbehaving
    Upstream,
    /// Snapshot store and I/O errors
    Storage,
    /// Caller-supplied options or data
    Input,
    /// Configuration errors
    Config,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    /// Short label for logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Upstream => "upstream",
            Self::Storage => "storage",
            Self::Input => "input",
            Self::Config => "config",
            Self::Other => "other",
        }
    }
}

impl ZeitgeistErrorTrait for ExtractorError {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::Http(_) | Self::Io(_) => true,
            Self::HttpStatus { status, .. } => *status >= 500 || *status == 429,
            Self::Spawn(_)
            | Self::ExitStatus { .. }
            | Self::EmptyOutput
            | Self::Malformed(_)
            | Self::Disabled => false,
        }
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Upstream
    }
}

/// Unified error type for the zeitgeist crate
#[derive(Error, Debug)]
pub enum Error {
    /// Topic extraction failures
    #[error("Extractor error: {0}")]
    Extractor(#[from] ExtractorError),

    /// Snapshot store failures
    #[error("Storage error: {0}")]
    Storage(String),

    /// Database errors
    #[error("Database error: {0}")]
    Database(#[source] rusqlite::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),

    /// Rejected detection options
    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    /// Generic error with context
    #[error("{context}")]
    Other {
        context: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl ZeitgeistErrorTrait for Error {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Extractor(e) => e.is_recoverable(),
            Self::Storage(_) => true,
            Self::Database(_) => false,
            Self::Io(_) => true, // I/O errors are often transient
            Self::Json(_) => false,
            Self::Http(_) => true,
            Self::Config(_) => false,
            Self::InvalidOptions(_) => false,
            Self::Other { .. } => false,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Extractor(_) | Self::Http(_) => ErrorCategory::Upstream,
            Self::Storage(_) | Self::Database(_) | Self::Io(_) => ErrorCategory::Storage,
            Self::Json(_) | Self::InvalidOptions(_) => ErrorCategory::Input,
            Self::Config(_) => ErrorCategory::Config,
            Self::Other { .. } => ErrorCategory::Other,
        }
    }
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid-options error
    pub fn invalid_options(msg: impl Into<String>) -> Self {
        Self::InvalidOptions(msg.into())
    }

    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a generic error with context
    pub fn other(context: impl Into<String>) -> Self {
        Self::Other {
            context: context.into(),
            source: None,
        }
    }

    /// Create a generic error with context and source
    pub fn with_source(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Other {
            context: context.into(),
            source: Some(Box::new(source)),
        }
    }
}

// Conversion from rusqlite::Error
impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database(err)
    }
}

// Storage backends report through anyhow
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Storage(format!("{err:#}"))
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;
