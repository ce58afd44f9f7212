//! Integration tests module
//!
//! End-to-end tests for the trend pipeline:
//! - Detection, ranking, persistence and caching
//! - Extractor, storage and option failures

pub mod error_scenarios;
pub mod fixtures;
pub mod pipeline_test;
