//! Per-run detection options

use chrono::Duration;

use crate::analytics::{SpikeConfig, VelocityConfig};
use crate::config::{DetectionConfig, ExtractorConfig};
use crate::error::{Error, Result};
use crate::models::DEFAULT_GROUP_FIELD;

/// Options for one `detect_trends` call
#[derive(Debug, Clone, PartialEq)]
pub struct DetectOptions {
    /// Topics requested from the extractor
    pub num_topics: usize,

    /// Minimum documents per topic
    pub min_cluster_size: usize,

    /// Spike bucket width
    pub time_window: Duration,

    /// Item field used for grouping in both detectors
    pub group_by: String,

    /// Spike threshold multiplier
    pub threshold_multiplier: f64,

    /// Velocity bucket width
    pub window_size: Duration,
}

impl Default for DetectOptions {
    fn default() -> Self {
        Self {
            num_topics: 10,
            min_cluster_size: 5,
            time_window: Duration::hours(24),
            group_by: DEFAULT_GROUP_FIELD.to_string(),
            threshold_multiplier: 2.0,
            window_size: Duration::hours(8),
        }
    }
}

impl DetectOptions {
    /// Defaults taken from configuration
    pub fn from_config(detection: &DetectionConfig, extractor: &ExtractorConfig) -> Result<Self> {
        Ok(Self {
            num_topics: extractor.num_topics,
            min_cluster_size: extractor.min_cluster_size,
            time_window: window_hours("timeWindow", detection.time_window_hours)?,
            group_by: detection.group_by.clone(),
            threshold_multiplier: detection.threshold_multiplier,
            window_size: window_hours("windowSize", detection.window_size_hours)?,
        })
    }

    pub fn with_time_window(mut self, window: Duration) -> Self {
        self.time_window = window;
        self
    }

    pub fn with_window_size(mut self, window: Duration) -> Self {
        self.window_size = window;
        self
    }

    pub fn with_group_by(mut self, field: impl Into<String>) -> Self {
        self.group_by = field.into();
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold_multiplier = threshold;
        self
    }

    /// Reject options no run can use
    pub fn validate(&self) -> Result<()> {
        if self.num_topics == 0 {
            return Err(Error::invalid_options("numTopics must be greater than 0"));
        }
        if self.time_window <= Duration::zero() {
            return Err(Error::invalid_options("timeWindow must be positive"));
        }
        if self.window_size <= Duration::zero() {
            return Err(Error::invalid_options("windowSize must be positive"));
        }
        if !self.threshold_multiplier.is_finite() || self.threshold_multiplier <= 0.0 {
            return Err(Error::invalid_options(format!(
                "thresholdMultiplier must be a positive number, got {}",
                self.threshold_multiplier
            )));
        }
        if self.group_by.trim().is_empty() {
            return Err(Error::invalid_options("groupByKey must not be empty"));
        }
        Ok(())
    }

    pub fn spike_config(&self) -> SpikeConfig {
        SpikeConfig {
            window: self.time_window,
            group_by: self.group_by.clone(),
            threshold_multiplier: self.threshold_multiplier,
        }
    }

    pub fn velocity_config(&self) -> VelocityConfig {
        VelocityConfig {
            window: self.window_size,
            group_by: self.group_by.clone(),
        }
    }
}

/// Window of `hours` hours, rejecting values chrono cannot represent
pub fn window_hours(name: &str, hours: i64) -> Result<Duration> {
    Duration::try_hours(hours)
        .ok_or_else(|| Error::invalid_options(format!("{name} of {hours} hours is out of range")))
}
