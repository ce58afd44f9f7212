//! Time-series analytics over content volume
//!
//! - [`anomaly`] - windowed spike detection and z-score outliers
//! - [`velocity`] - period-over-period growth per group

pub mod anomaly;
pub mod velocity;

pub use anomaly::{detect_spikes, z_score_anomalies, Spike, SpikeConfig, TimeBucket};
pub use velocity::{
    analyze_velocity, GroupVelocity, VelocityConfig, VelocityPoint, VelocityReport,
    VelocitySummary,
};
