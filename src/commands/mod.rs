pub mod detect;
pub mod history;
pub mod recent;
pub mod zscore;

// Re-export command functions for convenience
pub use detect::detect;
pub use history::{history, prune};
pub use recent::recent;
pub use zscore::zscore;
