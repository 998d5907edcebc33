//! Risk assessment for tilapia water quality
//!
//! - `classifier`: threshold bands -> Safe / Warning / Danger
//! - `merge`: escalation of sensor and forecast verdicts

pub mod classifier;
pub mod merge;

pub use classifier::RiskClassifier;
pub use merge::{merge, merge_with_override};
