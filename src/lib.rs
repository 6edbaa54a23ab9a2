//! Accelerometer fall detection.
//!
//! Samples in g are classified one at a time into normal motion, free-fall,
//! jolt, or a detected fall (free-fall followed by an impact within a short
//! window). The classifier is synchronous and owns its state; the `sensors`
//! module feeds it from a line-oriented stream through a single-consumer
//! channel.

pub mod classifier;
pub mod config;
pub mod error;
pub mod live_status;
pub mod report;
pub mod sensors;
pub mod types;

pub use classifier::{FallClassifier, Phase};
pub use config::DetectorConfig;
pub use error::{DetectorResult, FallDetectorError};
pub use types::{magnitude, AccelData, Classification};
