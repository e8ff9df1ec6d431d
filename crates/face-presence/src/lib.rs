//! Face Presence Detection
//!
//! Best-effort estimate of how many faces are in front of the camera:
//! - Skin-tone classification (RGB and YCbCr rules)
//! - Distance-based clustering of skin pixels into candidate faces
//! - Face-sized area filtering
//! - Temporal debouncing into confirmed violations
//!
//! This is a heuristic signal source, not biometric recognition.

pub mod analysis;
pub mod cluster;
pub mod config;
pub mod debounce;
pub mod detector;
pub mod skin;

pub use analysis::{FaceDetectionResult, FaceStatus};
pub use cluster::PixelCluster;
pub use config::DetectorConfig;
pub use debounce::TemporalDebouncer;
pub use detector::FacePresenceDetector;

use thiserror::Error;

/// Face presence error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PresenceError {
    #[error("Configuration error: {0}")]
    Config(String),
}
