//! Camera Capture Library for Exam Proctoring
//!
//! Provides the frame type consumed by face presence detection and the
//! camera ownership model used by a proctoring session:
//! - RGBA video frames sampled from the candidate's webcam
//! - Provider / frame source traits implemented by the host
//! - A scoped stream guard that always stops the camera tracks
//! - A scripted synthetic camera for tests and demos

pub mod frame;
pub mod stream;
pub mod synthetic;

pub use frame::Frame;
pub use stream::{CameraProvider, CameraStream, FrameSource};
pub use synthetic::{FrameFeed, StopCounter, SyntheticCamera, SyntheticProvider};

use thiserror::Error;

/// Camera error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CameraError {
    #[error("Camera access denied: {0}")]
    PermissionDenied(String),

    #[error("No camera device available")]
    NoDevice,

    #[error("Failed to open camera: {0}")]
    Open(String),

    #[error("Frame capture failed: {0}")]
    Capture(String),

    #[error("Camera not initialized")]
    NotInitialized,
}

/// Camera configuration
#[derive(Debug, Clone)]
pub struct CameraConfig {
    /// Ideal capture width
    pub width: u32,
    /// Ideal capture height
    pub height: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
        }
    }
}
