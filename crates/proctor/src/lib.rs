//! Exam Proctoring Session
//!
//! Runs one candidate's proctored sitting:
//! - Samples the webcam on a fixed cadence and counts faces
//! - Watches fullscreen and tab visibility
//! - Escalates confirmed violations and force-submits at the limit
//! - Counts down each exam section and submits exactly once

pub mod config;
pub mod notify;
pub mod presenter;
pub mod session;
pub mod synthetic;

pub use config::{CameraSettings, LoggingConfig, ProctorConfig};
pub use notify::{MemorySink, Notification, NotificationSink, Severity, TracingSink};
pub use presenter::{Presenter, WarningBanner, WarningView};
pub use session::{
    CameraStatus, Proctor, ProctorCommand, ProctorDeps, ProctorHandle, ProctorSnapshot, SessionEnd,
    SessionReport,
};

use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Proctoring error types
#[derive(Error, Debug)]
pub enum ProctorError {
    #[error("Session error: {0}")]
    Session(#[from] exam_session::SessionError),

    #[error("Camera error: {0}")]
    Camera(#[from] camera_capture::CameraError),

    #[error("Detector error: {0}")]
    Detector(#[from] face_presence::PresenceError),

    #[error("Policy error: {0}")]
    Policy(#[from] violation_policy::PolicyError),

    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),

    #[error("Logging setup failed: {0}")]
    Logging(String),

    #[error("Proctoring session has ended")]
    Closed,
}

/// Install the global tracing subscriber
pub fn init_logging(config: &LoggingConfig) -> Result<(), ProctorError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let result = if config.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .json()
            .try_init()
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .try_init()
    };

    result.map_err(|e| ProctorError::Logging(e.to_string()))
}
