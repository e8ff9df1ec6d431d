//! Proctoring configuration
//!
//! Loaded from an optional TOML file, then `PROCTOR__SECTION__KEY`
//! environment overrides, on top of the built-in defaults.

use camera_capture::CameraConfig;
use exam_session::ExamConfig;
use face_presence::DetectorConfig;
use serde::{Deserialize, Serialize};
use session_scheduler::CadenceConfig;
use std::path::Path;
use tracing::info;
use violation_policy::PolicyConfig;

use crate::ProctorError;

/// Requested webcam resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    pub width: u32,
    pub height: u32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
        }
    }
}

impl From<&CameraSettings> for CameraConfig {
    fn from(settings: &CameraSettings) -> Self {
        CameraConfig {
            width: settings.width,
            height: settings.height,
        }
    }
}

/// Log output settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset
    pub level: String,
    /// Emit JSON lines instead of human readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Complete proctoring configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProctorConfig {
    pub detector: DetectorConfig,
    pub policy: PolicyConfig,
    pub exam: ExamConfig,
    pub cadence: CadenceConfig,
    pub camera: CameraSettings,
    pub logging: LoggingConfig,
}

impl ProctorConfig {
    /// Load defaults, then `path` (if given), then environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self, ProctorError> {
        let mut builder = ::config::Config::builder();
        if let Some(path) = path {
            info!("Loading proctoring config from {}", path.display());
            builder = builder.add_source(::config::File::from(path));
        }
        builder = builder.add_source(
            ::config::Environment::with_prefix("PROCTOR")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML document over the defaults
    pub fn from_toml(source: &str) -> Result<Self, ProctorError> {
        let config: Self = ::config::Config::builder()
            .add_source(::config::File::from_str(source, ::config::FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ProctorError> {
        self.detector.validate()?;
        self.policy.validate()?;
        self.exam.validate()?;
        Ok(())
    }
}
