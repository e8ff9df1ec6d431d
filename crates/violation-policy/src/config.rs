//! Policy configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::PolicyError;

/// Escalation thresholds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Consecutive multi-face cycles before a violation is confirmed
    pub multi_face_threshold: u32,

    /// Consecutive no-face cycles before a violation is confirmed
    pub no_face_threshold: u32,

    /// Cumulative violations that terminate the exam
    pub termination_threshold: u32,

    /// How long a warning stays on screen (milliseconds)
    pub warning_display_ms: u64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            multi_face_threshold: 3,
            no_face_threshold: 5,
            termination_threshold: 5,
            warning_display_ms: 3000,
        }
    }
}

impl PolicyConfig {
    pub fn warning_display(&self) -> Duration {
        Duration::from_millis(self.warning_display_ms)
    }

    /// Reject thresholds that would fire on every cycle or never count
    pub fn validate(&self) -> Result<(), PolicyError> {
        if self.multi_face_threshold == 0 {
            return Err(PolicyError::ZeroThreshold { field: "multi_face_threshold" });
        }
        if self.no_face_threshold == 0 {
            return Err(PolicyError::ZeroThreshold { field: "no_face_threshold" });
        }
        if self.termination_threshold == 0 {
            return Err(PolicyError::ZeroThreshold { field: "termination_threshold" });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PolicyConfig::default();
        assert_eq!(config.multi_face_threshold, 3);
        assert_eq!(config.no_face_threshold, 5);
        assert_eq!(config.termination_threshold, 5);
        assert_eq!(config.warning_display(), Duration::from_secs(3));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_threshold_rejected() {
        let config = PolicyConfig {
            termination_threshold: 0,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(PolicyError::ZeroThreshold { field: "termination_threshold" })
        );
    }

    #[test]
    fn test_partial_deserialize_keeps_defaults() {
        let config: PolicyConfig = serde_json::from_str(r#"{"termination_threshold": 3}"#).unwrap();
        assert_eq!(config.termination_threshold, 3);
        assert_eq!(config.no_face_threshold, 5);
    }
}
