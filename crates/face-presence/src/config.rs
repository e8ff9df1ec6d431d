//! Detector configuration
//!
//! The area bounds and confidence divisor are uncalibrated heuristics; they
//! are exposed here so deployments can tune them per camera resolution.

use serde::{Deserialize, Serialize};

use crate::PresenceError;

/// Face presence detector configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Sample every Nth pixel along each axis
    pub sample_stride: u32,

    /// Sampled pixels closer than this (in frame pixels) join the same cluster
    pub cluster_distance: f32,

    /// Clusters with fewer sampled members are noise
    pub min_cluster_members: usize,

    /// Smallest face area as a fraction of the frame
    pub min_area_fraction: f64,

    /// Largest face area as a fraction of the frame
    pub max_area_fraction: f64,

    /// Largest cluster size is divided by this to get a 0-100 confidence
    pub confidence_divisor: f32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            sample_stride: 4,
            cluster_distance: 50.0,
            min_cluster_members: 10,
            min_area_fraction: 0.01,
            max_area_fraction: 0.25,
            confidence_divisor: 10.0,
        }
    }
}

impl DetectorConfig {
    pub fn validate(&self) -> Result<(), PresenceError> {
        if self.sample_stride == 0 {
            return Err(PresenceError::Config("sample_stride must be at least 1".into()));
        }
        if !(self.cluster_distance > 0.0) {
            return Err(PresenceError::Config("cluster_distance must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.min_area_fraction)
            || !(0.0..=1.0).contains(&self.max_area_fraction)
            || self.min_area_fraction > self.max_area_fraction
        {
            return Err(PresenceError::Config(format!(
                "invalid face area bounds [{}, {}]",
                self.min_area_fraction, self.max_area_fraction
            )));
        }
        if !(self.confidence_divisor > 0.0) {
            return Err(PresenceError::Config("confidence_divisor must be positive".into()));
        }
        Ok(())
    }
}
