//! Violation events and counters

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a violation came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViolationSource {
    /// More than one face held for the debounce window
    FaceMulti,
    /// No face held for the debounce window
    FaceNone,
    /// The exam left fullscreen mode
    FullscreenExit,
    /// The exam tab was hidden or the window minimized
    TabHidden,
}

impl ViolationSource {
    pub const ALL: [ViolationSource; 4] = [
        ViolationSource::FaceMulti,
        ViolationSource::FaceNone,
        ViolationSource::FullscreenExit,
        ViolationSource::TabHidden,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ViolationSource::FaceMulti => "face_multi",
            ViolationSource::FaceNone => "face_none",
            ViolationSource::FullscreenExit => "fullscreen_exit",
            ViolationSource::TabHidden => "tab_hidden",
        }
    }
}

impl fmt::Display for ViolationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A confirmed violation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViolationEvent {
    /// Human readable reason shown to the candidate
    pub reason: String,
    pub source: ViolationSource,
}

impl ViolationEvent {
    pub fn new(source: ViolationSource, reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            source,
        }
    }

    pub fn multiple_faces(face_count: u32) -> Self {
        Self::new(
            ViolationSource::FaceMulti,
            format!("Multiple faces detected ({} people)", face_count),
        )
    }

    pub fn no_face() -> Self {
        Self::new(ViolationSource::FaceNone, "No face detected in camera")
    }

    pub fn fullscreen_exit() -> Self {
        Self::new(ViolationSource::FullscreenExit, "Left fullscreen mode")
    }

    pub fn tab_hidden() -> Self {
        Self::new(ViolationSource::TabHidden, "Tab switched or window minimized")
    }
}

/// Debounce streak counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsecutiveCounters {
    pub multi_face: u32,
    pub no_face: u32,
}

/// Snapshot of the violation counters and thresholds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViolationState {
    pub total: u32,
    pub consecutive_multi_face: u32,
    pub consecutive_no_face: u32,
    pub multi_face_threshold: u32,
    pub no_face_threshold: u32,
    pub termination_threshold: u32,
}

impl ViolationState {
    /// Violations left before termination
    pub fn remaining(&self) -> u32 {
        self.termination_threshold.saturating_sub(self.total)
    }

    pub fn is_terminal(&self) -> bool {
        self.total >= self.termination_threshold
    }
}
