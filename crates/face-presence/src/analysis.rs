//! Detection results

use serde::{Deserialize, Serialize};

/// Outcome of one detection cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceDetectionResult {
    pub face_count: u32,
    pub is_multiple_faces: bool,
    pub is_no_face: bool,
    /// 0-100
    pub confidence: f32,
}

impl FaceDetectionResult {
    /// Build a result with the flags derived from the count
    pub fn from_count(face_count: u32, confidence: f32) -> Self {
        Self {
            face_count,
            is_multiple_faces: face_count > 1,
            is_no_face: face_count == 0,
            confidence: confidence.clamp(0.0, 100.0),
        }
    }

    pub fn status(&self) -> FaceStatus {
        match self.face_count {
            0 => FaceStatus::NoFace,
            1 => FaceStatus::SingleFace,
            n => FaceStatus::MultipleFaces(n),
        }
    }

    /// Exactly one face in view
    pub fn is_normal(&self) -> bool {
        self.face_count == 1
    }
}

impl Default for FaceDetectionResult {
    /// Nothing analysed yet counts as no face
    fn default() -> Self {
        Self::from_count(0, 0.0)
    }
}

/// Face status for display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FaceStatus {
    NoFace,
    SingleFace,
    MultipleFaces(u32),
}

impl FaceStatus {
    pub fn label(&self) -> String {
        match self {
            FaceStatus::NoFace => "No face".to_string(),
            FaceStatus::SingleFace => "1 face".to_string(),
            FaceStatus::MultipleFaces(n) => format!("{} faces", n),
        }
    }
}
