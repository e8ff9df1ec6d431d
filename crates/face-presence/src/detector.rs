//! Face presence detector
//!
//! Counts candidate faces in a frame by sampling the pixel grid, keeping
//! skin-toned samples, clustering them and keeping clusters whose
//! extrapolated area is plausible for a face.

use camera_capture::Frame;
use tracing::{debug, info};

use crate::analysis::FaceDetectionResult;
use crate::cluster::{cluster_points, PixelCluster, Point};
use crate::config::DetectorConfig;
use crate::skin::is_skin;
use crate::PresenceError;

/// Skin-tone clustering face counter
pub struct FacePresenceDetector {
    config: DetectorConfig,
    last: FaceDetectionResult,
    cycles: u64,
}

impl FacePresenceDetector {
    /// Create a detector, validating the heuristics
    pub fn new(config: DetectorConfig) -> Result<Self, PresenceError> {
        config.validate()?;
        info!(
            "Face presence detector: stride={}, cluster_distance={}, area=[{}, {}]",
            config.sample_stride,
            config.cluster_distance,
            config.min_area_fraction,
            config.max_area_fraction
        );
        Ok(Self {
            config,
            last: FaceDetectionResult::default(),
            cycles: 0,
        })
    }

    /// Run one detection cycle.
    ///
    /// Returns `None` without touching the last result when the frame has no
    /// area or a truncated buffer.
    pub fn detect(&mut self, frame: &Frame) -> Option<FaceDetectionResult> {
        if !frame.is_drawable() {
            debug!(
                "Skipping undrawable frame {}x{} ({} bytes)",
                frame.width,
                frame.height,
                frame.data.len()
            );
            return None;
        }

        let faces = self.find_faces(frame);
        let largest = faces.iter().map(PixelCluster::member_count).max().unwrap_or(0);
        let confidence = (largest as f32 / self.config.confidence_divisor).min(100.0);
        let result = FaceDetectionResult::from_count(faces.len() as u32, confidence);

        self.cycles += 1;
        debug!(
            "Detection cycle {}: {} face(s), confidence {:.1}",
            self.cycles, result.face_count, result.confidence
        );
        self.last = result.clone();
        Some(result)
    }

    /// Face-sized skin clusters in the frame
    pub fn find_faces(&self, frame: &Frame) -> Vec<PixelCluster> {
        let stride = self.config.sample_stride;
        let skin = self.sample_skin(frame);
        let clusters = cluster_points(&skin, self.config.cluster_distance, self.config.min_cluster_members);

        let frame_area = frame.area() as f64;
        let min_area = frame_area * self.config.min_area_fraction;
        let max_area = frame_area * self.config.max_area_fraction;

        clusters
            .into_iter()
            .filter(|c| {
                let area = c.extrapolated_area(stride) as f64;
                area >= min_area && area <= max_area
            })
            .collect()
    }

    fn sample_skin(&self, frame: &Frame) -> Vec<Point> {
        let step = self.config.sample_stride as usize;
        let mut points = Vec::new();
        for y in (0..frame.height).step_by(step) {
            for x in (0..frame.width).step_by(step) {
                if let Some([r, g, b]) = frame.rgb_at(x, y) {
                    if is_skin(r, g, b) {
                        points.push((x, y));
                    }
                }
            }
        }
        points
    }

    /// Most recent successful result
    pub fn last_result(&self) -> &FaceDetectionResult {
        &self.last
    }

    /// Completed detection cycles
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }
}
