//! Temporal debouncing of detection cycles
//!
//! A single misclassified frame or a brief occlusion should not count as a
//! violation; only a sustained streak does, and a streak fires once.

use tracing::debug;
use violation_policy::{ConsecutiveCounters, PolicyConfig, ViolationEvent};

use crate::analysis::FaceDetectionResult;

/// Streak counters turning per-cycle results into violation events
#[derive(Debug, Clone)]
pub struct TemporalDebouncer {
    counters: ConsecutiveCounters,
    multi_face_threshold: u32,
    no_face_threshold: u32,
}

impl TemporalDebouncer {
    pub fn new(multi_face_threshold: u32, no_face_threshold: u32) -> Self {
        Self {
            counters: ConsecutiveCounters::default(),
            multi_face_threshold,
            no_face_threshold,
        }
    }

    pub fn from_policy(config: &PolicyConfig) -> Self {
        Self::new(config.multi_face_threshold, config.no_face_threshold)
    }

    /// Feed one cycle; returns an event when a streak reaches its threshold
    pub fn observe(&mut self, result: &FaceDetectionResult) -> Option<ViolationEvent> {
        if result.is_multiple_faces {
            self.counters.multi_face += 1;
            self.counters.no_face = 0;

            if self.counters.multi_face >= self.multi_face_threshold {
                self.counters.multi_face = 0;
                debug!("Multi-face streak confirmed ({} faces)", result.face_count);
                return Some(ViolationEvent::multiple_faces(result.face_count));
            }
        } else if result.is_no_face {
            self.counters.no_face += 1;
            self.counters.multi_face = 0;

            if self.counters.no_face >= self.no_face_threshold {
                self.counters.no_face = 0;
                debug!("No-face streak confirmed");
                return Some(ViolationEvent::no_face());
            }
        } else {
            self.counters = ConsecutiveCounters::default();
        }
        None
    }

    pub fn counters(&self) -> ConsecutiveCounters {
        self.counters
    }

    /// Forget any streak in progress
    pub fn reset(&mut self) {
        self.counters = ConsecutiveCounters::default();
    }
}

impl Default for TemporalDebouncer {
    fn default() -> Self {
        Self::from_policy(&PolicyConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use violation_policy::ViolationSource;

    fn cycle(faces: u32) -> FaceDetectionResult {
        FaceDetectionResult::from_count(faces, 50.0)
    }

    fn run(deb: &mut TemporalDebouncer, faces: &[u32]) -> Vec<ViolationEvent> {
        faces.iter().filter_map(|&n| deb.observe(&cycle(n))).collect()
    }

    #[test]
    fn test_three_multi_face_cycles_fire_once() {
        let mut deb = TemporalDebouncer::default();
        let events = run(&mut deb, &[2, 2, 3]);

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].source, ViolationSource::FaceMulti);
        assert_eq!(events[0].reason, "Multiple faces detected (3 people)");
        assert_eq!(deb.counters(), ConsecutiveCounters::default());
    }

    #[test]
    fn test_five_no_face_cycles_fire_once() {
        let mut deb = TemporalDebouncer::default();
        let events = run(&mut deb, &[0, 0, 0, 0, 0]);

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].source, ViolationSource::FaceNone);
        assert_eq!(deb.counters().no_face, 0);
    }

    #[test]
    fn test_normal_cycle_resets_streaks() {
        let mut deb = TemporalDebouncer::default();
        let events = run(&mut deb, &[0, 0, 0, 0, 1, 0, 0, 0, 0]);
        assert!(events.is_empty());
        assert_eq!(deb.counters().no_face, 4);

        let events = run(&mut deb, &[0]);
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_alternating_anomalies_never_fire() {
        let mut deb = TemporalDebouncer::default();
        let events = run(&mut deb, &[2, 2, 0, 2, 2, 0, 0, 0, 0, 2]);
        assert!(events.is_empty());
        assert_eq!(deb.counters(), ConsecutiveCounters { multi_face: 1, no_face: 0 });
    }

    #[test]
    fn test_sustained_anomaly_fires_per_streak() {
        let mut deb = TemporalDebouncer::default();
        let events = run(&mut deb, &[2; 7]);
        // Fires on cycles 3 and 6
        assert_eq!(events.len(), 2);
        assert_eq!(deb.counters().multi_face, 1);
    }

    #[test]
    fn test_reset() {
        let mut deb = TemporalDebouncer::default();
        run(&mut deb, &[0, 0, 0]);
        deb.reset();
        assert_eq!(deb.counters(), ConsecutiveCounters::default());
    }
}
