//! Maps session events to candidate-facing notifications and the warning banner

use face_presence::FaceDetectionResult;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use violation_policy::{ViolationEvent, ViolationSource, ViolationWarning};

use crate::notify::{Notification, NotificationSink};

/// Banner content while a warning is visible
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarningView {
    pub reason: String,
    /// `"total/threshold"`
    pub progress: String,
}

/// The transient violation banner. A newer warning replaces the current one
/// and restarts its display window.
#[derive(Debug, Default)]
pub struct WarningBanner {
    current: Option<(WarningView, Instant)>,
}

impl WarningBanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn show(&mut self, warning: &ViolationWarning) {
        let view = WarningView {
            reason: warning.reason.clone(),
            progress: warning.progress(),
        };
        self.current = Some((view, Instant::now() + warning.display_for));
    }

    /// When the visible warning should disappear
    pub fn deadline(&self) -> Option<Instant> {
        self.current.as_ref().map(|(_, until)| *until)
    }

    /// Clear the banner if its window has passed
    pub fn expire(&mut self, now: Instant) -> bool {
        match self.deadline() {
            Some(until) if now >= until => {
                self.current = None;
                true
            }
            _ => false,
        }
    }

    pub fn clear(&mut self) {
        self.current = None;
    }

    pub fn view(&self) -> Option<WarningView> {
        self.current.as_ref().map(|(view, _)| view.clone())
    }

    pub fn is_visible(&self) -> bool {
        self.current.is_some()
    }
}

/// Presentation adapter in front of a [`NotificationSink`]
pub struct Presenter {
    sink: Box<dyn NotificationSink>,
}

impl Presenter {
    pub fn new(sink: Box<dyn NotificationSink>) -> Self {
        Self { sink }
    }

    pub fn camera_activated(&mut self) {
        self.sink
            .notify(Notification::info("Camera activated", "Proctoring is now active."));
    }

    pub fn camera_denied(&mut self) {
        self.sink.notify(Notification::destructive(
            "Camera access denied",
            "Please enable camera access for proctoring. Face monitoring is disabled until the camera is available.",
        ));
    }

    pub fn fullscreen_unavailable(&mut self) {
        self.sink.notify(Notification::info(
            "Fullscreen unavailable",
            "Starting exam without fullscreen mode. Please stay focused on this tab.",
        ));
    }

    /// Face-specific alert raised alongside a debounced face violation
    pub fn face_alert(&mut self, event: &ViolationEvent, result: &FaceDetectionResult) {
        let notification = match event.source {
            ViolationSource::FaceMulti => Notification::destructive(
                "Multiple Faces Detected",
                format!(
                    "{} people detected in camera. Only the candidate should be visible.",
                    result.face_count
                ),
            ),
            ViolationSource::FaceNone => Notification::destructive(
                "No Face Detected",
                "Please ensure your face is visible in the camera.",
            ),
            _ => return,
        };
        self.sink.notify(notification);
    }

    pub fn violation_warning(&mut self, warning: &ViolationWarning) {
        self.sink.notify(Notification::destructive(
            format!("Violation Detected ({})", warning.progress()),
            warning.reason.clone(),
        ));
    }

    pub fn terminated(&mut self) {
        self.sink.notify(Notification::destructive(
            "Exam Terminated",
            "Maximum violations reached. Your exam has been auto-submitted.",
        ));
    }

    pub fn section_complete(&mut self, next_section: &str) {
        self.sink
            .notify(Notification::info("Section Complete", format!("Moving to {}", next_section)));
    }

    pub fn submitted(&mut self) {
        self.sink.notify(Notification::info(
            "Exam Submitted",
            "Your exam has been successfully submitted.",
        ));
    }
}
