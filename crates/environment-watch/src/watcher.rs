//! Edge-triggered environment watchers

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use violation_policy::ViolationEvent;

use crate::notifier::{ChangeNotifier, Subscription};
use crate::{DisplayMode, Visibility};

/// Raises a violation each time the exam leaves fullscreen
pub struct FullscreenWatcher {
    armed: Arc<AtomicBool>,
    _subscription: Subscription,
}

impl FullscreenWatcher {
    /// Subscribe to display mode changes.
    ///
    /// `initial` is the mode at attach time; leaving fullscreen only counts if
    /// fullscreen was actually entered.
    pub fn attach(
        notifier: &dyn ChangeNotifier<DisplayMode>,
        initial: DisplayMode,
        violations: mpsc::UnboundedSender<ViolationEvent>,
    ) -> Self {
        let armed = Arc::new(AtomicBool::new(true));
        let gate = Arc::clone(&armed);
        let mut current = initial;

        let subscription = notifier.register(Box::new(move |mode: DisplayMode| {
            let previous = std::mem::replace(&mut current, mode);
            if previous == DisplayMode::Fullscreen && mode == DisplayMode::Windowed {
                if !gate.load(Ordering::SeqCst) {
                    debug!("Fullscreen exit ignored, watcher disarmed");
                    return;
                }
                warn!("Exam left fullscreen mode");
                if violations.send(ViolationEvent::fullscreen_exit()).is_err() {
                    debug!("Violation channel closed, dropping fullscreen exit");
                }
            }
        }));

        Self {
            armed,
            _subscription: subscription,
        }
    }

    /// Stop raising violations without detaching
    pub fn disarm(&self) {
        self.armed.store(false, Ordering::SeqCst);
    }

    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::SeqCst)
    }
}

/// Raises a violation each time the exam tab becomes hidden
pub struct VisibilityWatcher {
    armed: Arc<AtomicBool>,
    _subscription: Subscription,
}

impl VisibilityWatcher {
    pub fn attach(
        notifier: &dyn ChangeNotifier<Visibility>,
        violations: mpsc::UnboundedSender<ViolationEvent>,
    ) -> Self {
        let armed = Arc::new(AtomicBool::new(true));
        let gate = Arc::clone(&armed);
        let mut current = Visibility::Visible;

        let subscription = notifier.register(Box::new(move |visibility: Visibility| {
            let previous = std::mem::replace(&mut current, visibility);
            if previous == Visibility::Visible && visibility == Visibility::Hidden {
                if !gate.load(Ordering::SeqCst) {
                    return;
                }
                warn!("Exam tab hidden");
                if violations.send(ViolationEvent::tab_hidden()).is_err() {
                    debug!("Violation channel closed, dropping tab hidden");
                }
            }
        }));

        Self {
            armed,
            _subscription: subscription,
        }
    }

    pub fn disarm(&self) {
        self.armed.store(false, Ordering::SeqCst);
    }

    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::SeqCst)
    }
}
