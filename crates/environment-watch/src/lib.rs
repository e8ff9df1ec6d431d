//! Environment Watchers
//!
//! Watches the exam's host environment for signals that the candidate left
//! the exam surface:
//! - Leaving fullscreen mode
//! - Hiding the tab or minimizing the window
//!
//! Platform notifications arrive through the [`ChangeNotifier`] subscription
//! interface so hosts and tests can push synthetic events.

mod notifier;
mod watcher;

pub use notifier::{ChangeNotifier, Handler, Subscription, SyntheticNotifier};
pub use watcher::{FullscreenWatcher, VisibilityWatcher};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnvironmentError {
    #[error("Fullscreen not supported by host: {0}")]
    FullscreenUnsupported(String),
}

/// Display mode of the exam surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisplayMode {
    Fullscreen,
    Windowed,
}

/// Page visibility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Visibility {
    Visible,
    Hidden,
}

/// Host control over fullscreen mode
pub trait FullscreenControl: Send {
    /// Ask the host to enter fullscreen. Failure is expected on sandboxed hosts.
    fn request_fullscreen(&mut self) -> Result<(), EnvironmentError>;

    /// Leave fullscreen, if active
    fn exit_fullscreen(&mut self);
}

/// Fullscreen control that drives a [`SyntheticNotifier`]
pub struct SyntheticFullscreen {
    notifier: SyntheticNotifier<DisplayMode>,
    supported: bool,
}

impl SyntheticFullscreen {
    pub fn new(notifier: SyntheticNotifier<DisplayMode>) -> Self {
        Self {
            notifier,
            supported: true,
        }
    }

    /// A host that refuses fullscreen, like a sandboxed iframe
    pub fn unsupported(notifier: SyntheticNotifier<DisplayMode>) -> Self {
        Self {
            notifier,
            supported: false,
        }
    }
}

impl FullscreenControl for SyntheticFullscreen {
    fn request_fullscreen(&mut self) -> Result<(), EnvironmentError> {
        if !self.supported {
            return Err(EnvironmentError::FullscreenUnsupported("sandboxed host".to_string()));
        }
        self.notifier.emit(DisplayMode::Fullscreen);
        Ok(())
    }

    fn exit_fullscreen(&mut self) {
        if self.supported {
            self.notifier.emit(DisplayMode::Windowed);
        }
    }
}
