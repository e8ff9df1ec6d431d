//! Camera acquisition and scoped stream ownership

use tracing::{debug, info, warn};

use crate::{CameraConfig, CameraError, Frame};

/// A live source of frames (one opened camera)
pub trait FrameSource: Send {
    /// Current frame dimensions; `(0, 0)` while the stream has no metadata yet
    fn dimensions(&self) -> (u32, u32);

    /// Draw the current frame. `Ok(None)` when nothing is available yet.
    fn capture(&mut self) -> Result<Option<Frame>, CameraError>;

    /// Stop every underlying track. Must be idempotent.
    fn stop(&mut self);
}

/// Opens cameras on behalf of the proctoring session.
///
/// On failure an implementation must stop any track it already opened before
/// returning the error, so a failed acquisition never leaks a live camera.
pub trait CameraProvider: Send {
    fn acquire(&mut self, config: &CameraConfig) -> Result<Box<dyn FrameSource>, CameraError>;
}

/// Scoped owner of an acquired camera.
///
/// The tracks are stopped on [`CameraStream::release`] or when the guard is
/// dropped, whichever happens first.
pub struct CameraStream {
    source: Option<Box<dyn FrameSource>>,
}

impl CameraStream {
    /// Acquire a camera through the provider
    pub fn open(provider: &mut dyn CameraProvider, config: &CameraConfig) -> Result<Self, CameraError> {
        match provider.acquire(config) {
            Ok(source) => {
                info!("Camera acquired ({}x{} requested)", config.width, config.height);
                Ok(Self {
                    source: Some(source),
                })
            }
            Err(e) => {
                warn!("Camera acquisition failed: {}", e);
                Err(e)
            }
        }
    }

    /// A guard holding nothing (camera unavailable)
    pub fn empty() -> Self {
        Self { source: None }
    }

    /// Whether a live camera is held
    pub fn is_active(&self) -> bool {
        self.source.is_some()
    }

    /// Current dimensions of the held camera
    pub fn dimensions(&self) -> (u32, u32) {
        self.source.as_ref().map(|s| s.dimensions()).unwrap_or((0, 0))
    }

    /// Capture the current frame, if a camera is held
    pub fn capture(&mut self) -> Result<Option<Frame>, CameraError> {
        match self.source.as_mut() {
            Some(source) => source.capture(),
            None => Err(CameraError::NotInitialized),
        }
    }

    /// Stop all tracks and drop the source. Safe to call repeatedly.
    pub fn release(&mut self) {
        if let Some(mut source) = self.source.take() {
            source.stop();
            info!("Camera released");
        } else {
            debug!("Camera release requested with no active stream");
        }
    }
}

impl Drop for CameraStream {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic::SyntheticProvider;

    #[test]
    fn test_release_on_drop() {
        let mut provider = SyntheticProvider::new(vec![Frame::filled(4, 4, [0, 0, 0])]);
        let stops = provider.stop_counter();
        {
            let stream = CameraStream::open(&mut provider, &CameraConfig::default()).unwrap();
            assert!(stream.is_active());
        }
        assert_eq!(stops.get(), 1);
    }

    #[test]
    fn test_release_is_idempotent() {
        let mut provider = SyntheticProvider::new(vec![]);
        let stops = provider.stop_counter();
        let mut stream = CameraStream::open(&mut provider, &CameraConfig::default()).unwrap();

        stream.release();
        stream.release();
        drop(stream);

        assert_eq!(stops.get(), 1);
    }

    #[test]
    fn test_failed_acquisition() {
        let mut provider = SyntheticProvider::denied();
        let result = CameraStream::open(&mut provider, &CameraConfig::default());
        assert!(matches!(result, Err(CameraError::PermissionDenied(_))));
    }

    #[test]
    fn test_empty_stream_capture() {
        let mut stream = CameraStream::empty();
        assert!(!stream.is_active());
        assert_eq!(stream.dimensions(), (0, 0));
        assert_eq!(stream.capture().unwrap_err(), CameraError::NotInitialized);
    }
}
