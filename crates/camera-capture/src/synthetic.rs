//! Scripted camera for tests and demos
//!
//! Frames queued on the shared feed are returned in order; once the queue is
//! drained the last frame keeps being returned, like a still webcam.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::stream::{CameraProvider, FrameSource};
use crate::{CameraConfig, CameraError, Frame};

#[derive(Debug, Default)]
struct FeedState {
    queue: VecDeque<Frame>,
    last: Option<Frame>,
    unplugged: bool,
}

/// Handle for pushing frames into a synthetic camera
#[derive(Debug, Clone, Default)]
pub struct FrameFeed {
    state: Arc<Mutex<FeedState>>,
}

impl FrameFeed {
    /// Queue a frame behind any pending ones
    pub fn push(&self, frame: Frame) {
        if let Ok(mut state) = self.state.lock() {
            state.queue.push_back(frame);
        }
    }

    /// Drop pending frames and show `frame` from now on
    pub fn set(&self, frame: Frame) {
        if let Ok(mut state) = self.state.lock() {
            state.queue.clear();
            state.last = Some(frame);
        }
    }

    /// Simulate the device going away; captures fail until [`FrameFeed::reconnect`]
    pub fn disconnect(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.unplugged = true;
        }
    }

    pub fn reconnect(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.unplugged = false;
        }
    }

    fn is_unplugged(&self) -> bool {
        self.state.lock().map(|s| s.unplugged).unwrap_or(true)
    }

    fn next(&self) -> Option<Frame> {
        let mut state = self.state.lock().ok()?;
        if let Some(frame) = state.queue.pop_front() {
            state.last = Some(frame.clone());
            return Some(frame);
        }
        state.last.clone()
    }

    fn peek_dimensions(&self) -> (u32, u32) {
        self.state
            .lock()
            .ok()
            .and_then(|s| s.queue.front().or(s.last.as_ref()).map(|f| (f.width, f.height)))
            .unwrap_or((0, 0))
    }
}

/// Counts how many times camera tracks were stopped
#[derive(Debug, Clone, Default)]
pub struct StopCounter(Arc<AtomicUsize>);

impl StopCounter {
    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    fn bump(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// An opened synthetic camera
pub struct SyntheticCamera {
    feed: FrameFeed,
    stops: StopCounter,
    stopped: bool,
    sequence: u32,
}

impl FrameSource for SyntheticCamera {
    fn dimensions(&self) -> (u32, u32) {
        if self.stopped {
            return (0, 0);
        }
        self.feed.peek_dimensions()
    }

    fn capture(&mut self) -> Result<Option<Frame>, CameraError> {
        if self.stopped {
            return Err(CameraError::NotInitialized);
        }
        if self.feed.is_unplugged() {
            return Err(CameraError::Capture("device disconnected".to_string()));
        }
        Ok(self.feed.next().map(|mut frame| {
            self.sequence = self.sequence.wrapping_add(1);
            frame.sequence = self.sequence;
            frame
        }))
    }

    fn stop(&mut self) {
        if !self.stopped {
            self.stopped = true;
            self.stops.bump();
            debug!("Synthetic camera tracks stopped");
        }
    }
}

/// Provider handing out synthetic cameras
pub struct SyntheticProvider {
    feed: FrameFeed,
    stops: StopCounter,
    acquisitions: Arc<AtomicUsize>,
    failures_left: usize,
    failure: CameraError,
}

impl SyntheticProvider {
    /// Provider whose camera plays back `frames`
    pub fn new(frames: Vec<Frame>) -> Self {
        let feed = FrameFeed::default();
        for frame in frames {
            feed.push(frame);
        }
        Self {
            feed,
            stops: StopCounter::default(),
            acquisitions: Arc::new(AtomicUsize::new(0)),
            failures_left: 0,
            failure: CameraError::NoDevice,
        }
    }

    /// Provider that always refuses camera access
    pub fn denied() -> Self {
        Self::new(vec![]).failing(usize::MAX, CameraError::PermissionDenied("user rejected prompt".to_string()))
    }

    /// Fail the next `times` acquisitions with `error`
    pub fn failing(mut self, times: usize, error: CameraError) -> Self {
        self.failures_left = times;
        self.failure = error;
        self
    }

    /// Handle for feeding frames after the provider is moved into a session
    pub fn feed(&self) -> FrameFeed {
        self.feed.clone()
    }

    /// Handle observing track stops
    pub fn stop_counter(&self) -> StopCounter {
        self.stops.clone()
    }

    /// Number of successful acquisitions so far
    pub fn acquisitions(&self) -> usize {
        self.acquisitions.load(Ordering::SeqCst)
    }
}

impl CameraProvider for SyntheticProvider {
    fn acquire(&mut self, _config: &CameraConfig) -> Result<Box<dyn FrameSource>, CameraError> {
        if self.failures_left > 0 {
            self.failures_left -= 1;
            return Err(self.failure.clone());
        }
        self.acquisitions.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(SyntheticCamera {
            feed: self.feed.clone(),
            stops: self.stops.clone(),
            stopped: false,
            sequence: 0,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plays_back_then_holds_last() {
        let mut provider = SyntheticProvider::new(vec![
            Frame::filled(2, 2, [1, 1, 1]),
            Frame::filled(2, 2, [2, 2, 2]),
        ]);
        let mut cam = provider.acquire(&CameraConfig::default()).unwrap();

        assert_eq!(cam.capture().unwrap().unwrap().rgb_at(0, 0), Some([1, 1, 1]));
        assert_eq!(cam.capture().unwrap().unwrap().rgb_at(0, 0), Some([2, 2, 2]));
        assert_eq!(cam.capture().unwrap().unwrap().rgb_at(0, 0), Some([2, 2, 2]));
    }

    #[test]
    fn test_empty_feed_yields_nothing() {
        let mut provider = SyntheticProvider::new(vec![]);
        let mut cam = provider.acquire(&CameraConfig::default()).unwrap();
        assert_eq!(cam.dimensions(), (0, 0));
        assert!(cam.capture().unwrap().is_none());
    }

    #[test]
    fn test_failing_then_succeeding() {
        let mut provider = SyntheticProvider::new(vec![]).failing(1, CameraError::NoDevice);
        assert!(provider.acquire(&CameraConfig::default()).is_err());
        assert!(provider.acquire(&CameraConfig::default()).is_ok());
        assert_eq!(provider.acquisitions(), 1);
    }

    #[test]
    fn test_disconnected_feed_fails_capture() {
        let mut provider = SyntheticProvider::new(vec![Frame::filled(2, 2, [0, 0, 0])]);
        let feed = provider.feed();
        let mut cam = provider.acquire(&CameraConfig::default()).unwrap();

        feed.disconnect();
        assert!(matches!(cam.capture(), Err(CameraError::Capture(_))));

        feed.reconnect();
        assert!(cam.capture().unwrap().is_some());
    }

    #[test]
    fn test_stopped_camera_refuses_capture() {
        let mut provider = SyntheticProvider::new(vec![Frame::filled(2, 2, [0, 0, 0])]);
        let mut cam = provider.acquire(&CameraConfig::default()).unwrap();
        cam.stop();
        cam.stop();
        assert!(cam.capture().is_err());
        assert_eq!(provider.stop_counter().get(), 1);
    }
}
