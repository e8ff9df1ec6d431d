//! In-process environment for tests and the demo binary

use std::sync::Arc;

use camera_capture::{Frame, FrameFeed, StopCounter, SyntheticProvider};
use environment_watch::{DisplayMode, SyntheticFullscreen, SyntheticNotifier, Visibility};
use exam_session::MemoryPersistence;

use crate::notify::MemorySink;
use crate::session::ProctorDeps;

const BACKGROUND: [u8; 3] = [10, 10, 200];
const SKIN: [u8; 3] = [200, 150, 120];
const FACE_SIDE: u32 = 100;

/// A webcam scene with `faces` face-sized skin patches on a blue backdrop
pub fn scene(width: u32, height: u32, faces: u32) -> Frame {
    let mut frame = Frame::filled(width, height, BACKGROUND);
    let slots = (width / (FACE_SIDE * 2)).max(1);
    for i in 0..faces.min(slots) {
        let x = FACE_SIDE / 2 + i * FACE_SIDE * 2;
        let y = height.saturating_sub(FACE_SIDE) / 2;
        frame.fill_rect(x, y, FACE_SIDE, FACE_SIDE, SKIN);
    }
    frame
}

/// Handles onto a synthetic host, kept after the deps move into a session
pub struct SyntheticEnvironment {
    pub feed: FrameFeed,
    pub camera_stops: StopCounter,
    pub display: SyntheticNotifier<DisplayMode>,
    pub visibility: SyntheticNotifier<Visibility>,
    pub persistence: MemoryPersistence,
    pub notifications: MemorySink,
}

impl SyntheticEnvironment {
    /// Build the host around `camera`
    pub fn build(camera: SyntheticProvider, fullscreen_supported: bool) -> (Self, ProctorDeps) {
        let display = SyntheticNotifier::<DisplayMode>::new();
        let visibility = SyntheticNotifier::<Visibility>::new();
        let persistence = MemoryPersistence::new();
        let notifications = MemorySink::new();

        let fullscreen = if fullscreen_supported {
            SyntheticFullscreen::new(display.clone())
        } else {
            SyntheticFullscreen::unsupported(display.clone())
        };

        let env = Self {
            feed: camera.feed(),
            camera_stops: camera.stop_counter(),
            display: display.clone(),
            visibility: visibility.clone(),
            persistence: persistence.clone(),
            notifications: notifications.clone(),
        };

        let deps = ProctorDeps {
            camera: Box::new(camera),
            fullscreen: Box::new(fullscreen),
            display: Arc::new(display),
            visibility: Arc::new(visibility),
            sink: Box::new(notifications),
            persistence: Box::new(persistence),
        };

        (env, deps)
    }

    /// A host with a working camera showing one candidate
    pub fn with_candidate() -> (Self, ProctorDeps) {
        Self::build(SyntheticProvider::new(vec![scene(640, 480, 1)]), true)
    }

    /// Simulate switching away from the exam tab and back
    pub fn switch_tab(&self) {
        self.visibility.emit(Visibility::Hidden);
        self.visibility.emit(Visibility::Visible);
    }

    pub fn show_faces(&self, faces: u32) {
        self.feed.set(scene(640, 480, faces));
    }
}
