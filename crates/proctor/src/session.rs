//! Proctoring session orchestrator
//!
//! Everything that mutates session state runs on one task: the exam timer,
//! face detection cycles, environment violations, candidate commands and the
//! warning banner expiry are multiplexed by a single `select!` loop, so no
//! two handlers ever interleave.

use std::sync::Arc;

use camera_capture::{CameraConfig, CameraError, CameraProvider, CameraStream};
use environment_watch::{
    ChangeNotifier, DisplayMode, FullscreenControl, FullscreenWatcher, Visibility, VisibilityWatcher,
};
use exam_session::{
    format_time, ExamSession, Persistence, SectionOutcome, SessionController, SessionError,
    SessionPhase, SubmissionRecord, SubmitOutcome, SubmitReason, TickOutcome,
};
use face_presence::{FaceDetectionResult, FacePresenceDetector, FaceStatus, TemporalDebouncer};
use serde::Serialize;
use session_scheduler::{CancelToken, Ticker};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{self, Instant};
use tracing::{debug, error, info, warn};
use uuid::Uuid;
use violation_policy::{
    EscalationLevel, PolicyState, ViolationAggregator, ViolationEvent, ViolationOutcome, ViolationState,
};

use crate::config::ProctorConfig;
use crate::notify::NotificationSink;
use crate::presenter::{Presenter, WarningBanner, WarningView};
use crate::ProctorError;

const COMMAND_QUEUE: usize = 32;
/// Consecutive failed captures after which the camera is treated as lost
const CAPTURE_FAILURE_LIMIT: u32 = 5;

/// Host services a session runs against
pub struct ProctorDeps {
    pub camera: Box<dyn CameraProvider>,
    pub fullscreen: Box<dyn FullscreenControl>,
    pub display: Arc<dyn ChangeNotifier<DisplayMode>>,
    pub visibility: Arc<dyn ChangeNotifier<Visibility>>,
    pub sink: Box<dyn NotificationSink>,
    pub persistence: Box<dyn Persistence>,
}

/// Webcam state as seen by the candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CameraStatus {
    /// Not requested yet
    Pending,
    Active,
    /// Access failed; face monitoring is off until a retry succeeds
    Unavailable,
    /// Stopped at the end of the session
    Released,
}

/// Read-only view published after every handler
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProctorSnapshot {
    pub session_id: Uuid,
    pub phase: SessionPhase,
    pub session: ExamSession,
    pub section_name: String,
    pub question_key: Option<String>,
    pub answered_in_section: usize,
    /// `MM:SS`
    pub time_label: String,
    pub time_low: bool,
    pub face: FaceDetectionResult,
    pub face_status: FaceStatus,
    pub violations: ViolationState,
    pub escalation: EscalationLevel,
    pub policy: PolicyState,
    pub camera: CameraStatus,
    pub warning: Option<WarningView>,
}

/// How a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionEnd {
    Submitted(SubmitReason),
    /// Left before submission (navigation away or cancel)
    Abandoned,
}

/// Summary returned by [`Proctor::run`]
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub session_id: Uuid,
    pub end: SessionEnd,
    /// `None` when abandoned or when persistence failed
    pub record: Option<SubmissionRecord>,
    pub violations: ViolationState,
    pub detection_cycles: u64,
}

/// Candidate and host requests delivered to the session loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProctorCommand {
    Submit,
    SetAnswer { key: String, text: String },
    AnswerCurrent(String),
    ToggleFlag(String),
    GotoQuestion(usize),
    NextQuestion,
    PreviousQuestion,
    CompleteSection,
    RetryCamera,
    /// Leave the exam without submitting
    Shutdown,
}

struct Request {
    command: ProctorCommand,
    reply: oneshot::Sender<Result<(), ProctorError>>,
}

/// Cloneable handle for driving a running session
#[derive(Clone)]
pub struct ProctorHandle {
    commands: mpsc::Sender<Request>,
    snapshots: watch::Receiver<ProctorSnapshot>,
    cancel: CancelToken,
}

impl ProctorHandle {
    async fn send(&self, command: ProctorCommand) -> Result<(), ProctorError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Request { command, reply })
            .await
            .map_err(|_| ProctorError::Closed)?;
        response.await.map_err(|_| ProctorError::Closed)?
    }

    /// Submit the exam. A no-op once the session has ended.
    pub async fn submit(&self) -> Result<(), ProctorError> {
        match self.send(ProctorCommand::Submit).await {
            Err(ProctorError::Closed) => Ok(()),
            other => other,
        }
    }

    pub async fn set_answer(&self, key: &str, text: &str) -> Result<(), ProctorError> {
        self.send(ProctorCommand::SetAnswer {
            key: key.to_string(),
            text: text.to_string(),
        })
        .await
    }

    pub async fn answer_current(&self, text: &str) -> Result<(), ProctorError> {
        self.send(ProctorCommand::AnswerCurrent(text.to_string())).await
    }

    pub async fn toggle_flag(&self, key: &str) -> Result<(), ProctorError> {
        self.send(ProctorCommand::ToggleFlag(key.to_string())).await
    }

    pub async fn goto_question(&self, index: usize) -> Result<(), ProctorError> {
        self.send(ProctorCommand::GotoQuestion(index)).await
    }

    pub async fn next_question(&self) -> Result<(), ProctorError> {
        self.send(ProctorCommand::NextQuestion).await
    }

    pub async fn previous_question(&self) -> Result<(), ProctorError> {
        self.send(ProctorCommand::PreviousQuestion).await
    }

    pub async fn complete_section(&self) -> Result<(), ProctorError> {
        self.send(ProctorCommand::CompleteSection).await
    }

    /// Ask for camera access again after a failure
    pub async fn retry_camera(&self) -> Result<(), ProctorError> {
        self.send(ProctorCommand::RetryCamera).await
    }

    /// Leave without submitting; releases the camera and detaches watchers
    pub async fn shutdown(&self) -> Result<(), ProctorError> {
        match self.send(ProctorCommand::Shutdown).await {
            Err(ProctorError::Closed) => Ok(()),
            other => other,
        }
    }

    /// Stop the session from outside the command queue
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn snapshot(&self) -> ProctorSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ProctorSnapshot> {
        self.snapshots.clone()
    }
}

/// A proctored exam sitting, ready to run
pub struct Proctor {
    session: Session,
    violations: mpsc::UnboundedReceiver<ViolationEvent>,
    commands: mpsc::Receiver<Request>,
    snapshots: watch::Sender<ProctorSnapshot>,
}

impl Proctor {
    pub fn new(config: ProctorConfig, deps: ProctorDeps) -> Result<(Self, ProctorHandle), ProctorError> {
        config.validate()?;

        let detector = FacePresenceDetector::new(config.detector.clone())?;
        let aggregator = ViolationAggregator::new(config.policy.clone());
        let debouncer = TemporalDebouncer::from_policy(&config.policy);
        let controller = SessionController::new(config.exam.clone(), deps.persistence)?;

        let (violations_tx, violations) = mpsc::unbounded_channel();
        let (commands_tx, commands) = mpsc::channel(COMMAND_QUEUE);
        let cancel = CancelToken::new();

        let session = Session {
            config,
            controller,
            aggregator,
            detector,
            debouncer,
            camera_provider: deps.camera,
            camera: CameraStream::empty(),
            camera_status: CameraStatus::Pending,
            capture_failures: 0,
            fullscreen: deps.fullscreen,
            fullscreen_entered: false,
            display: deps.display,
            visibility: deps.visibility,
            fullscreen_watcher: None,
            visibility_watcher: None,
            presenter: Presenter::new(deps.sink),
            banner: WarningBanner::new(),
            face: FaceDetectionResult::default(),
            violations_tx,
            cancel: cancel.clone(),
            record: None,
            end_reason: None,
            torn_down: false,
        };

        let (snapshots, snapshots_rx) = watch::channel(session.snapshot());
        let handle = ProctorHandle {
            commands: commands_tx,
            snapshots: snapshots_rx,
            cancel,
        };

        Ok((
            Self {
                session,
                violations,
                commands,
                snapshots,
            },
            handle,
        ))
    }

    /// Start the exam and proctor it until submission, shutdown or cancel
    pub async fn run(self) -> Result<SessionReport, ProctorError> {
        let Proctor {
            mut session,
            mut violations,
            mut commands,
            snapshots,
        } = self;

        if let Err(e) = session.begin() {
            session.teardown();
            snapshots.send_replace(session.snapshot());
            return Err(e);
        }
        snapshots.send_replace(session.snapshot());

        let cadence = session.config.cadence.clone();
        let mut timer = Ticker::new("exam-timer", cadence.timer_period(), &session.cancel);
        let mut detection = Ticker::new("face-detection", cadence.detection_period(), &session.cancel);
        let cancel = session.cancel.clone();

        let end = loop {
            if session.controller.is_submitted() {
                break SessionEnd::Submitted(session.end_reason.unwrap_or(SubmitReason::Manual));
            }
            let banner_deadline = session.banner.deadline();

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("Proctoring cancelled");
                    break SessionEnd::Abandoned;
                }
                Some(event) = violations.recv() => session.on_violation(event),
                Some(request) = commands.recv() => {
                    if session.on_request(request) {
                        break SessionEnd::Abandoned;
                    }
                }
                Some(_) = timer.tick() => session.on_timer_tick(),
                Some(_) = detection.tick(), if session.camera_status == CameraStatus::Active => {
                    session.on_detection_cycle();
                }
                _ = time::sleep_until(banner_deadline.unwrap_or_else(Instant::now)), if banner_deadline.is_some() => {
                    session.banner.expire(Instant::now());
                }
            }

            snapshots.send_replace(session.snapshot());
        };

        session.teardown();

        // Requests that raced the end of the session
        commands.close();
        while let Ok(request) = commands.try_recv() {
            let reply = match request.command {
                ProctorCommand::Submit | ProctorCommand::Shutdown => Ok(()),
                _ => Err(ProctorError::Closed),
            };
            let _ = request.reply.send(reply);
        }

        snapshots.send_replace(session.snapshot());
        info!(
            "Proctoring session {} ended: {:?} after {} detection cycles",
            session.controller.session_id(),
            end,
            session.detector.cycles()
        );

        Ok(SessionReport {
            session_id: session.controller.session_id(),
            end,
            record: session.record.take(),
            violations: session.aggregator.snapshot(session.debouncer.counters()),
            detection_cycles: session.detector.cycles(),
        })
    }
}

struct Session {
    config: ProctorConfig,
    controller: SessionController,
    aggregator: ViolationAggregator,
    detector: FacePresenceDetector,
    debouncer: TemporalDebouncer,
    camera_provider: Box<dyn CameraProvider>,
    camera: CameraStream,
    camera_status: CameraStatus,
    capture_failures: u32,
    fullscreen: Box<dyn FullscreenControl>,
    fullscreen_entered: bool,
    display: Arc<dyn ChangeNotifier<DisplayMode>>,
    visibility: Arc<dyn ChangeNotifier<Visibility>>,
    fullscreen_watcher: Option<FullscreenWatcher>,
    visibility_watcher: Option<VisibilityWatcher>,
    presenter: Presenter,
    banner: WarningBanner,
    face: FaceDetectionResult,
    violations_tx: mpsc::UnboundedSender<ViolationEvent>,
    cancel: CancelToken,
    record: Option<SubmissionRecord>,
    end_reason: Option<SubmitReason>,
    torn_down: bool,
}

impl Session {
    /// Camera, fullscreen, then the exam itself. Only the last can fail.
    fn begin(&mut self) -> Result<(), ProctorError> {
        info!("Starting proctored session {}", self.controller.session_id());

        if let Err(e) = self.acquire_camera() {
            debug!("Continuing without camera: {}", e);
        }

        let initial = match self.fullscreen.request_fullscreen() {
            Ok(()) => {
                self.fullscreen_entered = true;
                DisplayMode::Fullscreen
            }
            Err(e) => {
                warn!("Fullscreen request failed: {}", e);
                self.presenter.fullscreen_unavailable();
                DisplayMode::Windowed
            }
        };

        self.controller.start()?;

        self.fullscreen_watcher = Some(FullscreenWatcher::attach(
            self.display.as_ref(),
            initial,
            self.violations_tx.clone(),
        ));
        self.visibility_watcher = Some(VisibilityWatcher::attach(
            self.visibility.as_ref(),
            self.violations_tx.clone(),
        ));
        Ok(())
    }

    fn acquire_camera(&mut self) -> Result<(), CameraError> {
        let camera_config = CameraConfig::from(&self.config.camera);
        self.debouncer.reset();
        match CameraStream::open(self.camera_provider.as_mut(), &camera_config) {
            Ok(stream) => {
                self.camera = stream;
                self.camera_status = CameraStatus::Active;
                self.capture_failures = 0;
                self.presenter.camera_activated();
                Ok(())
            }
            Err(e) => {
                warn!("Camera unavailable, face monitoring disabled: {}", e);
                metrics::counter!("proctor_camera_failures_total").increment(1);
                self.camera_status = CameraStatus::Unavailable;
                self.face = FaceDetectionResult::default();
                self.presenter.camera_denied();
                Err(e)
            }
        }
    }

    fn on_detection_cycle(&mut self) {
        let (width, height) = self.camera.dimensions();
        if width == 0 || height == 0 {
            debug!("Camera has no frame dimensions yet");
            return;
        }

        let frame = match self.camera.capture() {
            Ok(Some(frame)) => {
                self.capture_failures = 0;
                frame
            }
            Ok(None) => {
                debug!("No frame available yet");
                return;
            }
            Err(e) => {
                self.on_capture_failure(e);
                return;
            }
        };

        let Some(result) = self.detector.detect(&frame) else {
            return;
        };
        self.face = result.clone();

        if let Some(event) = self.debouncer.observe(&result) {
            self.presenter.face_alert(&event, &result);
            self.on_violation(event);
        }
    }

    fn on_capture_failure(&mut self, error: CameraError) {
        self.capture_failures += 1;
        debug!(
            "Frame capture failed ({}/{}): {}",
            self.capture_failures, CAPTURE_FAILURE_LIMIT, error
        );
        if self.capture_failures < CAPTURE_FAILURE_LIMIT {
            return;
        }

        warn!("Camera lost after {} failed captures: {}", self.capture_failures, error);
        metrics::counter!("proctor_camera_failures_total").increment(1);
        self.capture_failures = 0;
        self.camera.release();
        self.camera_status = CameraStatus::Unavailable;
        self.face = FaceDetectionResult::default();
        self.debouncer.reset();
        self.presenter.camera_denied();
    }

    fn on_violation(&mut self, event: ViolationEvent) {
        let outcome = self.aggregator.record(event);
        self.controller
            .update_violations(self.aggregator.total(), self.aggregator.breakdown());

        match outcome {
            ViolationOutcome::Warn(warning) => {
                self.presenter.violation_warning(&warning);
                self.banner.show(&warning);
            }
            ViolationOutcome::Terminate(termination) => {
                error!(
                    "Terminating exam after {} violations, last: {}",
                    termination.total, termination.event.reason
                );
                self.banner.clear();
                self.presenter.terminated();
                let result = self.controller.submit(SubmitReason::ViolationLimit);
                if let Err(e) = self.finish(SubmitReason::ViolationLimit, result) {
                    error!("Forced submission failed: {}", e);
                }
            }
            ViolationOutcome::Ignored => {}
        }
    }

    fn on_timer_tick(&mut self) {
        match self.controller.tick() {
            Ok(TickOutcome::SectionAdvanced { section_name, .. }) => {
                self.presenter.section_complete(&section_name);
            }
            Ok(TickOutcome::Submitted(outcome)) => {
                if let Err(e) = self.finish(SubmitReason::TimeExpired, Ok(outcome)) {
                    error!("Timed submission failed: {}", e);
                }
            }
            Ok(TickOutcome::Counting { .. }) | Ok(TickOutcome::Idle) => {}
            Err(e) => {
                if let Err(e) = self.finish(SubmitReason::TimeExpired, Err(e)) {
                    error!("Timed submission failed: {}", e);
                }
            }
        }
    }

    /// Returns `true` when the loop should stop
    fn on_request(&mut self, request: Request) -> bool {
        let Request { command, reply } = request;
        debug!(?command, "Command received");

        let mut stop = false;
        let result = match command {
            ProctorCommand::Submit => {
                let result = self.controller.submit(SubmitReason::Manual);
                self.finish(SubmitReason::Manual, result)
            }
            ProctorCommand::SetAnswer { key, text } => {
                self.controller.set_answer(&key, &text).map_err(Into::into)
            }
            ProctorCommand::AnswerCurrent(text) => self.controller.answer_current(&text).map_err(Into::into),
            ProctorCommand::ToggleFlag(key) => self
                .controller
                .toggle_flag(&key)
                .map(|flagged| debug!("Question {} flagged: {}", key, flagged))
                .map_err(Into::into),
            ProctorCommand::GotoQuestion(index) => self.controller.goto_question(index).map_err(Into::into),
            ProctorCommand::NextQuestion => self.controller.next_question().map(|_| ()).map_err(Into::into),
            ProctorCommand::PreviousQuestion => {
                self.controller.previous_question().map(|_| ()).map_err(Into::into)
            }
            ProctorCommand::CompleteSection => self.complete_section(),
            ProctorCommand::RetryCamera => self.retry_camera(),
            ProctorCommand::Shutdown => {
                info!("Leaving exam without submitting");
                stop = true;
                Ok(())
            }
        };

        if let Err(e) = &result {
            warn!("Command rejected: {}", e);
        }
        // The requester may have stopped waiting
        let _ = reply.send(result);
        stop
    }

    fn complete_section(&mut self) -> Result<(), ProctorError> {
        match self.controller.complete_section() {
            Ok(SectionOutcome::Advanced { section_name, .. }) => {
                self.presenter.section_complete(&section_name);
                Ok(())
            }
            Ok(SectionOutcome::Submitted(outcome)) => self.finish(SubmitReason::Manual, Ok(outcome)),
            Err(e) => self.finish(SubmitReason::Manual, Err(e)),
        }
    }

    fn retry_camera(&mut self) -> Result<(), ProctorError> {
        if self.camera_status == CameraStatus::Active {
            debug!("Camera already active");
            return Ok(());
        }
        info!("Retrying camera access");
        self.acquire_camera()?;
        Ok(())
    }

    /// Handle the result of a submission attempt
    fn finish(
        &mut self,
        reason: SubmitReason,
        result: Result<SubmitOutcome, SessionError>,
    ) -> Result<(), ProctorError> {
        match result {
            Ok(SubmitOutcome::Submitted(record)) => {
                self.end_reason = Some(record.reason);
                self.record = Some(record);
                self.presenter.submitted();
                self.teardown();
                Ok(())
            }
            Ok(SubmitOutcome::AlreadySubmitted) => Ok(()),
            Err(e) if self.controller.is_submitted() => {
                // Submitted but not stored; the session is still over
                self.end_reason = Some(reason);
                self.teardown();
                Err(e.into())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Stop timers, detach watchers, leave fullscreen and release the camera. Idempotent.
    fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;

        self.cancel.cancel();
        if let Some(watcher) = self.fullscreen_watcher.take() {
            watcher.disarm();
        }
        if let Some(watcher) = self.visibility_watcher.take() {
            watcher.disarm();
        }
        if self.fullscreen_entered {
            self.fullscreen.exit_fullscreen();
        }
        self.camera.release();
        self.camera_status = CameraStatus::Released;
        self.banner.clear();
        debug!("Session resources released");
    }

    fn snapshot(&self) -> ProctorSnapshot {
        let session = self.controller.session().clone();
        ProctorSnapshot {
            session_id: self.controller.session_id(),
            phase: self.controller.phase(),
            section_name: self.controller.current_section().name.clone(),
            question_key: self.controller.current_question_key(),
            answered_in_section: self.controller.answered_in_current_section(),
            time_label: format_time(session.time_left_seconds),
            time_low: self.controller.is_time_low(),
            session,
            face: self.face.clone(),
            face_status: self.face.status(),
            violations: self.aggregator.snapshot(self.debouncer.counters()),
            escalation: self.aggregator.escalation_level(),
            policy: self.aggregator.state(),
            camera: self.camera_status,
            warning: self.banner.view(),
        }
    }
}
