//! Session controller state machine
//!
//! `NotStarted -> InProgress -> Submitted`. Submission is terminal and hands
//! exactly one record to persistence no matter how many callers race to it.

use chrono::Utc;
use std::collections::BTreeMap;
use tracing::{debug, error, info, warn};
use uuid::Uuid;
use violation_policy::ViolationSource;

use crate::config::{ExamConfig, SectionConfig};
use crate::persistence::{Persistence, SubmissionRecord, SubmitReason};
use crate::session::{ExamSession, SessionPhase};
use crate::SessionError;

/// Result of a submission request
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// This call performed the submission
    Submitted(SubmissionRecord),
    /// An earlier call already submitted; nothing happened
    AlreadySubmitted,
}

/// Result of one timer tick
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Not running
    Idle,
    Counting { time_left: u32 },
    SectionAdvanced { section_index: usize, section_name: String, time_left: u32 },
    Submitted(SubmitOutcome),
}

/// Result of completing a section by hand
#[derive(Debug, Clone, PartialEq)]
pub enum SectionOutcome {
    Advanced { section_index: usize, section_name: String },
    Submitted(SubmitOutcome),
}

/// Owns the [`ExamSession`] for one sitting
pub struct SessionController {
    config: ExamConfig,
    phase: SessionPhase,
    session: ExamSession,
    persistence: Box<dyn Persistence>,
    session_id: Uuid,
    violation_total: u32,
    violations: BTreeMap<ViolationSource, u32>,
}

impl SessionController {
    pub fn new(config: ExamConfig, persistence: Box<dyn Persistence>) -> Result<Self, SessionError> {
        config.validate()?;
        let session_id = Uuid::new_v4();
        info!(
            "Exam session {} created: {} sections, {} questions",
            session_id,
            config.sections.len(),
            config.total_questions()
        );
        let session = ExamSession {
            time_left_seconds: config.sections[0].duration_secs,
            ..Default::default()
        };
        Ok(Self {
            config,
            phase: SessionPhase::NotStarted,
            session,
            persistence,
            session_id,
            violation_total: 0,
            violations: BTreeMap::new(),
        })
    }

    /// Begin the first section
    pub fn start(&mut self) -> Result<(), SessionError> {
        if self.phase != SessionPhase::NotStarted {
            return Err(SessionError::AlreadyStarted);
        }
        self.phase = SessionPhase::InProgress;
        self.session.section_index = 0;
        self.session.question_index = 0;
        self.session.time_left_seconds = self.config.sections[0].duration_secs;
        info!("Exam session {} started", self.session_id);
        Ok(())
    }

    /// Advance the countdown by one second
    pub fn tick(&mut self) -> Result<TickOutcome, SessionError> {
        if self.phase != SessionPhase::InProgress {
            return Ok(TickOutcome::Idle);
        }

        self.session.time_left_seconds = self.session.time_left_seconds.saturating_sub(1);
        if self.session.time_left_seconds > 0 {
            return Ok(TickOutcome::Counting {
                time_left: self.session.time_left_seconds,
            });
        }

        match self.advance_section() {
            Some(section) => Ok(TickOutcome::SectionAdvanced {
                section_index: self.session.section_index,
                section_name: section.name,
                time_left: self.session.time_left_seconds,
            }),
            None => {
                info!("Time expired on the last section");
                self.submit(SubmitReason::TimeExpired).map(TickOutcome::Submitted)
            }
        }
    }

    /// Move to the next section, if any
    fn advance_section(&mut self) -> Option<SectionConfig> {
        let next = self.config.section(self.session.section_index + 1)?.clone();
        self.session.section_index += 1;
        self.session.question_index = 0;
        self.session.time_left_seconds = next.duration_secs;
        info!("Moving to section {} ({})", self.session.section_index, next.name);
        Some(next)
    }

    /// Finish the current section early ("Next Section", or submit on the last)
    pub fn complete_section(&mut self) -> Result<SectionOutcome, SessionError> {
        self.ensure_in_progress()?;
        match self.advance_section() {
            Some(section) => Ok(SectionOutcome::Advanced {
                section_index: self.session.section_index,
                section_name: section.name,
            }),
            None => self.submit(SubmitReason::Manual).map(SectionOutcome::Submitted),
        }
    }

    /// Submit the exam.
    ///
    /// Manual submissions require the exam to be in progress; forced ones
    /// do not. Only the first successful call reaches persistence. If
    /// persistence fails the session is still submitted and the error is
    /// returned.
    pub fn submit(&mut self, reason: SubmitReason) -> Result<SubmitOutcome, SessionError> {
        match self.phase {
            SessionPhase::Submitted => {
                debug!("Submit ({:?}) ignored, already submitted", reason);
                return Ok(SubmitOutcome::AlreadySubmitted);
            }
            SessionPhase::NotStarted if !reason.is_forced() => {
                return Err(SessionError::NotInProgress);
            }
            _ => {}
        }

        self.phase = SessionPhase::Submitted;
        self.session.submitted = true;

        let record = SubmissionRecord {
            session_id: self.session_id,
            exam_id: self.config.exam_id.clone(),
            reason,
            submitted_at: Utc::now(),
            section_reached: self.session.section_index,
            answers: self.session.answers.clone(),
            flagged: self.session.flagged.clone(),
            violation_total: self.violation_total,
            violations: self.violations.clone(),
        };

        metrics::counter!("proctor_submissions_total").increment(1);
        match self.persistence.persist(&record) {
            Ok(()) => {
                info!(
                    "Exam session {} submitted ({:?}), {} answers",
                    self.session_id,
                    reason,
                    record.answers.len()
                );
                Ok(SubmitOutcome::Submitted(record))
            }
            Err(e) => {
                error!("Exam session {} submitted but not persisted: {}", self.session_id, e);
                Err(e)
            }
        }
    }

    /// Record the violation tally that goes into the submission
    pub fn update_violations(&mut self, total: u32, by_source: BTreeMap<ViolationSource, u32>) {
        if self.phase == SessionPhase::Submitted {
            return;
        }
        self.violation_total = total;
        self.violations = by_source;
    }

    pub fn set_answer(&mut self, key: &str, text: &str) -> Result<(), SessionError> {
        self.ensure_in_progress()?;
        self.ensure_question(key)?;
        self.session.answers.insert(key.to_string(), text.to_string());
        Ok(())
    }

    /// Answer the question currently shown
    pub fn answer_current(&mut self, text: &str) -> Result<(), SessionError> {
        let key = self.current_question_key().ok_or(SessionError::NotInProgress)?;
        self.set_answer(&key, text)
    }

    /// Toggle the review flag; returns whether the question is now flagged
    pub fn toggle_flag(&mut self, key: &str) -> Result<bool, SessionError> {
        self.ensure_in_progress()?;
        self.ensure_question(key)?;
        if self.session.flagged.remove(key) {
            Ok(false)
        } else {
            self.session.flagged.insert(key.to_string());
            Ok(true)
        }
    }

    fn ensure_question(&self, key: &str) -> Result<(), SessionError> {
        if key.is_empty() {
            return Err(SessionError::EmptyQuestionKey);
        }
        if !self.config.has_question_key(key) {
            warn!("Rejecting unknown question key {}", key);
            return Err(SessionError::UnknownQuestion(key.to_string()));
        }
        Ok(())
    }

    pub fn goto_question(&mut self, index: usize) -> Result<(), SessionError> {
        self.ensure_in_progress()?;
        let count = self.current_section().question_count;
        if index >= count {
            warn!("Question {} requested, section has {}", index, count);
            return Err(SessionError::QuestionOutOfRange { index, count });
        }
        self.session.question_index = index;
        Ok(())
    }

    /// Returns false when already on the last question
    pub fn next_question(&mut self) -> Result<bool, SessionError> {
        self.ensure_in_progress()?;
        if self.session.question_index + 1 >= self.current_section().question_count {
            return Ok(false);
        }
        self.session.question_index += 1;
        Ok(true)
    }

    /// Returns false when already on the first question
    pub fn previous_question(&mut self) -> Result<bool, SessionError> {
        self.ensure_in_progress()?;
        if self.session.question_index == 0 {
            return Ok(false);
        }
        self.session.question_index -= 1;
        Ok(true)
    }

    fn ensure_in_progress(&self) -> Result<(), SessionError> {
        if self.phase == SessionPhase::InProgress {
            Ok(())
        } else {
            Err(SessionError::NotInProgress)
        }
    }

    pub fn current_section(&self) -> &SectionConfig {
        &self.config.sections[self.session.section_index]
    }

    pub fn current_question_key(&self) -> Option<String> {
        self.config
            .question_key(self.session.section_index, self.session.question_index)
    }

    pub fn answered_in_current_section(&self) -> usize {
        self.session.answered_in_section(&self.current_section().id)
    }

    pub fn is_last_section(&self) -> bool {
        self.session.section_index + 1 >= self.config.sections.len()
    }

    pub fn is_time_low(&self) -> bool {
        self.phase == SessionPhase::InProgress && self.session.time_left_seconds < self.config.low_time_secs
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn is_submitted(&self) -> bool {
        self.phase == SessionPhase::Submitted
    }

    /// Snapshot of the session state
    pub fn session(&self) -> &ExamSession {
        &self.session
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn config(&self) -> &ExamConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryPersistence;
    use crate::SectionConfig;

    struct FailingPersistence;

    impl Persistence for FailingPersistence {
        fn persist(&mut self, _record: &SubmissionRecord) -> Result<(), SessionError> {
            Err(SessionError::Persistence("disk full".into()))
        }
    }

    fn controller() -> (SessionController, MemoryPersistence) {
        let store = MemoryPersistence::new();
        let ctl = SessionController::new(ExamConfig::default(), Box::new(store.clone())).unwrap();
        (ctl, store)
    }

    fn started() -> (SessionController, MemoryPersistence) {
        let (mut ctl, store) = controller();
        ctl.start().unwrap();
        (ctl, store)
    }

    #[test]
    fn test_start() {
        let (mut ctl, _) = controller();
        assert_eq!(ctl.phase(), SessionPhase::NotStarted);
        assert_eq!(ctl.tick().unwrap(), TickOutcome::Idle);

        ctl.start().unwrap();
        assert_eq!(ctl.phase(), SessionPhase::InProgress);
        assert_eq!(ctl.session().time_left_seconds, 1800);
        assert_eq!(ctl.start(), Err(SessionError::AlreadyStarted));
    }

    #[test]
    fn test_section_advances_when_time_runs_out() {
        let (mut ctl, _) = started();
        ctl.next_question().unwrap();
        ctl.next_question().unwrap();

        for _ in 0..1799 {
            assert!(matches!(ctl.tick().unwrap(), TickOutcome::Counting { .. }));
        }
        let outcome = ctl.tick().unwrap();

        assert!(matches!(
            outcome,
            TickOutcome::SectionAdvanced { section_index: 1, time_left: 1500, .. }
        ));
        assert_eq!(ctl.session().section_index, 1);
        assert_eq!(ctl.session().time_left_seconds, 1500);
        assert_eq!(ctl.session().question_index, 0);
    }

    #[test]
    fn test_last_section_expiry_submits() {
        let (mut ctl, store) = started();
        let total: u32 = ExamConfig::default().sections.iter().map(|s| s.duration_secs).sum();

        let mut last = TickOutcome::Idle;
        for _ in 0..total {
            last = ctl.tick().unwrap();
        }

        match last {
            TickOutcome::Submitted(SubmitOutcome::Submitted(record)) => {
                assert_eq!(record.reason, SubmitReason::TimeExpired);
                assert_eq!(record.section_reached, 3);
            }
            other => panic!("expected submission, got {:?}", other),
        }
        assert!(ctl.is_submitted());
        assert!(ctl.session().submitted);
        assert_eq!(store.count(), 1);
        assert_eq!(ctl.tick().unwrap(), TickOutcome::Idle);
    }

    #[test]
    fn test_submit_is_idempotent() {
        let (mut ctl, store) = started();

        assert!(matches!(ctl.submit(SubmitReason::ViolationLimit).unwrap(), SubmitOutcome::Submitted(_)));
        assert_eq!(ctl.submit(SubmitReason::Manual).unwrap(), SubmitOutcome::AlreadySubmitted);
        assert_eq!(ctl.submit(SubmitReason::ViolationLimit).unwrap(), SubmitOutcome::AlreadySubmitted);

        assert_eq!(store.count(), 1);
        assert_eq!(store.records()[0].reason, SubmitReason::ViolationLimit);
    }

    #[test]
    fn test_manual_submit_requires_start() {
        let (mut ctl, store) = controller();
        assert_eq!(ctl.submit(SubmitReason::Manual), Err(SessionError::NotInProgress));
        assert_eq!(store.count(), 0);

        // Forced submission does not care
        assert!(matches!(ctl.submit(SubmitReason::ViolationLimit).unwrap(), SubmitOutcome::Submitted(_)));
    }

    #[test]
    fn test_mutation_rejected_after_submit() {
        let (mut ctl, _) = started();
        ctl.set_answer("aptitude-1", "3 hours").unwrap();
        ctl.submit(SubmitReason::Manual).unwrap();

        assert_eq!(ctl.set_answer("aptitude-1", "4 hours"), Err(SessionError::NotInProgress));
        assert_eq!(ctl.toggle_flag("aptitude-1"), Err(SessionError::NotInProgress));
        assert_eq!(ctl.next_question(), Err(SessionError::NotInProgress));
        assert_eq!(ctl.session().answers["aptitude-1"], "3 hours");
    }

    #[test]
    fn test_mutation_rejected_before_start() {
        let (mut ctl, _) = controller();
        assert_eq!(ctl.set_answer("aptitude-1", "x"), Err(SessionError::NotInProgress));
        assert_eq!(ctl.toggle_flag("aptitude-1"), Err(SessionError::NotInProgress));
    }

    #[test]
    fn test_answers_and_flags() {
        let (mut ctl, store) = started();
        ctl.answer_current("3 hours").unwrap();
        assert!(ctl.toggle_flag("aptitude-1").unwrap());
        assert!(ctl.toggle_flag("aptitude-2").unwrap());
        assert!(!ctl.toggle_flag("aptitude-2").unwrap());
        assert_eq!(ctl.set_answer("", "x"), Err(SessionError::EmptyQuestionKey));

        assert_eq!(ctl.answered_in_current_section(), 1);
        ctl.update_violations(2, BTreeMap::from([(ViolationSource::TabHidden, 2)]));
        ctl.submit(SubmitReason::Manual).unwrap();

        let record = &store.records()[0];
        assert_eq!(record.answers["aptitude-1"], "3 hours");
        assert_eq!(record.flagged.len(), 1);
        assert!(record.flagged.contains("aptitude-1"));
        assert_eq!(record.violation_total, 2);
        assert_eq!(record.violations[&ViolationSource::TabHidden], 2);
    }

    #[test]
    fn test_unknown_question_keys_rejected() {
        let (mut ctl, store) = started();
        assert_eq!(
            ctl.set_answer("nosuch-99", "x"),
            Err(SessionError::UnknownQuestion("nosuch-99".to_string()))
        );
        assert_eq!(
            ctl.toggle_flag("aptitude-11"),
            Err(SessionError::UnknownQuestion("aptitude-11".to_string()))
        );
        // Later sections are addressable before they are reached
        ctl.set_answer("coding-40", "fn main() {}").unwrap();
        ctl.submit(SubmitReason::Manual).unwrap();

        let record = &store.records()[0];
        assert_eq!(record.answers.len(), 1);
        assert!(record.answers.contains_key("coding-40"));
        assert!(record.flagged.is_empty());
    }

    #[test]
    fn test_navigation_bounds() {
        let (mut ctl, _) = started();
        assert!(!ctl.previous_question().unwrap());
        ctl.goto_question(9).unwrap();
        assert_eq!(ctl.current_question_key().as_deref(), Some("aptitude-10"));
        assert!(!ctl.next_question().unwrap());
        assert_eq!(
            ctl.goto_question(10),
            Err(SessionError::QuestionOutOfRange { index: 10, count: 10 })
        );
        assert!(ctl.previous_question().unwrap());
        assert_eq!(ctl.session().question_index, 8);
    }

    #[test]
    fn test_complete_section() {
        let (mut ctl, store) = started();
        for expected in 1..4 {
            match ctl.complete_section().unwrap() {
                SectionOutcome::Advanced { section_index, .. } => assert_eq!(section_index, expected),
                other => panic!("expected advance, got {:?}", other),
            }
        }
        assert!(ctl.is_last_section());
        assert_eq!(ctl.session().time_left_seconds, 3600);

        assert!(matches!(
            ctl.complete_section().unwrap(),
            SectionOutcome::Submitted(SubmitOutcome::Submitted(_))
        ));
        assert_eq!(store.count(), 1);
    }

    #[test]
    fn test_low_time() {
        let config = ExamConfig {
            sections: vec![SectionConfig::new("only", "Only", 301, 1)],
            ..Default::default()
        };
        let mut ctl = SessionController::new(config, Box::new(MemoryPersistence::new())).unwrap();
        ctl.start().unwrap();
        assert!(!ctl.is_time_low());
        ctl.tick().unwrap();
        ctl.tick().unwrap();
        assert!(ctl.is_time_low());
    }

    #[test]
    fn test_persistence_failure_still_submits() {
        let mut ctl = SessionController::new(ExamConfig::default(), Box::new(FailingPersistence)).unwrap();
        ctl.start().unwrap();

        assert!(matches!(ctl.submit(SubmitReason::Manual), Err(SessionError::Persistence(_))));
        assert!(ctl.is_submitted());
        assert_eq!(ctl.submit(SubmitReason::Manual).unwrap(), SubmitOutcome::AlreadySubmitted);
    }
}
