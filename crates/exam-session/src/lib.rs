//! Exam Session Control
//!
//! Owns the candidate's exam state for one sitting:
//! - Per-section countdown with automatic section advance
//! - Question navigation, answers and review flags
//! - The single, idempotent submission handed to persistence

mod config;
mod controller;
mod persistence;
mod session;

pub use config::{ExamConfig, SectionConfig};
pub use controller::{SectionOutcome, SessionController, SubmitOutcome, TickOutcome};
pub use persistence::{MemoryPersistence, Persistence, SubmissionRecord, SubmitReason};
pub use session::{format_time, ExamSession, SessionPhase};

use thiserror::Error;

/// Session error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Exam is not in progress")]
    NotInProgress,

    #[error("Exam already started")]
    AlreadyStarted,

    #[error("Question {index} out of range (section has {count})")]
    QuestionOutOfRange { index: usize, count: usize },

    #[error("Question key must not be empty")]
    EmptyQuestionKey,

    #[error("No question with key {0}")]
    UnknownQuestion(String),

    #[error("Invalid exam configuration: {0}")]
    Config(String),

    /// The session is submitted but the record could not be stored
    #[error("Failed to persist submission: {0}")]
    Persistence(String),
}
