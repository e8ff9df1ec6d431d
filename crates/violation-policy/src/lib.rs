//! Violation Escalation Policy
//!
//! Receives confirmed violations from every proctoring signal (face presence,
//! fullscreen, tab visibility), keeps one cumulative count, and decides when a
//! violation only warrants a warning and when the exam must be terminated.

mod aggregator;
mod config;
mod event;

pub use aggregator::{
    EscalationLevel, PolicyState, Termination, ViolationAggregator, ViolationOutcome,
    ViolationWarning,
};
pub use config::PolicyConfig;
pub use event::{ConsecutiveCounters, ViolationEvent, ViolationSource, ViolationState};

use thiserror::Error;

/// Policy configuration errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    #[error("{field} must be at least 1")]
    ZeroThreshold { field: &'static str },
}
