//! Submission hand-off to the persistence collaborator

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};
use uuid::Uuid;
use violation_policy::ViolationSource;

use crate::SessionError;

/// Why the exam was submitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmitReason {
    /// The candidate pressed submit
    Manual,
    /// The last section's timer ran out
    TimeExpired,
    /// The violation limit was reached
    ViolationLimit,
}

impl SubmitReason {
    /// Forced submissions bypass the in-progress check
    pub fn is_forced(&self) -> bool {
        !matches!(self, SubmitReason::Manual)
    }
}

/// Everything handed to persistence, exactly once per session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    pub session_id: Uuid,
    pub exam_id: String,
    pub reason: SubmitReason,
    pub submitted_at: DateTime<Utc>,
    pub section_reached: usize,
    pub answers: BTreeMap<String, String>,
    pub flagged: BTreeSet<String>,
    pub violation_total: u32,
    pub violations: BTreeMap<ViolationSource, u32>,
}

impl SubmissionRecord {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Stores the final submission
pub trait Persistence: Send {
    fn persist(&mut self, record: &SubmissionRecord) -> Result<(), SessionError>;
}

/// In-memory persistence, shared through clones
#[derive(Debug, Clone, Default)]
pub struct MemoryPersistence {
    records: Arc<Mutex<Vec<SubmissionRecord>>>,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<SubmissionRecord> {
        self.records.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn count(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }
}

impl Persistence for MemoryPersistence {
    fn persist(&mut self, record: &SubmissionRecord) -> Result<(), SessionError> {
        self.records
            .lock()
            .map_err(|e| SessionError::Persistence(e.to_string()))?
            .push(record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_serializes() {
        let mut violations = BTreeMap::new();
        violations.insert(ViolationSource::TabHidden, 2);
        let record = SubmissionRecord {
            session_id: Uuid::new_v4(),
            exam_id: "exam".into(),
            reason: SubmitReason::ViolationLimit,
            submitted_at: Utc::now(),
            section_reached: 1,
            answers: BTreeMap::new(),
            flagged: BTreeSet::new(),
            violation_total: 2,
            violations,
        };

        let json = record.to_json().unwrap();
        assert!(json.contains("\"ViolationLimit\""));
        assert!(json.contains("\"TAB_HIDDEN\":2"));

        let back: SubmissionRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_forced_reasons() {
        assert!(!SubmitReason::Manual.is_forced());
        assert!(SubmitReason::TimeExpired.is_forced());
        assert!(SubmitReason::ViolationLimit.is_forced());
    }
}
