//! Exam session state

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Session lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SessionPhase {
    #[default]
    NotStarted,
    InProgress,
    /// Terminal
    Submitted,
}

/// Candidate progress through the exam
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamSession {
    pub section_index: usize,
    pub question_index: usize,
    pub time_left_seconds: u32,
    /// Question key to answer text
    pub answers: BTreeMap<String, String>,
    /// Question keys marked for review
    pub flagged: BTreeSet<String>,
    /// Write-once
    pub submitted: bool,
}

impl ExamSession {
    pub fn is_answered(&self, key: &str) -> bool {
        self.answers.get(key).is_some_and(|a| !a.is_empty())
    }

    pub fn is_flagged(&self, key: &str) -> bool {
        self.flagged.contains(key)
    }

    /// Answers whose key belongs to the section with `section_id`
    pub fn answered_in_section(&self, section_id: &str) -> usize {
        let prefix = format!("{}-", section_id);
        self.answers
            .iter()
            .filter(|(k, v)| k.starts_with(&prefix) && !v.is_empty())
            .count()
    }
}

/// Format seconds as `MM:SS`
pub fn format_time(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(1800), "30:00");
        assert_eq!(format_time(299), "04:59");
        assert_eq!(format_time(0), "00:00");
        assert_eq!(format_time(3600), "60:00");
    }

    #[test]
    fn test_answered_in_section() {
        let mut session = ExamSession::default();
        session.answers.insert("aptitude-1".into(), "3 hours".into());
        session.answers.insert("aptitude-2".into(), String::new());
        session.answers.insert("logical-11".into(), "30".into());

        assert_eq!(session.answered_in_section("aptitude"), 1);
        assert_eq!(session.answered_in_section("logical"), 1);
        assert!(session.is_answered("aptitude-1"));
        assert!(!session.is_answered("aptitude-2"));
    }
}
