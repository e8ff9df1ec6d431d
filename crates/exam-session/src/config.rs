//! Exam layout configuration

use serde::{Deserialize, Serialize};

use crate::SessionError;

/// One timed section of the exam
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionConfig {
    /// Stable identifier used in question keys
    pub id: String,
    /// Display name
    pub name: String,
    /// Time allowed for the section (seconds)
    pub duration_secs: u32,
    /// Number of questions in the section
    pub question_count: usize,
}

impl SectionConfig {
    pub fn new(id: &str, name: &str, duration_secs: u32, question_count: usize) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            duration_secs,
            question_count,
        }
    }
}

/// Exam layout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExamConfig {
    pub exam_id: String,
    pub sections: Vec<SectionConfig>,
    /// Remaining time below which the timer is shown as low (seconds)
    pub low_time_secs: u32,
}

impl Default for ExamConfig {
    fn default() -> Self {
        Self {
            exam_id: "placement-assessment".to_string(),
            sections: vec![
                SectionConfig::new("aptitude", "Aptitude", 1800, 10),
                SectionConfig::new("logical", "Logical Reasoning", 1500, 10),
                SectionConfig::new("technical", "Technical MCQ", 2100, 15),
                SectionConfig::new("coding", "Coding", 3600, 5),
            ],
            low_time_secs: 300,
        }
    }
}

impl ExamConfig {
    pub fn validate(&self) -> Result<(), SessionError> {
        if self.sections.is_empty() {
            return Err(SessionError::Config("exam has no sections".into()));
        }
        for section in &self.sections {
            if section.duration_secs == 0 {
                return Err(SessionError::Config(format!("section {} has no time", section.id)));
            }
            if section.question_count == 0 {
                return Err(SessionError::Config(format!("section {} has no questions", section.id)));
            }
        }
        Ok(())
    }

    pub fn section(&self, index: usize) -> Option<&SectionConfig> {
        self.sections.get(index)
    }

    /// Question numbers run on across sections, starting at 1
    pub fn question_number(&self, section: usize, question: usize) -> usize {
        let before: usize = self.sections[..section.min(self.sections.len())]
            .iter()
            .map(|s| s.question_count)
            .sum();
        before + question + 1
    }

    /// Key under which a question's answer and flag are stored
    pub fn question_key(&self, section: usize, question: usize) -> Option<String> {
        let s = self.sections.get(section)?;
        if question >= s.question_count {
            return None;
        }
        Some(format!("{}-{}", s.id, self.question_number(section, question)))
    }

    /// Whether `key` names a question of this exam
    pub fn has_question_key(&self, key: &str) -> bool {
        self.sections.iter().enumerate().any(|(section, s)| {
            (0..s.question_count).any(|question| self.question_key(section, question).as_deref() == Some(key))
        })
    }

    pub fn total_questions(&self) -> usize {
        self.sections.iter().map(|s| s.question_count).sum()
    }

    pub fn total_duration_secs(&self) -> u64 {
        self.sections.iter().map(|s| s.duration_secs as u64).sum()
    }
}
