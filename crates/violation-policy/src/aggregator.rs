//! Violation aggregator state machine

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::PolicyConfig;
use crate::event::{ConsecutiveCounters, ViolationEvent, ViolationSource, ViolationState};

/// Aggregator lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PolicyState {
    #[default]
    Active,
    /// Entered exactly once; there is no way back
    Terminated,
}

/// Coarse indicator of how close the candidate is to termination
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EscalationLevel {
    Clear,
    Caution,
    Danger,
}

/// A violation below the termination threshold
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViolationWarning {
    pub reason: String,
    pub source: ViolationSource,
    pub total: u32,
    pub threshold: u32,
    /// How long the warning should stay visible
    pub display_for: Duration,
}

impl ViolationWarning {
    /// `"total/threshold"`
    pub fn progress(&self) -> String {
        format!("{}/{}", self.total, self.threshold)
    }
}

/// The violation that ended the exam
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Termination {
    pub total: u32,
    pub event: ViolationEvent,
}

/// Result of feeding one event to the aggregator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViolationOutcome {
    /// Counted; show a transient warning
    Warn(ViolationWarning),
    /// Counted and the threshold was reached; force-submit the exam
    Terminate(Termination),
    /// Already terminated, nothing counted
    Ignored,
}

/// Single counter shared by every violation source
pub struct ViolationAggregator {
    config: PolicyConfig,
    state: PolicyState,
    total: u32,
    by_source: BTreeMap<ViolationSource, u32>,
}

impl ViolationAggregator {
    pub fn new(config: PolicyConfig) -> Self {
        info!(
            "Creating violation aggregator: terminate at {} violations",
            config.termination_threshold
        );
        Self {
            config,
            state: PolicyState::Active,
            total: 0,
            by_source: BTreeMap::new(),
        }
    }

    /// Count a violation and decide what happens next
    pub fn record(&mut self, event: ViolationEvent) -> ViolationOutcome {
        if self.state == PolicyState::Terminated {
            debug!("Violation ignored after termination: {}", event.reason);
            return ViolationOutcome::Ignored;
        }

        self.total += 1;
        *self.by_source.entry(event.source).or_insert(0) += 1;
        metrics::counter!("proctor_violations_total", "source" => event.source.as_str()).increment(1);

        if self.total >= self.config.termination_threshold {
            self.state = PolicyState::Terminated;
            warn!(
                "Violation limit reached ({}/{}), terminating exam: {}",
                self.total, self.config.termination_threshold, event.reason
            );
            return ViolationOutcome::Terminate(Termination {
                total: self.total,
                event,
            });
        }

        warn!(
            "Violation {}/{} [{}]: {}",
            self.total, self.config.termination_threshold, event.source, event.reason
        );
        ViolationOutcome::Warn(ViolationWarning {
            reason: event.reason,
            source: event.source,
            total: self.total,
            threshold: self.config.termination_threshold,
            display_for: self.config.warning_display(),
        })
    }

    pub fn state(&self) -> PolicyState {
        self.state
    }

    pub fn is_terminated(&self) -> bool {
        self.state == PolicyState::Terminated
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    /// Violations counted for one source
    pub fn count_for(&self, source: ViolationSource) -> u32 {
        self.by_source.get(&source).copied().unwrap_or(0)
    }

    /// Per-source tallies, in a stable order
    pub fn breakdown(&self) -> BTreeMap<ViolationSource, u32> {
        self.by_source.clone()
    }

    pub fn escalation_level(&self) -> EscalationLevel {
        match self.total {
            0 => EscalationLevel::Clear,
            1..=2 => EscalationLevel::Caution,
            _ => EscalationLevel::Danger,
        }
    }

    /// Snapshot combined with the debouncer's streak counters
    pub fn snapshot(&self, streaks: ConsecutiveCounters) -> ViolationState {
        ViolationState {
            total: self.total,
            consecutive_multi_face: streaks.multi_face,
            consecutive_no_face: streaks.no_face,
            multi_face_threshold: self.config.multi_face_threshold,
            no_face_threshold: self.config.no_face_threshold,
            termination_threshold: self.config.termination_threshold,
        }
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }
}

impl Default for ViolationAggregator {
    fn default() -> Self {
        Self::new(PolicyConfig::default())
    }
}
