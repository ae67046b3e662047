//! Core types for pipeline domain
//!
//! This module contains the outcome types recorded for every step of a run.

#![allow(clippy::must_use_candidate)]

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Result type for pipeline operations
pub type PipelineResult<T = ()> = std::result::Result<T, super::errors::PipelineError>;

/// Possible outcomes of a single step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepOutcome {
    /// Step completed successfully
    Success,
    /// Step failed
    Failure,
    /// Best-effort step failed and the run carried on
    Tolerated,
    /// Step was never started because an earlier step aborted the run
    Skipped,
}

impl StepOutcome {
    /// Returns true if result is successful
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Returns true if result is a failure
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure)
    }
}

impl fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "SUCCESS"),
            Self::Failure => write!(f, "FAILURE"),
            Self::Tolerated => write!(f, "TOLERATED"),
            Self::Skipped => write!(f, "SKIPPED"),
        }
    }
}

/// What happened to one step during a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRecord {
    /// Step name
    pub name: String,
    /// Final outcome
    pub outcome: StepOutcome,
    /// Wall time spent in the step
    pub duration: Duration,
    /// Error message for failed or tolerated steps
    pub error: Option<String>,
}

/// Ordered record of every step executed in a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Records in execution order
    pub steps: Vec<StepRecord>,
}

impl RunReport {
    /// Names of the steps that actually ran, in order
    pub fn executed(&self) -> Vec<&str> {
        self.steps
            .iter()
            .filter(|s| s.outcome != StepOutcome::Skipped)
            .map(|s| s.name.as_str())
            .collect()
    }

    /// Looks up the record for a step
    pub fn get(&self, name: &str) -> Option<&StepRecord> {
        self.steps.iter().find(|s| s.name == name)
    }

    /// Number of steps with the given outcome
    pub fn count(&self, outcome: StepOutcome) -> usize {
        self.steps.iter().filter(|s| s.outcome == outcome).count()
    }

    /// Total wall time across all steps
    pub fn total_duration(&self) -> Duration {
        self.steps.iter().map(|s| s.duration).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, outcome: StepOutcome) -> StepRecord {
        StepRecord {
            name: name.to_string(),
            outcome,
            duration: Duration::from_millis(10),
            error: None,
        }
    }

    #[test]
    fn test_outcome_display() {
        assert_eq!(StepOutcome::Success.to_string(), "SUCCESS");
        assert_eq!(StepOutcome::Tolerated.to_string(), "TOLERATED");
    }

    #[test]
    fn test_report_executed_skips_skipped() {
        let report = RunReport {
            steps: vec![
                record("A", StepOutcome::Success),
                record("B", StepOutcome::Failure),
                record("C", StepOutcome::Skipped),
            ],
        };
        assert_eq!(report.executed(), vec!["A", "B"]);
        assert_eq!(report.count(StepOutcome::Skipped), 1);
        assert_eq!(report.total_duration(), Duration::from_millis(30));
        assert!(report.get("B").unwrap().outcome.is_failure());
    }
}
