//! In-memory status reporter
//!
//! Captures everything a run reports so it can be inspected afterwards.
//! Used for dry runs and in tests.

use super::traits::StatusReporter;
use crate::pipeline::PipelineResult;
use std::cell::RefCell;

#[derive(Debug, Default)]
struct Captured {
    outputs: Vec<(String, String)>,
    failures: Vec<String>,
    warnings: Vec<String>,
    errors: Vec<String>,
    masked: Vec<String>,
    groups: Vec<String>,
}

/// Reporter that keeps outputs and annotations in memory
#[derive(Debug, Default)]
pub struct MemoryReporter {
    captured: RefCell<Captured>,
}

impl MemoryReporter {
    /// Creates an empty reporter
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Last value set for an output
    #[must_use]
    pub fn output(&self, name: &str) -> Option<String> {
        self.captured
            .borrow()
            .outputs
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
    }

    /// All outputs in the order they were set
    #[must_use]
    pub fn outputs(&self) -> Vec<(String, String)> {
        self.captured.borrow().outputs.clone()
    }

    /// Messages passed to `set_failed`
    #[must_use]
    pub fn failures(&self) -> Vec<String> {
        self.captured.borrow().failures.clone()
    }

    /// Warning annotations
    #[must_use]
    pub fn warnings(&self) -> Vec<String> {
        self.captured.borrow().warnings.clone()
    }

    /// Error annotations
    #[must_use]
    pub fn errors(&self) -> Vec<String> {
        self.captured.borrow().errors.clone()
    }

    /// Values registered as secrets
    #[must_use]
    pub fn masked(&self) -> Vec<String> {
        self.captured.borrow().masked.clone()
    }

    /// Names of the log groups opened
    #[must_use]
    pub fn groups(&self) -> Vec<String> {
        self.captured.borrow().groups.clone()
    }

    /// True once `set_failed` was called
    #[must_use]
    pub fn is_failed(&self) -> bool {
        !self.captured.borrow().failures.is_empty()
    }
}

impl StatusReporter for MemoryReporter {
    fn set_output(&self, name: &str, value: &str) -> PipelineResult {
        self.captured
            .borrow_mut()
            .outputs
            .push((name.to_string(), value.to_string()));
        Ok(())
    }

    fn set_failed(&self, message: &str) {
        self.captured
            .borrow_mut()
            .failures
            .push(message.to_string());
    }

    fn warning(&self, message: &str) {
        self.captured
            .borrow_mut()
            .warnings
            .push(message.to_string());
    }

    fn error(&self, message: &str) {
        self.captured.borrow_mut().errors.push(message.to_string());
    }

    fn mask(&self, secret: &str) {
        self.captured.borrow_mut().masked.push(secret.to_string());
    }

    fn start_group(&self, name: &str) {
        self.captured.borrow_mut().groups.push(name.to_string());
    }
}
