//! Pipeline execution traits
//!
//! The pipeline only talks to the outside world through these seams: running
//! a program, reporting status to the CI host, and publishing an artifact.

use super::command::{CommandOutput, Invocation};
use crate::pipeline::PipelineResult;
use std::path::Path;

/// Runs external programs
pub trait CommandRunner {
    /// Runs the invocation to completion
    ///
    /// # Errors
    ///
    /// Returns [`crate::pipeline::PipelineError::CommandFailed`] on a
    /// non-zero exit and [`crate::pipeline::PipelineError::Io`] if the
    /// program could not be started.
    fn run(&self, invocation: &Invocation) -> PipelineResult<CommandOutput>;

    /// True when invocations are recorded rather than executed, so callers
    /// skip filesystem side effects
    fn records_only(&self) -> bool {
        false
    }
}

/// Reports run status back to the invoking CI system
pub trait StatusReporter {
    /// Publishes a named output value
    ///
    /// # Errors
    ///
    /// Returns an IO error if the output channel cannot be written.
    fn set_output(&self, name: &str, value: &str) -> PipelineResult;

    /// Marks the run as failed
    fn set_failed(&self, message: &str);

    /// Emits a warning annotation
    fn warning(&self, message: &str);

    /// Emits an error annotation without failing the run
    fn error(&self, message: &str);

    /// Registers a secret so the host redacts it from logs
    fn mask(&self, _secret: &str) {}

    /// Opens a collapsible log group
    fn start_group(&self, _name: &str) {}

    /// Closes the current log group
    fn end_group(&self) {}
}

/// Summary of a published artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReport {
    /// Artifact name
    pub name: String,
    /// Number of files uploaded
    pub files: usize,
    /// Total size in bytes
    pub bytes: u64,
    /// Where the artifact ended up
    pub location: String,
}

/// Publishes a directory tree as a named artifact
pub trait ArtifactPublisher {
    /// Uploads every file under `root`
    ///
    /// # Errors
    ///
    /// Returns [`crate::pipeline::PipelineError::MissingResource`] when
    /// `root` holds no files, or an IO error if copying fails.
    fn publish(&self, name: &str, root: &Path) -> PipelineResult<UploadReport>;
}
