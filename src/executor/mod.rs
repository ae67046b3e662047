//! Pipeline execution layer
//!
//! This module contains the execution seams (commands, status, artifacts),
//! the step runner and the build orchestrator that wires them together.

mod command;
mod orchestrator;
mod runner;
mod status;
mod traits;

pub use command::{CommandOutput, Invocation, ProcessRunner, RecordingRunner};
pub use orchestrator::{BuildOrchestrator, Collaborators, outputs, steps};
pub use runner::{PipelineRunner, RunOutcome};
pub use status::MemoryReporter;
pub use traits::{ArtifactPublisher, CommandRunner, StatusReporter, UploadReport};
