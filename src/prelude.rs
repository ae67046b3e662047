//! Prelude module for common imports

pub use crate::pipeline::context::BuildContext;
pub use crate::pipeline::errors::{ConfigError, PipelineError};
pub use crate::pipeline::step::{FailurePolicy, Phase, PipelineStep};
pub use crate::pipeline::types::{PipelineResult, RunReport, StepOutcome};
pub use crate::pipeline::version::{PackageVersion, RefEvent};

pub use crate::executor::{
    ArtifactPublisher, BuildOrchestrator, Collaborators, CommandRunner, Invocation,
    PipelineRunner, ProcessRunner, RunOutcome, StatusReporter,
};

pub use crate::infrastructure::{
    ActionConfig, ContainerRuntime, EnvInputs, GitHubActionsReporter, GitHubContext,
    InputSource, LocalArtifactStore,
};
