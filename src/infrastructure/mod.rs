//! Infrastructure layer
//!
//! This module contains external integrations and adapters: the tools the
//! pipeline drives, the runner it reports to and the stores it writes to.

mod artifact;
pub mod config;
pub mod container;
pub mod dotnet;
mod github_actions;
mod logging;
pub mod search;

pub use artifact::LocalArtifactStore;
pub use config::{ActionConfig, InputSource, LayeredInputs};
pub use container::{BuildRequest, ContainerEngine, ContainerRuntime, EXTRACT_CONTAINER};
pub use dotnet::{Nbgv, PackageSources};
pub use github_actions::{
    EnvInputs, GitHubActionsReporter, GitHubContext, runner_temp, workflow_command,
};
pub use logging::init_logging;
