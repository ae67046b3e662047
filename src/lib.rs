//! # shipline - container builds for .NET applications
//!
//! A CI action that configures package sources, resolves a version from the
//! triggering git ref and Nerdbank.GitVersioning, builds and pushes a
//! container image, extracts the compiled output from it and publishes that
//! output as an artifact.
//!
//! ## Layout
//!
//! - [`pipeline`]: domain types (version resolution, build context, steps, errors)
//! - [`executor`]: command execution, the step runner and the build orchestrator
//! - [`infrastructure`]: inputs, the GitHub Actions runner, container and .NET tooling
//!
//! ## Example
//!
//! ```no_run
//! use shipline::prelude::*;
//! use std::collections::HashMap;
//!
//! let inputs: HashMap<String, String> = [
//!     ("app-name", "Orders.Api"),
//!     ("docker-registry-url", "ghcr.io/acme"),
//!     ("push-to-docker-registry", "false"),
//! ]
//! .into_iter()
//! .map(|(k, v)| (k.to_string(), v.to_string()))
//! .collect();
//!
//! let config = ActionConfig::from_inputs(&inputs)?;
//! let runner = ProcessRunner::new();
//! let reporter = GitHubActionsReporter::from_env();
//! let publisher = LocalArtifactStore::from_env();
//!
//! let outcome = BuildOrchestrator::new(
//!     config,
//!     GitHubContext::from_env().ref_event(),
//!     Collaborators { runner: &runner, reporter: &reporter, publisher: &publisher },
//! )
//! .run();
//! outcome.into_result()?;
//! # Ok::<(), PipelineError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod executor;
pub mod infrastructure;
pub mod pipeline;

// Prelude module for common imports
pub mod prelude;

// Re-export commonly used types
pub use executor::{
    BuildOrchestrator, Collaborators, CommandRunner, Invocation, ProcessRunner, RecordingRunner,
    StatusReporter,
};
pub use infrastructure::{ActionConfig, ContainerRuntime, GitHubActionsReporter, GitHubContext};
pub use pipeline::{BuildContext, PackageVersion, PipelineError, RefEvent};

/// Version of the shipline crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
