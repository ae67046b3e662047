//! Pipeline domain types and logic

pub mod context;
pub mod errors;
pub mod step;
pub mod types;
pub mod version;

pub use context::BuildContext;
pub use errors::{ConfigError, PipelineError};
pub use step::{FailurePolicy, Phase, PipelineStep, StepAction};
pub use types::{PipelineResult, RunReport, StepOutcome, StepRecord};
pub use version::{PackageVersion, RefEvent, artifact_name, docker_image, image_tag};
