//! Error types for pipeline domain

use thiserror::Error;

/// Errors that can occur while running the build pipeline
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// Configuration could not be resolved
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A named step failed
    #[error("Step '{step}' failed: {error}")]
    StepFailed {
        /// Name of the step that failed.
        step: String,
        /// Error message describing the failure.
        error: String,
    },

    /// Command execution failed
    #[error("`{program}` exited with code {code}: {stderr}")]
    CommandFailed {
        /// Program that was invoked.
        program: String,
        /// Exit code returned by the command.
        code: i32,
        /// Standard error output from the command.
        stderr: String,
    },

    /// A file or directory the pipeline depends on was not found
    #[error("Missing {what}: {detail}")]
    MissingResource {
        /// Kind of resource (e.g. "build file").
        what: String,
        /// Where it was looked for.
        detail: String,
    },

    /// Output of an external tool could not be understood
    #[error("Unexpected output from {tool}: {reason}")]
    ToolOutput {
        /// Tool that produced the output.
        tool: String,
        /// Why it was rejected.
        reason: String,
    },

    /// IO error occurred
    #[error("IO error: {0}")]
    Io(String),
}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl PipelineError {
    /// Wraps an error with the name of the step it escaped from.
    ///
    /// Already-wrapped errors keep their original step name.
    #[must_use]
    pub fn in_step(self, step: &str) -> Self {
        match self {
            Self::StepFailed { .. } => self,
            other => Self::StepFailed {
                step: step.to_string(),
                error: other.to_string(),
            },
        }
    }
}

/// Errors raised while reading action inputs
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required input was not supplied
    #[error("Input required and not supplied: {name}")]
    MissingInput {
        /// Input name as declared by the action.
        name: String,
    },

    /// A boolean input had a value outside the YAML core schema
    #[error("Input '{name}' does not meet YAML 1.2 \"Core Schema\" specification: '{value}'")]
    InvalidBoolean {
        /// Input name.
        name: String,
        /// Rejected value.
        value: String,
    },

    /// An input had a value that cannot be used
    #[error("Invalid value for input '{name}': {reason}")]
    InvalidValue {
        /// Input name.
        name: String,
        /// Why the value was rejected.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_step_wraps_once() {
        let err = PipelineError::Io("disk full".to_string()).in_step("CopyArtifacts");
        assert_eq!(
            err.to_string(),
            "Step 'CopyArtifacts' failed: IO error: disk full"
        );

        let rewrapped = err.clone().in_step("Other");
        assert_eq!(rewrapped, err);
    }

    #[test]
    fn test_command_failed_message() {
        let err = PipelineError::CommandFailed {
            program: "docker".to_string(),
            code: 125,
            stderr: "no such image".to_string(),
        };
        assert_eq!(err.to_string(), "`docker` exited with code 125: no such image");
    }

    #[test]
    fn test_config_error_converts() {
        let err: PipelineError = ConfigError::MissingInput {
            name: "app-name".to_string(),
        }
        .into();
        assert!(matches!(err, PipelineError::Config(_)));
        assert!(err.to_string().contains("app-name"));
    }
}
