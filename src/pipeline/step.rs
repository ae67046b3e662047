//! Step types for pipeline execution
//!
//! A step is a named action over some run state. Steps are grouped into
//! phases: a plain step, or a step with `post` cleanup steps that always run
//! after it.

#![allow(clippy::must_use_candidate, clippy::return_self_not_must_use)]

use super::types::PipelineResult;
use std::fmt;

/// Action executed by a step
pub type StepAction<'a, S> = Box<dyn FnMut(&mut S) -> PipelineResult + 'a>;

/// How a step's failure affects the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Failure aborts the run
    #[default]
    Fatal,
    /// Failure is logged and the run carries on
    BestEffort,
}

/// A named unit of work
pub struct PipelineStep<'a, S> {
    /// Step name, used in logs and failure messages
    pub name: String,
    /// Failure handling
    pub policy: FailurePolicy,
    action: StepAction<'a, S>,
}

impl<'a, S> PipelineStep<'a, S> {
    /// Creates a fatal step
    pub fn new(
        name: impl Into<String>,
        action: impl FnMut(&mut S) -> PipelineResult + 'a,
    ) -> Self {
        Self {
            name: name.into(),
            policy: FailurePolicy::Fatal,
            action: Box::new(action),
        }
    }

    /// Creates a step whose failure is tolerated
    pub fn best_effort(
        name: impl Into<String>,
        action: impl FnMut(&mut S) -> PipelineResult + 'a,
    ) -> Self {
        Self {
            policy: FailurePolicy::BestEffort,
            ..Self::new(name, action)
        }
    }

    /// Runs the action once
    ///
    /// # Errors
    ///
    /// Returns whatever the action returns.
    pub fn run(&mut self, state: &mut S) -> PipelineResult {
        (self.action)(state)
    }
}

impl<S> fmt::Debug for PipelineStep<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineStep")
            .field("name", &self.name)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

/// One entry of a pipeline's sequence
#[derive(Debug)]
pub enum Phase<'a, S> {
    /// A single step
    Step(PipelineStep<'a, S>),

    /// A step followed by cleanup steps that run whatever its outcome
    WithPost {
        /// The guarded step
        step: PipelineStep<'a, S>,
        /// Steps that always run afterwards, in order
        always: Vec<PipelineStep<'a, S>>,
    },
}

impl<'a, S> Phase<'a, S> {
    /// Wraps a single step
    pub fn step(step: PipelineStep<'a, S>) -> Self {
        Self::Step(step)
    }

    /// Guards a step with cleanup steps
    pub fn with_post(step: PipelineStep<'a, S>, always: Vec<PipelineStep<'a, S>>) -> Self {
        Self::WithPost { step, always }
    }

    /// Names of every step in the phase, in execution order
    pub fn step_names(&self) -> Vec<&str> {
        match self {
            Self::Step(step) => vec![step.name.as_str()],
            Self::WithPost { step, always } => std::iter::once(step.name.as_str())
                .chain(always.iter().map(|s| s.name.as_str()))
                .collect(),
        }
    }
}

impl<S> fmt::Display for Phase<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Step(step) => write!(f, "{}", step.name),
            Self::WithPost { step, always } => {
                write!(f, "{} (post: {} steps)", step.name, always.len())
            }
        }
    }
}
