//! Sequential step runner
//!
//! Runs phases in order on the current thread. A fatal failure is reported
//! through the [`StatusReporter`] and stops the run; the `always` steps of a
//! guarded phase still run first. Later phases are recorded as skipped.
//!
//! When both a guarded step and one of its cleanup steps fail, the guarded
//! step's error is the one reported and returned. Cleanup failures are still
//! annotated as errors so none of them go unnoticed.

use super::traits::StatusReporter;
use crate::pipeline::{
    FailurePolicy, Phase, PipelineError, PipelineResult, PipelineStep, RunReport, StepOutcome,
    StepRecord,
};
use std::time::{Duration, Instant};

/// Outcome of a complete run
#[derive(Debug)]
pub struct RunOutcome {
    /// Per-step records, skipped steps included
    pub report: RunReport,
    /// The error that aborted the run, if any
    pub failure: Option<PipelineError>,
}

impl RunOutcome {
    /// Converts into a `Result`, keeping the report on success
    ///
    /// # Errors
    ///
    /// Returns the error that aborted the run.
    pub fn into_result(self) -> PipelineResult<RunReport> {
        match self.failure {
            Some(err) => Err(err),
            None => Ok(self.report),
        }
    }
}

/// Executes pipeline phases one after another
pub struct PipelineRunner<'r> {
    reporter: &'r dyn StatusReporter,
}

impl<'r> PipelineRunner<'r> {
    /// Creates a runner that reports to `reporter`
    #[must_use]
    pub fn new(reporter: &'r dyn StatusReporter) -> Self {
        Self { reporter }
    }

    /// Runs every phase against `state`
    pub fn run<S>(&self, phases: Vec<Phase<'_, S>>, state: &mut S) -> RunOutcome {
        tracing::info!(phases = phases.len(), "Starting pipeline");

        let mut report = RunReport::default();
        let mut failure = None;
        let mut phases = phases.into_iter();

        for phase in phases.by_ref() {
            let result = match phase {
                Phase::Step(step) => self.execute(step, state, &mut report),
                Phase::WithPost { step, always } => {
                    self.execute_guarded(step, always, state, &mut report)
                }
            };

            if let Err(err) = result {
                self.reporter.set_failed(&err.to_string());
                failure = Some(err);
                break;
            }
        }

        for phase in phases {
            for name in phase.step_names() {
                tracing::debug!(step = %name, "Skipping step");
                report.steps.push(StepRecord {
                    name: name.to_string(),
                    outcome: StepOutcome::Skipped,
                    duration: Duration::ZERO,
                    error: None,
                });
            }
        }

        tracing::info!(
            succeeded = report.count(StepOutcome::Success),
            failed = report.count(StepOutcome::Failure),
            tolerated = report.count(StepOutcome::Tolerated),
            skipped = report.count(StepOutcome::Skipped),
            duration_ms = report.total_duration().as_millis(),
            "Pipeline finished"
        );

        RunOutcome { report, failure }
    }

    fn execute_guarded<S>(
        &self,
        step: PipelineStep<'_, S>,
        always: Vec<PipelineStep<'_, S>>,
        state: &mut S,
        report: &mut RunReport,
    ) -> PipelineResult {
        let guarded = self.execute(step, state, report);

        let mut cleanup_failure = None;
        for cleanup in always {
            if let Err(err) = self.execute(cleanup, state, report) {
                self.reporter.error(&err.to_string());
                cleanup_failure.get_or_insert(err);
            }
        }

        match (guarded, cleanup_failure) {
            (Err(err), _) | (Ok(()), Some(err)) => Err(err),
            (Ok(()), None) => Ok(()),
        }
    }

    /// Runs one step, recording its outcome. Tolerated failures return `Ok`.
    fn execute<S>(
        &self,
        mut step: PipelineStep<'_, S>,
        state: &mut S,
        report: &mut RunReport,
    ) -> PipelineResult {
        tracing::info!(step = %step.name, "Starting step");
        self.reporter.start_group(&step.name);

        let start = Instant::now();
        let result = step.run(state);
        let duration = start.elapsed();

        self.reporter.end_group();

        match result {
            Ok(()) => {
                tracing::info!(
                    step = %step.name,
                    duration_ms = duration.as_millis(),
                    "Finished step"
                );
                report.steps.push(StepRecord {
                    name: step.name,
                    outcome: StepOutcome::Success,
                    duration,
                    error: None,
                });
                Ok(())
            }
            Err(err) if step.policy == FailurePolicy::BestEffort => {
                tracing::warn!(step = %step.name, error = %err, "Step failed, continuing");
                self.reporter
                    .warning(&format!("{} failed and was skipped: {err}", step.name));
                report.steps.push(StepRecord {
                    name: step.name,
                    outcome: StepOutcome::Tolerated,
                    duration,
                    error: Some(err.to_string()),
                });
                Ok(())
            }
            Err(err) => {
                let err = err.in_step(&step.name);
                tracing::error!(step = %step.name, error = %err, "Step failed");
                report.steps.push(StepRecord {
                    name: step.name,
                    outcome: StepOutcome::Failure,
                    duration,
                    error: Some(err.to_string()),
                });
                Err(err)
            }
        }
    }
}
