//! `shipline run` - Execute the build pipeline
//!
//! Inputs come from `INPUT_*` variables with `--input` overrides on top.
//! With `--dry-run` no program is started: commands are recorded and
//! printed, and `nbgv` answers with a placeholder version.

use anyhow::{Context, Result};
use shipline::executor::{
    ArtifactPublisher, BuildOrchestrator, Collaborators, MemoryReporter, ProcessRunner,
    RecordingRunner, RunOutcome, StatusReporter, UploadReport,
};
use shipline::infrastructure::{
    ActionConfig, EnvInputs, GitHubActionsReporter, GitHubContext, LayeredInputs,
    LocalArtifactStore,
};
use shipline::pipeline::{PipelineResult, RefEvent, StepOutcome};
use std::collections::HashMap;
use std::path::Path;

const DRY_RUN_NBGV_OUTPUT: &str =
    r#"{"CloudBuildAllVars":{"NBGV_NuGetPackageVersion":"0.0.0-dryrun"}}"#;

/// Options for `shipline run`
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Record commands instead of executing them
    pub dry_run: bool,
    /// `--input` overrides, applied over the environment
    pub inputs: Vec<(String, String)>,
}

/// Publisher used in dry runs; nothing was extracted, so nothing is copied
struct DryRunPublisher;

impl ArtifactPublisher for DryRunPublisher {
    fn publish(&self, name: &str, root: &Path) -> PipelineResult<UploadReport> {
        Ok(UploadReport {
            name: name.to_string(),
            files: 0,
            bytes: 0,
            location: root.display().to_string(),
        })
    }
}

fn load_config(options: &RunOptions, reporter: &dyn StatusReporter) -> Result<ActionConfig> {
    let overrides: HashMap<String, String> = options.inputs.iter().cloned().collect();
    let inputs = LayeredInputs::new().with(&overrides).with(&EnvInputs);

    match ActionConfig::from_inputs(&inputs) {
        Ok(config) => Ok(config),
        Err(err) => {
            reporter.set_failed(&err.to_string());
            Err(err).context("Invalid action inputs")
        }
    }
}

/// Runs the pipeline for the current workflow event
pub fn run_pipeline(options: &RunOptions) -> Result<()> {
    let event = GitHubContext::from_env().ref_event();

    if options.dry_run {
        return dry_run(options, event);
    }

    let reporter = GitHubActionsReporter::from_env();
    let config = load_config(options, &reporter)?;
    let runner = ProcessRunner::new();
    let publisher = LocalArtifactStore::from_env();

    let outcome = BuildOrchestrator::new(
        config,
        event,
        Collaborators {
            runner: &runner,
            reporter: &reporter,
            publisher: &publisher,
        },
    )
    .run();

    finish(outcome)
}

fn dry_run(options: &RunOptions, event: RefEvent) -> Result<()> {
    let reporter = MemoryReporter::new();
    let config = load_config(options, &reporter)?;
    let runner = RecordingRunner::new().responding(&["nbgv", "get-version"], DRY_RUN_NBGV_OUTPUT);

    let outcome = BuildOrchestrator::new(
        config,
        event,
        Collaborators {
            runner: &runner,
            reporter: &reporter,
            publisher: &DryRunPublisher,
        },
    )
    .run();

    for line in runner.command_lines() {
        println!("{line}");
    }
    for (name, value) in reporter.outputs() {
        println!("output {name}={value}");
    }

    finish(outcome)
}

fn finish(outcome: RunOutcome) -> Result<()> {
    for step in &outcome.report.steps {
        match step.outcome {
            StepOutcome::Failure | StepOutcome::Tolerated => tracing::warn!(
                step = %step.name,
                outcome = %step.outcome,
                error = step.error.as_deref().unwrap_or_default(),
                "Step summary"
            ),
            _ => tracing::debug!(step = %step.name, outcome = %step.outcome, "Step summary"),
        }
    }

    outcome.into_result().context("Build pipeline failed")?;
    Ok(())
}
