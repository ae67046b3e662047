//! GitHub Actions runner integration
//!
//! Reads inputs and event context from the runner environment and reports
//! outputs, annotations and log groups back through workflow commands.

use super::config::InputSource;
use crate::executor::StatusReporter;
use crate::pipeline::{PipelineError, PipelineResult, RefEvent};
use std::cell::{Cell, RefCell};
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Inputs from `INPUT_<NAME>` environment variables
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvInputs;

impl EnvInputs {
    /// Environment variable holding input `name`
    #[must_use]
    pub fn variable(name: &str) -> String {
        format!("INPUT_{}", name.replace(' ', "_").to_uppercase())
    }
}

impl InputSource for EnvInputs {
    fn get(&self, name: &str) -> Option<String> {
        std::env::var(Self::variable(name)).ok()
    }
}

/// Runner temp directory, if running on a runner
#[must_use]
pub fn runner_temp() -> Option<PathBuf> {
    std::env::var_os("RUNNER_TEMP")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

fn escape_data(value: &str) -> String {
    value
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

fn escape_property(value: &str) -> String {
    escape_data(value).replace(':', "%3A").replace(',', "%2C")
}

/// Renders `::command key=value,...::message`
#[must_use]
pub fn workflow_command(command: &str, properties: &[(&str, &str)], message: &str) -> String {
    let mut line = format!("::{command}");
    if !properties.is_empty() {
        let props: Vec<String> = properties
            .iter()
            .map(|(k, v)| format!("{k}={}", escape_property(v)))
            .collect();
        line.push(' ');
        line.push_str(&props.join(","));
    }
    line.push_str("::");
    line.push_str(&escape_data(message));
    line
}

/// Reporter speaking the workflow command protocol.
///
/// Commands go to `W` (stdout on a runner). Outputs are appended to the
/// `GITHUB_OUTPUT` file when one is configured.
#[derive(Debug)]
pub struct GitHubActionsReporter<W: Write = io::Stdout> {
    commands: RefCell<W>,
    output_file: Option<PathBuf>,
    failed: Cell<bool>,
}

impl GitHubActionsReporter {
    /// Reporter for the current runner
    #[must_use]
    pub fn from_env() -> Self {
        let output_file = std::env::var_os("GITHUB_OUTPUT")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        Self::new(io::stdout(), output_file)
    }
}

impl<W: Write> GitHubActionsReporter<W> {
    /// Reporter writing commands to `commands`
    pub fn new(commands: W, output_file: Option<PathBuf>) -> Self {
        Self {
            commands: RefCell::new(commands),
            output_file,
            failed: Cell::new(false),
        }
    }

    /// True once `set_failed` was called
    pub fn is_failed(&self) -> bool {
        self.failed.get()
    }

    /// Gives back the command sink
    pub fn into_inner(self) -> W {
        self.commands.into_inner()
    }

    fn issue(&self, line: &str) {
        let mut out = self.commands.borrow_mut();
        if let Err(e) = writeln!(out, "{line}").and_then(|()| out.flush()) {
            tracing::warn!(error = %e, "Failed to write workflow command");
        }
    }

    fn append_output(path: &Path, name: &str, value: &str) -> io::Result<()> {
        let delimiter = format!("ghadelimiter_{}", uuid::Uuid::new_v4());
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{name}<<{delimiter}")?;
        writeln!(file, "{value}")?;
        writeln!(file, "{delimiter}")
    }
}

impl<W: Write> StatusReporter for GitHubActionsReporter<W> {
    fn set_output(&self, name: &str, value: &str) -> PipelineResult {
        tracing::info!(output = %name, value = %value, "Setting output");
        match self.output_file {
            Some(ref path) => Self::append_output(path, name, value).map_err(|e| {
                PipelineError::Io(format!(
                    "failed to write output '{name}' to {}: {e}",
                    path.display()
                ))
            }),
            None => {
                self.issue(&workflow_command("set-output", &[("name", name)], value));
                Ok(())
            }
        }
    }

    fn set_failed(&self, message: &str) {
        self.failed.set(true);
        self.issue(&workflow_command("error", &[], message));
    }

    fn warning(&self, message: &str) {
        self.issue(&workflow_command("warning", &[], message));
    }

    fn error(&self, message: &str) {
        self.issue(&workflow_command("error", &[], message));
    }

    fn mask(&self, secret: &str) {
        if !secret.is_empty() {
            self.issue(&workflow_command("add-mask", &[], secret));
        }
    }

    fn start_group(&self, name: &str) {
        self.issue(&workflow_command("group", &[], name));
    }

    fn end_group(&self) {
        self.issue("::endgroup::");
    }
}

/// What triggered the workflow run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GitHubContext {
    /// `GITHUB_REF`
    pub git_ref: String,
    /// `GITHUB_EVENT_NAME`
    pub event_name: String,
    /// Pull request number from the event payload
    pub pr_number: Option<u64>,
}

impl GitHubContext {
    /// Builds the context from a ref, event name and raw event payload
    #[must_use]
    pub fn from_parts(git_ref: &str, event_name: &str, payload: Option<&str>) -> Self {
        let pr_number = payload
            .and_then(|raw| serde_json::from_str::<serde_json::Value>(raw).ok())
            .and_then(|event| {
                event
                    .pointer("/pull_request/number")
                    .and_then(serde_json::Value::as_u64)
                    .or_else(|| event.get("number").and_then(serde_json::Value::as_u64))
            });

        Self {
            git_ref: git_ref.to_string(),
            event_name: event_name.to_string(),
            pr_number,
        }
    }

    /// Reads `GITHUB_REF`, `GITHUB_EVENT_NAME` and the payload at
    /// `GITHUB_EVENT_PATH`. Unset variables or an unreadable payload leave
    /// the corresponding fields empty.
    #[must_use]
    pub fn from_env() -> Self {
        let git_ref = std::env::var("GITHUB_REF").unwrap_or_default();
        let event_name = std::env::var("GITHUB_EVENT_NAME").unwrap_or_default();
        let payload = std::env::var_os("GITHUB_EVENT_PATH")
            .filter(|p| !p.is_empty())
            .and_then(|path| match std::fs::read_to_string(&path) {
                Ok(raw) => Some(raw),
                Err(e) => {
                    tracing::warn!(path = ?path, error = %e, "Cannot read event payload");
                    None
                }
            });

        Self::from_parts(&git_ref, &event_name, payload.as_deref())
    }

    fn is_pull_request_event(&self) -> bool {
        matches!(
            self.event_name.as_str(),
            "pull_request" | "pull_request_target" | "pull_request_review"
        )
    }

    /// Classifies the triggering ref
    #[must_use]
    pub fn ref_event(&self) -> RefEvent {
        match RefEvent::from_ref(&self.git_ref, self.pr_number) {
            RefEvent::Unknown if self.is_pull_request_event() => self
                .pr_number
                .map_or(RefEvent::Unknown, |number| RefEvent::PullRequest { number }),
            event => event,
        }
    }
}
