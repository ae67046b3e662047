//! External command execution
//!
//! Every tool the pipeline drives (`dotnet`, `nbgv`, `docker`) goes through
//! an [`Invocation`] run by a [`CommandRunner`]:
//!
//! - [`ProcessRunner`] spawns the program and streams its output to the log
//! - [`RecordingRunner`] records invocations without running anything, used
//!   for dry runs and tests
//!
//! Secret arguments registered with [`Invocation::secret`] are replaced by
//! `***` whenever the command line is rendered.

use super::traits::CommandRunner;
use crate::pipeline::{PipelineError, PipelineResult};
use std::cell::RefCell;
use std::fmt;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

const REDACTED: &str = "***";

/// A program invocation
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Invocation {
    /// Program to run
    pub program: String,
    /// Arguments
    pub args: Vec<String>,
    /// Working directory (inherits the current one when `None`)
    pub cwd: Option<PathBuf>,
    /// Data written to the program's stdin
    pub stdin: Option<String>,
    secrets: Vec<String>,
}

impl Invocation {
    /// Starts an invocation of `program`
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    /// Appends one argument
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments
    #[must_use]
    pub fn args<I, A>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Sets the working directory
    #[must_use]
    pub fn current_dir(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Feeds `input` to the program's stdin
    #[must_use]
    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    /// Marks a value that must never appear in logs
    #[must_use]
    pub fn secret(mut self, value: impl Into<String>) -> Self {
        let value = value.into();
        if !value.is_empty() {
            self.secrets.push(value);
        }
        self
    }

    /// True if the program is `program` and the arguments start with `prefix`
    #[must_use]
    pub fn matches(&self, program: &str, prefix: &[&str]) -> bool {
        self.program == program
            && self.args.len() >= prefix.len()
            && self.args.iter().zip(prefix).all(|(a, p)| a == p)
    }

    /// Replaces every registered secret in `text`
    #[must_use]
    pub fn redact(&self, text: &str) -> String {
        self.secrets
            .iter()
            .fold(text.to_string(), |acc, secret| acc.replace(secret, REDACTED))
    }

    /// Shell-quoted command line with secrets redacted
    #[must_use]
    pub fn display(&self) -> String {
        let words = std::iter::once(&self.program)
            .chain(self.args.iter())
            .map(|word| self.redact(word));
        shell_words::join(words)
    }
}

impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocation")
            .field("command", &self.display())
            .field("cwd", &self.cwd)
            .field("stdin", &self.stdin.as_ref().map(|_| REDACTED))
            .finish()
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

/// Captured result of a finished command
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    /// Standard output
    pub stdout: String,

    /// Standard error
    pub stderr: String,

    /// Exit code
    pub exit_code: i32,

    /// Duration of execution
    pub duration: Duration,
}

impl CommandOutput {
    /// Returns true if command succeeded (exit code 0)
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs commands as child processes, streaming their output
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    /// Creates a process runner
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

fn pump<R: Read + Send + 'static>(
    reader: R,
    invocation: &Invocation,
    to_stderr: bool,
) -> std::thread::JoinHandle<String> {
    let redactor = invocation.clone();
    std::thread::spawn(move || {
        let mut captured = String::new();
        for line in BufReader::new(reader).lines().map_while(Result::ok) {
            let shown = redactor.redact(&line);
            if to_stderr {
                eprintln!("{shown}");
            } else {
                println!("{shown}");
            }
            captured.push_str(&line);
            captured.push('\n');
        }
        captured
    })
}

impl CommandRunner for ProcessRunner {
    fn run(&self, invocation: &Invocation) -> PipelineResult<CommandOutput> {
        tracing::debug!(command = %invocation, "Executing command");

        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args);
        if let Some(ref cwd) = invocation.cwd {
            cmd.current_dir(cwd);
        }
        cmd.stdin(if invocation.stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let start = Instant::now();
        let mut child = cmd.spawn().map_err(|e| {
            PipelineError::Io(format!("failed to start `{}`: {e}", invocation.program))
        })?;

        // A child may exit before reading its input; its exit status and
        // stderr still decide the outcome.
        if let Some(ref input) = invocation.stdin
            && let Some(mut stdin) = child.stdin.take()
            && let Err(e) = stdin.write_all(input.as_bytes())
        {
            tracing::warn!(program = %invocation.program, error = %e, "Failed to write stdin");
        }

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| PipelineError::Io("stdout was not captured".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| PipelineError::Io("stderr was not captured".to_string()))?;

        let stdout_thread = pump(stdout, invocation, false);
        let stderr_thread = pump(stderr, invocation, true);

        let status = child.wait()?;
        let stdout = stdout_thread.join().unwrap_or_default();
        let stderr = stderr_thread.join().unwrap_or_default();
        let exit_code = status.code().unwrap_or(-1);
        let duration = start.elapsed();

        tracing::debug!(
            program = %invocation.program,
            exit_code,
            duration_ms = duration.as_millis(),
            "Command finished"
        );

        if exit_code != 0 {
            return Err(PipelineError::CommandFailed {
                program: invocation.program.clone(),
                code: exit_code,
                stderr: invocation.redact(stderr.trim()),
            });
        }

        Ok(CommandOutput {
            stdout,
            stderr,
            exit_code,
            duration,
        })
    }
}

/// Records invocations instead of running them.
///
/// Canned stdout and injected failures are matched on the program name and
/// the leading arguments, e.g. `&["docker", "push"]`.
#[derive(Debug, Default)]
pub struct RecordingRunner {
    calls: RefCell<Vec<Invocation>>,
    responses: Vec<(Vec<String>, String)>,
    failures: Vec<Vec<String>>,
}

impl RecordingRunner {
    /// Creates a runner that succeeds with empty output
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `stdout` for invocations matching `command`
    #[must_use]
    pub fn responding(mut self, command: &[&str], stdout: impl Into<String>) -> Self {
        self.responses.push((to_owned(command), stdout.into()));
        self
    }

    /// Fails invocations matching `command` with exit code 1
    #[must_use]
    pub fn failing_on(mut self, command: &[&str]) -> Self {
        self.failures.push(to_owned(command));
        self
    }

    /// Every invocation seen so far
    #[must_use]
    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.borrow().clone()
    }

    /// Rendered command lines seen so far
    #[must_use]
    pub fn command_lines(&self) -> Vec<String> {
        self.calls.borrow().iter().map(Invocation::display).collect()
    }

    /// True if any recorded invocation matches `command`
    #[must_use]
    pub fn ran(&self, command: &[&str]) -> bool {
        self.calls.borrow().iter().any(|c| matches_words(c, command))
    }
}

fn to_owned(words: &[&str]) -> Vec<String> {
    words.iter().map(ToString::to_string).collect()
}

fn matches_words<S: AsRef<str>>(invocation: &Invocation, words: &[S]) -> bool {
    match words.split_first() {
        Some((program, prefix)) => {
            let prefix: Vec<&str> = prefix.iter().map(AsRef::as_ref).collect();
            invocation.matches(program.as_ref(), &prefix)
        }
        None => false,
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&self, invocation: &Invocation) -> PipelineResult<CommandOutput> {
        tracing::info!(command = %invocation, "Recorded command");
        self.calls.borrow_mut().push(invocation.clone());

        if self.failures.iter().any(|f| matches_words(invocation, f.as_slice())) {
            return Err(PipelineError::CommandFailed {
                program: invocation.program.clone(),
                code: 1,
                stderr: "injected failure".to_string(),
            });
        }

        let stdout = self
            .responses
            .iter()
            .find(|(words, _)| matches_words(invocation, words.as_slice()))
            .map(|(_, stdout)| stdout.clone())
            .unwrap_or_default();

        Ok(CommandOutput {
            stdout,
            ..CommandOutput::default()
        })
    }

    fn records_only(&self) -> bool {
        true
    }
}
