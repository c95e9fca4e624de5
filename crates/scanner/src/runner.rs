//! Subprocess execution for the external engine.
//!
//! The [`CommandRunner`] trait is the only seam through which the crate starts
//! processes. Production code uses [`TokioCommandRunner`]; tests substitute a
//! recording fake.
//!
//! # Redaction
//!
//! Arguments starting with one of [`SECRET_PREFIXES`] have their value replaced
//! with [`MASK`] whenever a command line is rendered for a log line or an error
//! message. The argument vector handed to the child process is never modified.

use std::future::Future;
use std::process::{ExitStatus, Stdio};

use tracing::debug;

use rlscan_core::error::ExecutionError;

/// Replacement for secret argument values.
pub const MASK: &str = "******";

/// Argument prefixes whose values must never be rendered.
pub const SECRET_PREFIXES: &[&str] = &[
    "--vault-key=",
    "--password=",
    "--encoded-list=",
    "--auth-pass=",
    "--bearer-token=",
    "--encoded-key=",
    "--site-key=",
    "--proxy-password=",
];

/// How a non-zero exit code is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Non-zero exit is an [`ExecutionError::NonZeroExit`].
    Strict,
    /// Exit code is returned to the caller for interpretation.
    Lenient,
}

/// What happens to the child's stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Stdout is passed through to our stdout.
    Inherit,
    /// Stdout is collected into [`ProcessOutput::stdout`].
    Capture,
}

/// A fully built engine invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineCommand {
    pub program: String,
    pub args: Vec<String>,
    pub mode: RunMode,
    pub output: OutputMode,
}

impl EngineCommand {
    /// Strict invocation with inherited stdout.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            mode: RunMode::Strict,
            output: OutputMode::Inherit,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn lenient(mut self) -> Self {
        self.mode = RunMode::Lenient;
        self
    }

    pub fn captured(mut self) -> Self {
        self.output = OutputMode::Capture;
        self
    }

    /// Program and arguments joined for display, with secrets masked.
    pub fn redacted(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .map(redact_arg)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Whether `arg` is present verbatim (used by tests and log filters).
    pub fn has_arg(&self, arg: &str) -> bool {
        self.args.iter().any(|a| a == arg)
    }
}

/// Masks the value of a secret-bearing argument.
pub fn redact_arg(arg: &str) -> std::borrow::Cow<'_, str> {
    match SECRET_PREFIXES.iter().find(|p| arg.starts_with(*p)) {
        Some(prefix) => format!("{prefix}{MASK}").into(),
        None => arg.into(),
    }
}

/// Result of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code; negative when the process was killed by a signal.
    pub exit_code: i32,
    /// Captured stdout (empty for [`OutputMode::Inherit`]).
    pub stdout: String,
}

/// Runs engine commands.
///
/// Implementations launch exactly once and never retry.
pub trait CommandRunner: Send + Sync {
    fn run(
        &self,
        command: &EngineCommand,
    ) -> impl Future<Output = Result<ProcessOutput, ExecutionError>> + Send;
}

/// Production runner backed by `tokio::process`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioCommandRunner;

impl CommandRunner for TokioCommandRunner {
    async fn run(&self, command: &EngineCommand) -> Result<ProcessOutput, ExecutionError> {
        let shown = command.redacted();
        debug!(command = %shown, mode = ?command.mode, "executing");

        let mut cmd = tokio::process::Command::new(&command.program);
        cmd.args(&command.args).stdin(Stdio::null());

        let launch_error = |e: std::io::Error| ExecutionError::Launch {
            command: shown.clone(),
            reason: e.to_string(),
        };

        let (status, stdout) = match command.output {
            OutputMode::Inherit => (cmd.status().await.map_err(launch_error)?, String::new()),
            OutputMode::Capture => {
                let out = cmd
                    .stderr(Stdio::inherit())
                    .output()
                    .await
                    .map_err(launch_error)?;
                (
                    out.status,
                    String::from_utf8_lossy(&out.stdout).into_owned(),
                )
            }
        };

        let exit_code = exit_code_of(status);
        debug!(command = %shown, exit_code, "finished");

        if command.mode == RunMode::Strict && exit_code != 0 {
            return Err(ExecutionError::NonZeroExit {
                command: shown,
                exit_code,
            });
        }

        Ok(ProcessOutput { exit_code, stdout })
    }
}

/// Maps an exit status to a code; signal termination becomes `-signal`.
fn exit_code_of(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return -signal;
        }
    }
    -1
}
