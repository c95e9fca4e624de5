//! Errors surfaced by the rlscan binary and their exit codes

use rlscan_core::error::{ParameterError, RlScanError};

/// Everything that can end an `rlscan` invocation early.
///
/// Scan verdicts are not errors; they come back as `Ok(exit_code)`.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Config file could not be loaded, or logging could not be set up.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Parameter(#[from] ParameterError),

    /// Invalid use of a subcommand that clap cannot catch (e.g. unknown `--section`).
    #[error("{0}")]
    Command(String),

    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Engine, store or classification failure from the pipeline.
    #[error("{0}")]
    Core(#[from] RlScanError),

    /// Already shown to the user through `StatusReporter::fatal`.
    #[error("{message}")]
    Reported { message: String, exit_code: i32 },
}

/// Exit code of a run aborted by the engine, the store or the classifier.
pub const EXIT_FATAL: i32 = 101;

impl CliError {
    /// | Code | Meaning                                       |
    /// |------|-----------------------------------------------|
    /// | 0    | Scan passed, or CI protocol reporter in use   |
    /// | 1    | Scan failed (text reporter) / command error   |
    /// | 2    | Configuration or parameter error              |
    /// | 101  | Run aborted (engine, store or status failure) |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_)
            | Self::Parameter(_)
            | Self::Core(RlScanError::Config(_) | RlScanError::Parameter(_)) => 2,
            Self::Core(_) | Self::Io(_) => EXIT_FATAL,
            Self::Reported { exit_code, .. } => *exit_code,
            Self::JsonSerialize(_) | Self::Command(_) => 1,
        }
    }

    pub fn is_reported(&self) -> bool {
        matches!(self, Self::Reported { .. })
    }

    /// Marks the error as shown, keeping its message and exit code.
    pub fn reported(self) -> Self {
        match self {
            Self::Reported { .. } => self,
            other => Self::Reported {
                message: other.to_string(),
                exit_code: other.exit_code(),
            },
        }
    }
}
