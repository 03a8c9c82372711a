//! CLI-specific error types and exit code mapping

use logsieve_core::error::{SieveError, SinkError, StorageError};
use logsieve_pattern::PatternError;
use logsieve_pipeline::PipelineError;

/// CLI-specific error type.
///
/// Each variant carries enough context for a user-friendly message.
/// The `exit_code()` method maps errors to process exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// Logging or metrics setup failed.
    #[error("setup error: {0:#}")]
    Setup(#[from] anyhow::Error),

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped domain error.
    #[error("{0}")]
    Core(#[from] SieveError),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                                  |
    /// |------|------------------------------------------|
    /// | 0    | Success                                  |
    /// | 1    | General / command error                  |
    /// | 2    | Configuration error                      |
    /// | 3    | Persistence error (store, snapshot)      |
    /// | 4    | Alertmanager error                       |
    /// | 10   | IO error                                 |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 2,
            Self::Io(_) => 10,
            Self::Core(inner) => match inner {
                SieveError::Config(_) => 2,
                SieveError::Storage(_) => 3,
                SieveError::Sink(_) => 4,
                SieveError::Io(_) => 10,
                SieveError::Source(_) => 1,
            },
            Self::Command(_) | Self::Setup(_) | Self::JsonSerialize(_) => 1,
        }
    }
}

impl From<StorageError> for CliError {
    fn from(e: StorageError) -> Self {
        Self::Core(e.into())
    }
}

impl From<SinkError> for CliError {
    fn from(e: SinkError) -> Self {
        Self::Core(e.into())
    }
}

impl From<PatternError> for CliError {
    fn from(e: PatternError) -> Self {
        Self::Core(e.into())
    }
}

impl From<PipelineError> for CliError {
    fn from(e: PipelineError) -> Self {
        Self::Core(e.into())
    }
}
