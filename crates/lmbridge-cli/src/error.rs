//! CLI-specific error types and exit codes.

use thiserror::Error;

/// CLI-specific error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Config file could not be read.
    #[error("Failed to read {path}: {message}")]
    Io { path: String, message: String },

    /// Config file or resolved settings are invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The backend could not be reached by `check`.
    #[error("LM Studio is not reachable at {0}")]
    BackendDown(String),
}

impl CliError {
    /// Map error to a process exit code (sysexits.h where one fits).
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Io { .. } => 74,     // EX_IOERR
            Self::Config(_) => 78,     // EX_CONFIG
            Self::BackendDown(_) => 69, // EX_UNAVAILABLE
        }
    }
}
