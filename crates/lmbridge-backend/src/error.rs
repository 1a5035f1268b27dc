//! Internal error types for LM Studio calls.
//!
//! These errors are internal to `lmbridge-backend` and are mapped to
//! [`BackendError`] at the port boundary.

use std::time::Duration;

use lmbridge_core::BackendError;
use thiserror::Error;

/// Result type alias for LM Studio operations.
pub type LmStudioResult<T> = Result<T, LmStudioError>;

/// Errors related to LM Studio API calls.
#[derive(Debug, Error)]
pub enum LmStudioError {
    /// LM Studio answered with a non-success status.
    #[error("LM Studio request failed with status {status}: {message}")]
    ApiRequestFailed { status: u16, message: String },

    /// The call exceeded its time bound.
    #[error("LM Studio did not respond within {0:?}")]
    Timeout(Duration),

    /// The response could not be understood.
    #[error("Invalid response from LM Studio: {message}")]
    InvalidResponse { message: String },

    /// The concurrency limiter was shut down.
    #[error("LM Studio client is shutting down")]
    Closed,

    /// Network or HTTP client error.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// JSON parsing error.
    #[error("JSON parsing error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl LmStudioError {
    /// Classify a reqwest error, attributing timeouts to the bound in force.
    pub(crate) fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            Self::Timeout(timeout)
        } else if err.is_decode() {
            Self::InvalidResponse {
                message: err.to_string(),
            }
        } else {
            Self::Network(err)
        }
    }
}

impl From<LmStudioError> for BackendError {
    fn from(err: LmStudioError) -> Self {
        match err {
            LmStudioError::ApiRequestFailed { status, message } => Self::Status { status, message },
            LmStudioError::Timeout(after) => Self::Timeout(after),
            LmStudioError::InvalidResponse { message } => Self::InvalidResponse(message),
            LmStudioError::JsonParse(e) => Self::InvalidResponse(e.to_string()),
            LmStudioError::Closed => Self::Unreachable("LM Studio client is shutting down".to_string()),
            LmStudioError::Network(e) => Self::Unreachable(describe_network_error(&e)),
        }
    }
}

/// A short, user-facing description of a transport failure.
fn describe_network_error(err: &reqwest::Error) -> String {
    if err.is_connect() {
        let target = err
            .url()
            .map_or_else(String::new, |url| format!(" at {}", url.origin().ascii_serialization()));
        format!("could not connect to LM Studio{target}; is the local server running?")
    } else {
        err.to_string()
    }
}
