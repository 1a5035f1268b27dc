//! Gateway error taxonomy.
//!
//! Every failure a client can observe maps to one of these variants.
//! Failures before the first response byte become an HTTP status plus a
//! structured body; failures after streaming began become an in-stream
//! terminal chunk and never surface as a `GatewayError`.

use thiserror::Error;

use crate::ports::BackendError;

/// Errors surfaced by the core services.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    /// Malformed or missing fields in the inbound request. Never reaches the backend.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The backend answered the model poll but has nothing loaded.
    #[error("No model is loaded in the backend. Load a model in LM Studio and retry.")]
    NoModelLoaded,

    /// The backend could not be reached, timed out, or sent garbage.
    #[error("Backend unreachable: {reason}")]
    BackendUnreachable {
        reason: String,
        /// Whether the failure was a timeout (504) rather than a connection failure (502).
        timed_out: bool,
    },

    /// The backend answered with an error status (e.g. context length exceeded).
    #[error("Backend rejected the request ({status}): {message}")]
    BackendRejected { status: u16, message: String },

    /// The backend stream ended abnormally after output had started.
    #[error("Stream interrupted: {0}")]
    StreamInterrupted(String),
}

impl GatewayError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Returns a suggested HTTP status code for this error.
    #[must_use]
    pub fn suggested_status_code(&self) -> u16 {
        match self {
            Self::InvalidRequest(_) => 400,
            Self::NoModelLoaded => 503,
            Self::BackendUnreachable { timed_out: true, .. } => 504,
            Self::BackendUnreachable { timed_out: false, .. } | Self::StreamInterrupted(_) => 502,
            Self::BackendRejected { status, .. } if (400..=599).contains(status) => *status,
            Self::BackendRejected { .. } => 502,
        }
    }

    /// Returns true if the caller may succeed by retrying the same request later.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::NoModelLoaded | Self::BackendUnreachable { .. })
    }
}

impl From<BackendError> for GatewayError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Status { status, message } => Self::BackendRejected { status, message },
            BackendError::Timeout(_) => Self::BackendUnreachable {
                reason: err.to_string(),
                timed_out: true,
            },
            BackendError::Unreachable(_) | BackendError::InvalidResponse(_) => {
                Self::BackendUnreachable {
                    reason: err.to_string(),
                    timed_out: false,
                }
            }
        }
    }
}
