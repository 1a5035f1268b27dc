//! Inference backend port.
//!
//! This port is the only way the core talks to the model runtime. The
//! production implementation is `LmStudioClient` in `lmbridge-backend`;
//! tests use the generated `MockBackendPort`.
//!
//! Implementations must bound every call by a timeout, report timeouts and
//! refused connections as [`BackendError::Timeout`] /
//! [`BackendError::Unreachable`], and never retry on their own.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{ModelDescriptor, Role, StopSequences, TokenUsage};

/// A message as the backend receives it: plain text only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendMessage {
    pub role: Role,
    pub content: String,
}

/// Request body for the backend's chat-completions endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendRequest {
    /// Resolved backend model identifier.
    pub model: String,
    pub messages: Vec<BackendMessage>,
    pub temperature: f64,
    /// Already clamped to the configured ceiling.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    pub stream: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<StopSequences>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

/// A complete, non-streamed backend answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendResponse {
    /// Model the backend says produced the answer.
    pub model: Option<String>,
    pub content: String,
    /// Raw backend finish reason, unmapped.
    pub finish_reason: Option<String>,
    pub usage: Option<TokenUsage>,
}

/// One decoded event of the backend stream.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BackendChunk {
    pub content: Option<String>,
    /// Raw backend finish reason, unmapped.
    pub finish_reason: Option<String>,
}

/// Items of a backend stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendStreamEvent {
    Chunk(BackendChunk),
    /// The backend's explicit end-of-stream marker.
    Done,
}

/// Lazy sequence of backend stream events.
///
/// The stream ending without [`BackendStreamEvent::Done`] means the
/// connection dropped. Dropping the stream must abort the backend call.
pub type BackendChunkStream = BoxStream<'static, Result<BackendStreamEvent, BackendError>>;

/// Errors reported by a backend implementation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    /// Connection refused, reset, or DNS failure.
    #[error("Backend unreachable: {0}")]
    Unreachable(String),

    /// The call did not finish within its time bound.
    #[error("Backend did not respond within {0:?}")]
    Timeout(Duration),

    /// The backend answered with a non-success HTTP status.
    #[error("Backend returned status {status}: {message}")]
    Status { status: u16, message: String },

    /// The backend answered with something that could not be decoded.
    #[error("Invalid backend response: {0}")]
    InvalidResponse(String),
}

impl BackendError {
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

/// Port for the inference backend.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BackendPort: Send + Sync {
    /// List the models the backend reports, bounded by `timeout`.
    ///
    /// Takes the timeout explicitly so health probes can use a shorter
    /// bound than completions.
    async fn list_models(&self, timeout: Duration) -> Result<Vec<ModelDescriptor>, BackendError>;

    /// Submit a non-streaming completion.
    async fn complete(&self, request: BackendRequest) -> Result<BackendResponse, BackendError>;

    /// Submit a streaming completion.
    ///
    /// Errors returned here happen before any output exists; errors inside
    /// the stream happen mid-generation.
    async fn complete_stream(
        &self,
        request: BackendRequest,
    ) -> Result<BackendChunkStream, BackendError>;
}
