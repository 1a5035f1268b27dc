//! Completion results: terminal payloads and streamed chunks.

use std::fmt;

use futures_util::stream::BoxStream;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Why a completion ended, as reported to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FinishReason {
    /// Natural end of generation or a stop sequence.
    Stop,
    /// Token budget or context window exhausted.
    Length,
    /// Generation ended abnormally (backend dropped, idle timeout).
    Error,
}

impl FinishReason {
    /// Wire name of the reason.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stop => "stop",
            Self::Length => "length",
            Self::Error => "error",
        }
    }

    /// Map a known backend finish reason, or `None` if the value is unrecognized.
    pub fn from_backend(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            // OpenAI vocabulary plus LM Studio's native stop reasons.
            "stop" | "eos" | "eos_token" | "stop_sequence" | "end_turn" | "tool_calls"
            | "function_call" | "eosfound" | "stopstringfound" | "userstopped" => Some(Self::Stop),
            "length" | "max_tokens" | "context_length" | "model_length"
            | "maxpredictedtokensreached" | "contextlengthreached" => Some(Self::Length),
            "error" | "abort" | "aborted" | "cancelled" | "failed" => Some(Self::Error),
            _ => None,
        }
    }

    /// Map an optional backend finish reason onto the closed client enum.
    ///
    /// A missing reason means the backend finished normally. Unrecognized
    /// values become `Stop` and are logged so the vocabulary can be extended.
    pub fn map_backend(raw: Option<&str>) -> Self {
        match raw {
            None => Self::Stop,
            Some(value) => Self::from_backend(value).unwrap_or_else(|| {
                warn!(finish_reason = %value, "Unmapped backend finish reason, treating as stop");
                Self::Stop
            }),
        }
    }
}

impl fmt::Display for FinishReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Token accounting reported by the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// One incremental unit of a streamed completion.
///
/// Within one stream, indices start at 0 and increase by one; exactly the
/// last chunk carries a `finish_reason`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub index: u64,
    pub delta: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReason>,
}

impl Chunk {
    pub fn content(index: u64, delta: impl Into<String>) -> Self {
        Self {
            index,
            delta: delta.into(),
            finish_reason: None,
        }
    }

    /// A chunk with no text that ends the stream.
    pub const fn terminal(index: u64, reason: FinishReason) -> Self {
        Self {
            index,
            delta: String::new(),
            finish_reason: Some(reason),
        }
    }

    pub const fn is_terminal(&self) -> bool {
        self.finish_reason.is_some()
    }
}

/// A finished non-streaming completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionPayload {
    pub content: String,
    pub finish_reason: FinishReason,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
}

/// Lazy, finite, non-restartable sequence of chunks.
pub type ChunkStream = BoxStream<'static, Chunk>;

/// Output of one completion call.
pub enum CompletionResult {
    /// `stream = false`: the whole answer at once.
    Complete(CompletionPayload),
    /// `stream = true`: chunks in backend order, ending with a terminal chunk.
    Stream(ChunkStream),
}

impl fmt::Debug for CompletionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Complete(payload) => f.debug_tuple("Complete").field(payload).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}
