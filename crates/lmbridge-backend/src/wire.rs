//! LM Studio JSON shapes.
//!
//! LM Studio's `/v1` surface is OpenAI-compatible, so these are trimmed
//! OpenAI response types. Unknown fields are ignored.

use lmbridge_core::{BackendChunk, BackendResponse, ModelDescriptor, TokenUsage};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{LmStudioError, LmStudioResult};

/// `GET /v1/models`
#[derive(Debug, Deserialize)]
pub(crate) struct ModelsResponse {
    #[serde(default)]
    pub data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ModelEntry {
    pub id: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ModelEntry {
    /// Entries with a `state` field are loaded only when it says so; the
    /// plain OpenAI listing has no `state` and lists loaded models only.
    pub fn into_descriptor(self) -> ModelDescriptor {
        let loaded = self
            .extra
            .get("state")
            .and_then(Value::as_str)
            .is_none_or(|state| state.eq_ignore_ascii_case("loaded"));

        let descriptor = ModelDescriptor::new(self.id).with_metadata(self.extra);
        ModelDescriptor {
            loaded,
            ..descriptor
        }
    }
}

/// `POST /v1/chat/completions` with `stream: false`.
#[derive(Debug, Deserialize)]
pub(crate) struct ChatResponse {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
    #[serde(default)]
    pub usage: Option<TokenUsage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatChoice {
    #[serde(default)]
    pub message: Option<ChoiceMessage>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatResponse {
    pub fn into_backend_response(self) -> LmStudioResult<BackendResponse> {
        let choice = self
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LmStudioError::InvalidResponse {
                message: "response has no choices".to_string(),
            })?;

        Ok(BackendResponse {
            model: self.model,
            content: choice
                .message
                .and_then(|m| m.content)
                .unwrap_or_default(),
            finish_reason: choice.finish_reason,
            usage: self.usage,
        })
    }
}

/// One `data:` frame of the completion stream.
#[derive(Debug, Deserialize)]
pub(crate) struct StreamFrame {
    #[serde(default)]
    pub choices: Vec<StreamChoice>,
    #[serde(default)]
    pub error: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StreamChoice {
    #[serde(default)]
    pub delta: Option<StreamDelta>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StreamDelta {
    #[serde(default)]
    pub content: Option<String>,
}

impl StreamFrame {
    /// The first choice as a backend chunk; `None` for frames without
    /// choices (usage-only frames).
    pub fn into_chunk(self) -> Option<BackendChunk> {
        let choice = self.choices.into_iter().next()?;
        Some(BackendChunk {
            content: choice.delta.and_then(|d| d.content),
            finish_reason: choice.finish_reason,
        })
    }
}

/// Extract a human-readable message from an error body.
///
/// LM Studio sends `{"error": "..."}`; OpenAI-style servers send
/// `{"error": {"message": "..."}}`. Anything else is returned trimmed.
pub(crate) fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|json| json.get("error").map(error_value_message))
        .unwrap_or_else(|| body.trim().to_string())
}

/// Message text of an `error` JSON value.
pub(crate) fn error_value_message(error: &Value) -> String {
    match error {
        Value::String(message) => message.clone(),
        other => other
            .get("message")
            .and_then(Value::as_str)
            .map_or_else(|| other.to_string(), str::to_string),
    }
}
