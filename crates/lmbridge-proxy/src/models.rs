//! OpenAI API data models for request/response handling.
//!
//! Domain types live in `lmbridge-core`; this module handles the API layer
//! mapping. Inbound chat requests deserialize straight into
//! [`CompletionRequest`](lmbridge_core::CompletionRequest).

use chrono::{DateTime, Utc};
use lmbridge_core::{
    BackendHealth, CompletionPayload, FinishReason, GatewaySettings, ModelDescriptor, TokenUsage,
};
use serde::{Deserialize, Serialize};

// =============================================================================
// Chat Completion Response Types
// =============================================================================

/// Response from /v1/chat/completions endpoint (non-streaming).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionResponse {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<ChatChoice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
}

impl ChatCompletionResponse {
    pub fn from_payload(id: String, model: String, payload: CompletionPayload) -> Self {
        Self {
            id,
            object: "chat.completion".to_string(),
            created: Utc::now().timestamp(),
            model,
            choices: vec![ChatChoice {
                index: 0,
                message: AssistantMessage {
                    role: "assistant".to_string(),
                    content: payload.content,
                },
                finish_reason: Some(payload.finish_reason),
            }],
            usage: payload.usage,
        }
    }
}

/// A single chat completion choice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatChoice {
    pub index: u32,
    pub message: AssistantMessage,
    pub finish_reason: Option<FinishReason>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantMessage {
    pub role: String,
    pub content: String,
}

/// Streaming chunk from /v1/chat/completions endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionChunk {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<ChatChunkChoice>,
}

/// A single streaming choice. `finish_reason` is serialized as `null`
/// until the last chunk, as OpenAI clients expect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatChunkChoice {
    pub index: u32,
    pub delta: ChatDelta,
    pub finish_reason: Option<FinishReason>,
}

/// Delta content in streaming response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatDelta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

// =============================================================================
// Models Endpoint Types
// =============================================================================

/// Response from /v1/models endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ModelsResponse {
    pub object: String,
    pub data: Vec<ModelInfo>,
}

impl ModelsResponse {
    pub fn from_descriptors(models: &[ModelDescriptor]) -> Self {
        Self {
            object: "list".to_string(),
            data: models.iter().map(ModelInfo::from).collect(),
        }
    }
}

/// Information about a single model (OpenAI format).
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub owned_by: String,
}

impl From<&ModelDescriptor> for ModelInfo {
    fn from(model: &ModelDescriptor) -> Self {
        Self {
            id: model.id.clone(),
            object: "model".to_string(),
            created: model
                .metadata
                .get("created")
                .and_then(serde_json::Value::as_i64)
                .unwrap_or(0),
            owned_by: model
                .metadata
                .get("owned_by")
                .and_then(serde_json::Value::as_str)
                .unwrap_or("lm-studio")
                .to_string(),
        }
    }
}

// =============================================================================
// Legacy /ask Types
// =============================================================================

/// Request to the legacy /ask endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct AskRequest {
    pub prompt: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub max_tokens: Option<i64>,
    #[serde(default)]
    pub temperature: Option<f64>,
}

/// Response from the legacy /ask endpoint. Errors are reported in the body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AskResponse {
    Response(String),
    Error(String),
}

// =============================================================================
// Health / Config Types
// =============================================================================

/// Body of GET /health.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    #[serde(flatten)]
    pub health: BackendHealth,
}

impl From<BackendHealth> for HealthResponse {
    fn from(health: BackendHealth) -> Self {
        Self {
            status: if health.reachable { "healthy" } else { "unhealthy" },
            health,
        }
    }
}

/// Body of GET /config: live settings plus derived values.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigView {
    #[serde(flatten)]
    pub settings: GatewaySettings,
    pub api_base: String,
}

impl From<&GatewaySettings> for ConfigView {
    fn from(settings: &GatewaySettings) -> Self {
        Self {
            api_base: settings.api_base(),
            settings: settings.clone(),
        }
    }
}

/// Body of a successful POST /config.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigUpdated {
    pub status: &'static str,
    pub config: ConfigView,
}

/// Body of GET /.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub status: &'static str,
    pub backend_url: String,
    pub models_refreshed_at: Option<DateTime<Utc>>,
    pub endpoints: serde_json::Value,
}

// =============================================================================
// Error Response Types
// =============================================================================

/// Error response matching OpenAI format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

/// Error detail within an error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub message: String,
    pub r#type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ErrorResponse {
    /// Create an error response with a code.
    pub fn with_code(
        message: impl Into<String>,
        error_type: impl Into<String>,
        code: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorDetail {
                message: message.into(),
                r#type: error_type.into(),
                code: Some(code.into()),
            },
        }
    }
}
