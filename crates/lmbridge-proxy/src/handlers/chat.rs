//! Chat completion handlers.

use axum::Json;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use lmbridge_core::{ChatMessage, CompletionRequest, CompletionResult, GatewayError};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::HttpError;
use crate::models::{AskRequest, AskResponse, ChatCompletionResponse};
use crate::state::AppState;
use crate::stream::{FrameHeader, sse_response};

fn completion_id() -> String {
    format!("chatcmpl-{}", Uuid::new_v4().simple())
}

/// `POST /v1/chat/completions`
///
/// Any `Authorization` header is accepted and ignored.
pub async fn chat_completions(State(state): State<AppState>, body: Bytes) -> Response {
    debug!("POST /v1/chat/completions");

    let request: CompletionRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            warn!(error = %e, "Failed to parse request");
            return HttpError::MalformedBody(e.to_string()).into_response();
        }
    };

    info!(
        model = ?request.model,
        streaming = %request.stream,
        messages = request.messages.len(),
        "Processing chat completion request"
    );

    let outcome = match state.relay.execute(request).await {
        Ok(outcome) => outcome,
        Err(e) => return HttpError::from(e).into_response(),
    };

    let id = completion_id();
    match outcome.result {
        CompletionResult::Complete(payload) => {
            Json(ChatCompletionResponse::from_payload(id, outcome.model.id, payload)).into_response()
        }
        CompletionResult::Stream(chunks) => {
            sse_response(chunks, FrameHeader::new(id, outcome.model.id))
        }
    }
}

/// `POST /ask`: legacy single-prompt endpoint.
///
/// Shares validation, resolution and the non-streaming relay path with
/// chat completions. Gateway failures are reported as `{"error": ...}`
/// with status 200; only an unparseable body is an HTTP error.
pub async fn ask(State(state): State<AppState>, body: Bytes) -> Response {
    debug!("POST /ask");

    let ask: AskRequest = match serde_json::from_slice(&body) {
        Ok(ask) => ask,
        Err(e) => return HttpError::MalformedBody(e.to_string()).into_response(),
    };

    let request = CompletionRequest {
        model: ask.model,
        max_tokens: ask.max_tokens,
        temperature: ask.temperature,
        ..CompletionRequest::new(vec![ChatMessage::user(ask.prompt)])
    };

    let answer = match state.relay.execute(request).await {
        Ok(outcome) => match outcome.result {
            CompletionResult::Complete(payload) => AskResponse::Response(payload.content),
            CompletionResult::Stream(_) => AskResponse::Error(
                GatewayError::invalid("streaming is not supported on /ask").to_string(),
            ),
        },
        Err(e) => AskResponse::Error(e.to_string()),
    };

    Json(answer).into_response()
}
