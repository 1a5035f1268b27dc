//! SSE framing of relay output.
//!
//! Each [`Chunk`] becomes one `data: <chat.completion.chunk json>\n\n` frame
//! written as soon as the relay yields it. After the terminal chunk the
//! literal `data: [DONE]\n\n` marker closes the stream.

use std::convert::Infallible;

use axum::body::Body;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use chrono::Utc;
use futures_util::{StreamExt, stream};
use lmbridge_core::{Chunk, ChunkStream};
use tracing::error;

use crate::models::{ChatChunkChoice, ChatCompletionChunk, ChatDelta};

/// End-of-stream marker consumed by editor clients. Must stay byte-exact.
pub const DONE_FRAME: &[u8] = b"data: [DONE]\n\n";

/// Per-stream values repeated in every frame.
#[derive(Debug, Clone)]
pub struct FrameHeader {
    pub id: String,
    pub created: i64,
    pub model: String,
}

impl FrameHeader {
    pub fn new(id: String, model: String) -> Self {
        Self {
            id,
            created: Utc::now().timestamp(),
            model,
        }
    }
}

/// Encode one chunk as an SSE frame. The first frame announces the role.
pub fn chunk_frame(frame: &FrameHeader, chunk: Chunk, first: bool) -> Bytes {
    let content = if chunk.delta.is_empty() && chunk.is_terminal() {
        None
    } else {
        Some(chunk.delta)
    };

    let payload = ChatCompletionChunk {
        id: frame.id.clone(),
        object: "chat.completion.chunk".to_string(),
        created: frame.created,
        model: frame.model.clone(),
        choices: vec![ChatChunkChoice {
            index: 0,
            delta: ChatDelta {
                role: first.then(|| "assistant".to_string()),
                content,
            },
            finish_reason: chunk.finish_reason,
        }],
    };

    match serde_json::to_string(&payload) {
        Ok(json) => Bytes::from(format!("data: {json}\n\n")),
        Err(e) => {
            error!(error = %e, "Failed to encode stream chunk");
            Bytes::new()
        }
    }
}

/// Build the streaming HTTP response for a relayed completion.
///
/// Dropping the body (client disconnect) drops `chunks`, which cancels the
/// backend call.
pub fn sse_response(chunks: ChunkStream, frame: FrameHeader) -> Response {
    let frames = chunks
        .enumerate()
        .map(move |(i, chunk)| Ok::<_, Infallible>(chunk_frame(&frame, chunk, i == 0)))
        .chain(stream::once(async {
            Ok::<_, Infallible>(Bytes::from_static(DONE_FRAME))
        }));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .header("x-accel-buffering", "no")
        .body(Body::from_stream(frames))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}
