//! Streaming relay - lifecycle of one completion call.
//!
//! Both modes share validation and model resolution. In streaming mode the
//! relay pulls backend events one at a time and re-emits each as a [`Chunk`]
//! immediately, so the caller sees backend order with no batching. Every
//! relayed stream ends with exactly one terminal chunk: the backend's own
//! finish, or a synthesized `error` chunk when the backend drops, goes idle,
//! or reports an error mid-stream.
//!
//! Dropping the returned stream drops the backend stream with it, which
//! aborts the backend call.

use std::sync::Arc;
use std::time::Duration;

use async_stream::stream;
use futures_util::StreamExt;
use tracing::{debug, info, warn};

use crate::domain::{
    Chunk, ChunkStream, CompletionRequest, CompletionResult, FinishReason, ModelDescriptor,
};
use crate::error::GatewayError;
use crate::ports::{BackendChunkStream, BackendPort, BackendStreamEvent};
use crate::services::model_registry::ModelRegistry;
use crate::services::translator::RequestTranslator;
use crate::settings::SettingsStore;

/// Lifecycle of a single relayed call.
///
/// `Idle -> Requesting -> Streaming -> {Completed, Failed}` when streaming,
/// `Idle -> Requesting -> {Completed, Failed}` otherwise. Terminal states
/// are final; the relay never retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    Idle,
    Requesting,
    Streaming,
    Completed,
    Failed,
}

impl RelayState {
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Requesting)
                | (
                    Self::Requesting,
                    Self::Streaming | Self::Completed | Self::Failed
                )
                | (Self::Streaming, Self::Completed | Self::Failed)
        )
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Tracks the state of one call and reports abandoned calls on drop.
#[derive(Debug)]
struct Lifecycle {
    model: String,
    state: RelayState,
}

impl Lifecycle {
    fn start(model: &str) -> Self {
        let mut lifecycle = Self {
            model: model.to_string(),
            state: RelayState::Idle,
        };
        lifecycle.advance(RelayState::Requesting);
        lifecycle
    }

    fn advance(&mut self, next: RelayState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid relay transition {:?} -> {next:?}",
            self.state
        );
        debug!(model = %self.model, from = ?self.state, to = ?next, "Relay state change");
        self.state = next;
    }

    fn fail(&mut self, error: &GatewayError) {
        warn!(model = %self.model, error = %error, "Completion failed");
        self.advance(RelayState::Failed);
    }
}

impl Drop for Lifecycle {
    fn drop(&mut self) {
        if !self.state.is_terminal() {
            info!(
                model = %self.model,
                state = ?self.state,
                "Client disconnected, cancelling backend call"
            );
        }
    }
}

/// A completion result together with the model that produced it.
#[derive(Debug)]
pub struct CompletionOutcome {
    pub model: ModelDescriptor,
    pub result: CompletionResult,
}

/// Runs completion calls against the backend.
pub struct StreamingRelay {
    backend: Arc<dyn BackendPort>,
    registry: Arc<ModelRegistry>,
    settings: Arc<SettingsStore>,
}

impl StreamingRelay {
    pub fn new(
        backend: Arc<dyn BackendPort>,
        registry: Arc<ModelRegistry>,
        settings: Arc<SettingsStore>,
    ) -> Self {
        Self {
            backend,
            registry,
            settings,
        }
    }

    /// Validate, resolve, translate and forward one request.
    ///
    /// Errors returned here happen before any output exists and map to an
    /// HTTP status. Once a stream is returned, failures only show up as its
    /// terminal `error` chunk.
    pub async fn execute(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionOutcome, GatewayError> {
        let validated = RequestTranslator::validate(request)?;
        let model = self
            .registry
            .resolve(validated.requested_model.as_deref())
            .await?;

        let settings = self.settings.snapshot();
        let backend_request =
            RequestTranslator::from_settings(&settings).to_backend_request(&validated, &model);

        debug!(
            model = %model.id,
            streaming = %validated.stream,
            messages = backend_request.messages.len(),
            max_tokens = ?backend_request.max_tokens,
            "Forwarding completion"
        );

        let mut lifecycle = Lifecycle::start(&model.id);
        let request_timeout = settings.request_timeout();

        if validated.stream {
            let upstream = match tokio::time::timeout(
                request_timeout,
                self.backend.complete_stream(backend_request),
            )
            .await
            {
                Ok(Ok(upstream)) => upstream,
                Ok(Err(e)) => {
                    let error = GatewayError::from(e);
                    lifecycle.fail(&error);
                    return Err(error);
                }
                Err(_) => {
                    let error = timed_out(request_timeout);
                    lifecycle.fail(&error);
                    return Err(error);
                }
            };

            lifecycle.advance(RelayState::Streaming);
            let chunks = relay_chunks(upstream, settings.stream_idle_timeout(), lifecycle);
            return Ok(CompletionOutcome {
                model,
                result: CompletionResult::Stream(chunks),
            });
        }

        let response =
            match tokio::time::timeout(request_timeout, self.backend.complete(backend_request))
                .await
            {
                Ok(Ok(response)) => response,
                Ok(Err(e)) => {
                    let error = GatewayError::from(e);
                    lifecycle.fail(&error);
                    return Err(error);
                }
                Err(_) => {
                    let error = timed_out(request_timeout);
                    lifecycle.fail(&error);
                    return Err(error);
                }
            };

        lifecycle.advance(RelayState::Completed);
        Ok(CompletionOutcome {
            model,
            result: CompletionResult::Complete(RequestTranslator::from_backend_response(response)),
        })
    }
}

fn timed_out(after: Duration) -> GatewayError {
    GatewayError::BackendUnreachable {
        reason: format!("no response from backend within {after:?}"),
        timed_out: true,
    }
}

/// Re-emit backend events as indexed chunks, ending with one terminal chunk.
///
/// Each pull from the backend is bounded by `idle_timeout`. Content-less
/// non-terminal events (role announcements, keep-alives) are skipped.
fn relay_chunks(
    mut upstream: BackendChunkStream,
    idle_timeout: Duration,
    mut lifecycle: Lifecycle,
) -> ChunkStream {
    Box::pin(stream! {
        let mut index: u64 = 0;

        loop {
            let interruption = match tokio::time::timeout(idle_timeout, upstream.next()).await {
                Ok(Some(Ok(BackendStreamEvent::Chunk(chunk)))) => {
                    let finish_reason = chunk
                        .finish_reason
                        .as_deref()
                        .map(|raw| FinishReason::map_backend(Some(raw)));
                    let delta = chunk.content.unwrap_or_default();

                    if finish_reason.is_none() && delta.is_empty() {
                        continue;
                    }

                    let chunk = Chunk { index, delta, finish_reason };
                    index += 1;

                    if chunk.is_terminal() {
                        lifecycle.advance(RelayState::Completed);
                        yield chunk;
                        break;
                    }
                    yield chunk;
                    continue;
                }
                Ok(Some(Ok(BackendStreamEvent::Done))) => {
                    lifecycle.advance(RelayState::Completed);
                    yield Chunk::terminal(index, FinishReason::Stop);
                    break;
                }
                Ok(Some(Err(e))) => e.to_string(),
                Ok(None) => "backend closed the stream without an end marker".to_string(),
                Err(_) => format!("no data from backend for {idle_timeout:?}"),
            };

            lifecycle.fail(&GatewayError::StreamInterrupted(interruption));
            yield Chunk::terminal(index, FinishReason::Error);
            break;
        }
    })
}
