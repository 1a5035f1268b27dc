//! `LmStudioClient` - reqwest implementation of [`BackendPort`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lmbridge_core::{
    BackendChunkStream, BackendError, BackendPort, BackendRequest, BackendResponse,
    ModelDescriptor, SettingsStore,
};
use reqwest::{RequestBuilder, Response};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::debug;

use crate::config::LmStudioClientConfig;
use crate::error::{LmStudioError, LmStudioResult};
use crate::sse::decode_events;
use crate::wire::{ChatResponse, ModelsResponse, error_message};

/// HTTP client for the LM Studio local server.
///
/// The backend URL and timeouts are read from the settings store on every
/// call. Completion calls share a semaphore sized by
/// [`LmStudioClientConfig::with_max_concurrent`]; a streaming call holds its
/// permit until the stream is dropped. Model listing takes no permit so
/// health probes never queue behind generations.
pub struct LmStudioClient {
    http: reqwest::Client,
    settings: Arc<SettingsStore>,
    permits: Arc<Semaphore>,
}

impl LmStudioClient {
    pub fn new(settings: Arc<SettingsStore>, config: &LmStudioClientConfig) -> LmStudioResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(config.max_concurrent)
            .build()?;

        Ok(Self {
            http,
            settings,
            permits: Arc::new(Semaphore::new(config.max_concurrent)),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.settings.snapshot().api_base())
    }

    async fn acquire(&self) -> LmStudioResult<OwnedSemaphorePermit> {
        Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| LmStudioError::Closed)
    }

    async fn fetch_models(&self, timeout: Duration) -> LmStudioResult<Vec<ModelDescriptor>> {
        let request = self.http.get(self.endpoint("models")).timeout(timeout);
        let response = send_checked(request, timeout).await?;
        let body = response
            .bytes()
            .await
            .map_err(|e| LmStudioError::from_reqwest(e, timeout))?;
        let models: ModelsResponse = serde_json::from_slice(&body)?;

        Ok(models
            .data
            .into_iter()
            .map(crate::wire::ModelEntry::into_descriptor)
            .collect())
    }

    async fn fetch_completion(&self, request: &BackendRequest) -> LmStudioResult<BackendResponse> {
        let timeout = self.settings.snapshot().request_timeout();

        let call = async {
            let _permit = self.acquire().await?;
            let builder = self
                .http
                .post(self.endpoint("chat/completions"))
                .json(request)
                .timeout(timeout);
            let response = send_checked(builder, timeout).await?;
            let body = response
                .bytes()
                .await
                .map_err(|e| LmStudioError::from_reqwest(e, timeout))?;
            serde_json::from_slice::<ChatResponse>(&body)?.into_backend_response()
        };

        tokio::time::timeout(timeout, call)
            .await
            .map_err(|_| LmStudioError::Timeout(timeout))?
    }

    async fn open_stream(&self, request: &BackendRequest) -> LmStudioResult<BackendChunkStream> {
        let timeout = self.settings.snapshot().request_timeout();

        // Only the wait for headers is bounded here; the body is governed by
        // the relay's idle timeout.
        let opened = async {
            let permit = self.acquire().await?;
            let builder = self
                .http
                .post(self.endpoint("chat/completions"))
                .json(request);
            let response = send_checked(builder, timeout).await?;
            Ok::<_, LmStudioError>((response, permit))
        };

        let (response, permit) = tokio::time::timeout(timeout, opened)
            .await
            .map_err(|_| LmStudioError::Timeout(timeout))??;

        Ok(decode_events(response.bytes_stream(), permit))
    }
}

/// Send a request and turn non-success statuses into `ApiRequestFailed`
/// with the backend's own message.
async fn send_checked(request: RequestBuilder, timeout: Duration) -> LmStudioResult<Response> {
    let response = request
        .send()
        .await
        .map_err(|e| LmStudioError::from_reqwest(e, timeout))?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = error_message(&body);
    debug!(status = status.as_u16(), message = %message, "LM Studio rejected request");

    Err(LmStudioError::ApiRequestFailed {
        status: status.as_u16(),
        message: if message.is_empty() {
            status.canonical_reason().unwrap_or("error").to_string()
        } else {
            message
        },
    })
}

#[async_trait]
impl BackendPort for LmStudioClient {
    async fn list_models(&self, timeout: Duration) -> Result<Vec<ModelDescriptor>, BackendError> {
        self.fetch_models(timeout).await.map_err(BackendError::from)
    }

    async fn complete(&self, request: BackendRequest) -> Result<BackendResponse, BackendError> {
        debug!(model = %request.model, "Submitting completion");
        self.fetch_completion(&request)
            .await
            .map_err(BackendError::from)
    }

    async fn complete_stream(
        &self,
        request: BackendRequest,
    ) -> Result<BackendChunkStream, BackendError> {
        debug!(model = %request.model, "Opening completion stream");
        self.open_stream(&request).await.map_err(BackendError::from)
    }
}
