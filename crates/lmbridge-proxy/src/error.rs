//! HTTP error mapping.
//!
//! Every failure that happens before the first response byte is rendered as
//! an OpenAI-style error body with the status from
//! [`GatewayError::suggested_status_code`].

use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use lmbridge_core::{GatewayError, SettingsError};
use thiserror::Error;

use crate::models::ErrorResponse;

/// Proxy error type.
#[derive(Debug, Error)]
pub enum HttpError {
    /// The request body was not valid JSON for the endpoint.
    #[error("Invalid request body: {0}")]
    MalformedBody(String),

    /// A settings update failed validation.
    #[error("Invalid configuration: {0}")]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

impl HttpError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MalformedBody(_) | Self::Settings(_) => StatusCode::BAD_REQUEST,
            Self::Gateway(err) => StatusCode::from_u16(err.suggested_status_code())
                .unwrap_or(StatusCode::BAD_GATEWAY),
        }
    }

    fn body(&self) -> ErrorResponse {
        let message = self.to_string();
        match self {
            Self::MalformedBody(_) => {
                ErrorResponse::with_code(message, "invalid_request_error", "invalid_json")
            }
            Self::Settings(_) => {
                ErrorResponse::with_code(message, "invalid_request_error", "invalid_config")
            }
            Self::Gateway(err) => match err {
                GatewayError::InvalidRequest(_) => {
                    ErrorResponse::with_code(message, "invalid_request_error", "invalid_request")
                }
                GatewayError::NoModelLoaded => {
                    ErrorResponse::with_code(message, "service_unavailable", "no_model_loaded")
                }
                GatewayError::BackendUnreachable { timed_out, .. } => ErrorResponse::with_code(
                    message,
                    "server_error",
                    if *timed_out {
                        "backend_timeout"
                    } else {
                        "backend_unreachable"
                    },
                ),
                GatewayError::BackendRejected { status, .. } => ErrorResponse::with_code(
                    message,
                    if (400..500).contains(status) {
                        "invalid_request_error"
                    } else {
                        "server_error"
                    },
                    "backend_rejected",
                ),
                GatewayError::StreamInterrupted(_) => {
                    ErrorResponse::with_code(message, "server_error", "stream_interrupted")
                }
            },
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut response = (status, Json(self.body())).into_response();

        if status == StatusCode::SERVICE_UNAVAILABLE {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from_static("5"));
        }

        response
    }
}
