//! LM Studio backend client for lmbridge.
//!
//! [`LmStudioClient`] implements the core's
//! [`BackendPort`](lmbridge_core::BackendPort) over LM Studio's
//! OpenAI-compatible `/v1` HTTP API: model listing, single-shot
//! completions, and SSE-streamed completions.

#![deny(unsafe_code)]

mod client;
mod config;
mod error;
mod sse;
mod wire;

pub use client::LmStudioClient;
pub use config::{DEFAULT_MAX_CONCURRENT, LmStudioClientConfig};
pub use error::{LmStudioError, LmStudioResult};
