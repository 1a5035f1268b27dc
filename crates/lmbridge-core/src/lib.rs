//! Core domain, ports and services for lmbridge.
//!
//! lmbridge is a local gateway that speaks the OpenAI chat-completions
//! contract to editors and forwards the work to an LM Studio inference
//! backend. This crate holds everything that does not depend on a
//! particular HTTP stack:
//!
//! - [`domain`]: requests, model descriptors, completion results, health
//! - [`ports`]: the [`BackendPort`] trait the HTTP client implements
//! - [`services`]: model registry, request translator, streaming relay,
//!   health monitor
//! - [`settings`]: tunable gateway parameters and their live store
//! - [`error`]: the gateway error taxonomy
//!
//! Adapters (`lmbridge-backend`, `lmbridge-proxy`, `lmbridge-cli`) depend on
//! this crate; it depends on none of them.

#![deny(unsafe_code)]

pub mod domain;
pub mod error;
pub mod ports;
pub mod services;
pub mod settings;

pub use domain::{
    BackendHealth, ChatMessage, Chunk, ChunkStream, CompletionPayload, CompletionRequest,
    CompletionResult, FinishReason, MessageContent, ModelDescriptor, ModelSnapshot, Role,
    StopSequences, TokenUsage,
};
pub use error::GatewayError;
pub use ports::{
    BackendChunk, BackendChunkStream, BackendError, BackendMessage, BackendPort, BackendRequest,
    BackendResponse, BackendStreamEvent,
};
pub use services::{
    CompletionOutcome, HealthMonitor, ModelRegistry, RelayState, RequestTranslator,
    StreamingRelay, ValidatedRequest,
};
pub use settings::{GatewaySettings, SettingsError, SettingsStore, SettingsUpdate};
