//! Domain types shared by every layer of the gateway.
//!
//! These are plain data types: no HTTP, no I/O. Wire shapes that only one
//! adapter cares about (OpenAI response envelopes, LM Studio JSON) live in
//! that adapter.

pub mod chat;
pub mod completion;
pub mod health;
pub mod model;

pub use chat::{ChatMessage, CompletionRequest, ContentPart, MessageContent, Role, StopSequences};
pub use completion::{
    Chunk, ChunkStream, CompletionPayload, CompletionResult, FinishReason, TokenUsage,
};
pub use health::BackendHealth;
pub use model::{ModelDescriptor, ModelSnapshot};
