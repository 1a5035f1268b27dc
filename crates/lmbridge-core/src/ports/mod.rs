//! Port definitions (trait abstractions) for external systems.
//!
//! Ports define the interfaces that the core expects from infrastructure.
//! They contain no implementation details and use only domain types.

pub mod backend;

pub use backend::{
    BackendChunk, BackendChunkStream, BackendError, BackendMessage, BackendPort, BackendRequest,
    BackendResponse, BackendStreamEvent,
};

#[cfg(test)]
pub use backend::MockBackendPort;
