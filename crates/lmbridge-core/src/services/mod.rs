//! Core services.
//!
//! Services orchestrate between the [`BackendPort`](crate::ports::BackendPort)
//! and domain logic. They hold no HTTP types and know nothing about the
//! concrete backend client.

mod health_monitor;
mod model_registry;
mod relay;
mod translator;

pub use health_monitor::HealthMonitor;
pub use model_registry::{ModelRegistry, resolve_in};
pub use relay::{CompletionOutcome, RelayState, StreamingRelay};
pub use translator::{RequestTranslator, ValidatedRequest};
