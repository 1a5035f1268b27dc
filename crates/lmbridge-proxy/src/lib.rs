//! OpenAI-compatible HTTP surface for lmbridge.
//!
//! Routes:
//!
//! | Route | Purpose |
//! |-------|---------|
//! | `POST /v1/chat/completions` | Chat completions, JSON or SSE |
//! | `GET /v1/models` | Model registry snapshot |
//! | `GET /health` | Backend probe; 200 or 503 |
//! | `GET /config`, `POST /config` | Live gateway settings |
//! | `POST /ask` | Legacy single-prompt endpoint |
//! | `GET /` | Service information |

#![deny(unsafe_code)]

pub mod error;
pub mod handlers;
pub mod models;
pub mod server;
pub mod state;
pub mod stream;

pub use error::HttpError;
pub use server::{create_router, serve};
pub use state::AppState;
