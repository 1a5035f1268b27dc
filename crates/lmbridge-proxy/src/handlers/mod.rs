//! Route handlers.

mod chat;
mod config;
mod health;
mod info;
mod models;

pub use chat::{ask, chat_completions};
pub use config::{get_config, update_config};
pub use health::health_check;
pub use info::service_info;
pub use models::list_models;
