//! Command-line entry point for lmbridge.
//!
//! `lmbridge serve` runs the gateway; `lmbridge check` probes LM Studio.
//! Settings come from a JSON config file (default `config.json`) with CLI
//! flags taking precedence.

#![deny(unsafe_code)]

pub mod bootstrap;
pub mod commands;
pub mod config;
pub mod error;
pub mod handlers;
pub mod parser;

pub use bootstrap::{CliConfig, CliContext, bootstrap};
pub use commands::Commands;
pub use config::FileConfig;
pub use error::CliError;
pub use parser::Cli;
