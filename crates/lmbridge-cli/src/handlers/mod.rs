//! Command handlers.
//!
//! Handlers take the composed `CliContext`, call into the core services and
//! format output for the terminal.

pub mod check;
pub mod serve;
