//! Main CLI parser and top-level argument handling.

use std::path::PathBuf;

use clap::Parser;

use crate::commands::Commands;
use crate::config::DEFAULT_CONFIG_PATH;

/// OpenAI-compatible gateway in front of a local LM Studio server.
#[derive(Parser)]
#[command(name = "lmbridge")]
#[command(about = "OpenAI-compatible gateway for LM Studio")]
#[command(version)]
pub struct Cli {
    /// Configuration file path
    #[arg(short = 'c', long = "config", global = true, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}
