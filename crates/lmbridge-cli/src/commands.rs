//! Available commands.

use clap::Subcommand;

#[derive(Subcommand)]
pub enum Commands {
    /// Run the gateway until Ctrl+C
    Serve {
        /// Host to bind to (overrides the config file)
        #[arg(long)]
        host: Option<String>,
        /// Port to bind to (overrides the config file)
        #[arg(short, long)]
        port: Option<u16>,
        /// LM Studio server URL (overrides the config file)
        #[arg(long, env = "LMBRIDGE_BACKEND_URL")]
        backend_url: Option<String>,
        /// Skip the LM Studio connection check
        #[arg(long)]
        skip_checks: bool,
    },

    /// Probe LM Studio and list loaded models
    Check {
        /// LM Studio server URL (overrides the config file)
        #[arg(long, env = "LMBRIDGE_BACKEND_URL")]
        backend_url: Option<String>,
    },
}
