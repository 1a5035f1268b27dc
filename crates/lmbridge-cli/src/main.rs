//! CLI entry point.

use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use lmbridge_cli::{Cli, CliConfig, CliError, Commands, FileConfig, bootstrap, handlers};

/// `RUST_LOG` wins; otherwise `info`, or `debug` with `--verbose`.
fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let file = FileConfig::load(&cli.config)?;

    match command {
        Commands::Serve {
            host,
            port,
            backend_url,
            skip_checks,
        } => {
            let config = CliConfig::from_file(&file).with_overrides(host, port, backend_url);
            let ctx = bootstrap(config)?;
            handlers::serve::execute(&ctx, skip_checks).await?;
        }
        Commands::Check { backend_url } => {
            let config = CliConfig::from_file(&file).with_overrides(None, None, backend_url);
            let ctx = bootstrap(config)?;
            handlers::check::execute(&ctx).await?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        let code = e.downcast_ref::<CliError>().map_or(1, CliError::exit_code);
        std::process::exit(code);
    }
}
