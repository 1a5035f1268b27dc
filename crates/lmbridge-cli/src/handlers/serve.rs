//! Serve command handler.
//!
//! Runs the gateway until Ctrl+C, together with the background model
//! refresh loop and a health watch that logs reachability changes.

use std::sync::Arc;

use anyhow::{Context, Result};
use futures_util::StreamExt;
use lmbridge_core::HealthMonitor;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::bootstrap::CliContext;
use crate::handlers::check::print_health;

/// Execute the serve command.
///
/// Unless `skip_checks` is set, probes LM Studio first and prints the
/// result. An unreachable backend is reported but does not stop startup.
pub async fn execute(ctx: &CliContext, skip_checks: bool) -> Result<()> {
    println!("lmbridge v{}", env!("CARGO_PKG_VERSION"));

    if !skip_checks {
        let health = ctx.state.health.probe().await;
        print_health(&ctx.backend_url(), &health);
        if !health.reachable {
            println!();
            println!("Starting anyway; requests will fail until LM Studio is reachable.");
        }
        println!();
    }

    let addr = ctx.config.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    println!("OpenAI-compatible endpoint: http://{addr}/v1/chat/completions");
    println!("Press Ctrl+C to stop");

    let cancel = CancellationToken::new();

    let refresh = Arc::clone(&ctx.state.registry).spawn_refresh_loop(cancel.clone());
    let watch = tokio::spawn(log_health_changes(
        Arc::clone(&ctx.state.health),
        ctx.settings.snapshot().model_refresh_interval(),
        cancel.clone(),
    ));

    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Shutdown requested");
                    cancel.cancel();
                }
                Err(e) => warn!(error = %e, "Cannot listen for Ctrl+C"),
            }
        }
    });

    let served = lmbridge_proxy::serve(listener, ctx.state.clone(), cancel.clone()).await;

    cancel.cancel();
    if let Err(e) = refresh.await {
        error!(error = %e, "Model refresh task failed");
    }
    if let Err(e) = watch.await {
        error!(error = %e, "Health watch task failed");
    }

    served
}

async fn log_health_changes(
    monitor: Arc<HealthMonitor>,
    every: std::time::Duration,
    cancel: CancellationToken,
) {
    let changes = monitor.watch(every, cancel);
    futures_util::pin_mut!(changes);

    while let Some(health) = changes.next().await {
        if health.reachable {
            info!(
                models_loaded = health.models_loaded,
                latency_ms = health.latency.as_millis(),
                "LM Studio reachable"
            );
        } else {
            warn!(
                error = health.error.as_deref().unwrap_or("unknown"),
                "LM Studio unreachable"
            );
        }
    }
}
