//! Check command handler.

use anyhow::Result;
use lmbridge_core::BackendHealth;

use crate::bootstrap::CliContext;
use crate::error::CliError;

/// Probe LM Studio, print its health and the loaded models.
///
/// Returns `CliError::BackendDown` when the backend cannot be reached.
pub async fn execute(ctx: &CliContext) -> Result<()> {
    let url = ctx.backend_url();
    let health = ctx.state.health.probe().await;
    print_health(&url, &health);

    if !health.reachable {
        return Err(CliError::BackendDown(url).into());
    }

    // Health already proved reachability; a failure here is reported, not fatal.
    match ctx.state.registry.refresh().await {
        Ok(snapshot) => {
            if snapshot.is_empty() {
                println!("   No models reported by LM Studio");
            }
            for model in snapshot.models() {
                let marker = if model.loaded { "loaded" } else { "not loaded" };
                println!("   - {} ({marker})", model.id);
            }
        }
        Err(e) => println!("   Could not list models: {e}"),
    }

    Ok(())
}

/// Print a one-probe health summary with remediation hints when down.
pub fn print_health(url: &str, health: &BackendHealth) {
    if health.reachable {
        println!("LM Studio is running at {url}");
        println!(
            "   {} loaded model(s), answered in {} ms",
            health.models_loaded,
            health.latency.as_millis()
        );
        if health.models_loaded == 0 {
            println!("   Load a model in LM Studio before sending requests.");
        }
    } else {
        println!("Cannot connect to LM Studio at {url}");
        if let Some(ref error) = health.error {
            println!("   Error: {error}");
        }
        println!();
        println!("Make sure that:");
        println!("   1. LM Studio is running");
        println!("   2. The Local Server is started in LM Studio");
        println!("   3. The configured URL is correct (current: {url})");
    }
}
