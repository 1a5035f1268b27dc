//! Axum HTTP server for the OpenAI-compatible gateway.
//!
//! `serve()` runs the router on a pre-bound `TcpListener` until the
//! cancellation token fires.

use axum::Router;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::handlers;
use crate::state::AppState;

/// Build the gateway router.
///
/// CORS allows any origin, method and header, matching the local-only,
/// unauthenticated posture of the backend.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::service_info))
        .route("/health", get(handlers::health_check))
        .route("/v1/models", get(handlers::list_models))
        .route("/v1/chat/completions", post(handlers::chat_completions))
        .route("/ask", post(handlers::ask))
        .route(
            "/config",
            get(handlers::get_config).post(handlers::update_config),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the gateway with a pre-bound listener.
///
/// Returns `Ok(())` on clean shutdown. In-flight streams are allowed to
/// finish; new connections are refused once `cancel` fires.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let addr = listener.local_addr()?;
    let app = create_router(state);

    info!("Gateway listening on {addr}");
    info!("Configure your editor to use: http://{addr}/v1");

    axum::serve(listener, app)
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await?;

    info!("Gateway shut down");
    Ok(())
}
