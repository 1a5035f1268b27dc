use axum::Json;
use axum::extract::State;
use serde_json::json;

use crate::models::ServiceInfo;
use crate::state::AppState;

/// `GET /`: service information.
pub async fn service_info(State(state): State<AppState>) -> Json<ServiceInfo> {
    Json(ServiceInfo {
        name: "lmbridge",
        version: env!("CARGO_PKG_VERSION"),
        status: "running",
        backend_url: state.settings.snapshot().backend_url.clone(),
        models_refreshed_at: state.registry.snapshot().refreshed_at(),
        endpoints: json!({
            "chat_completions": "/v1/chat/completions",
            "models": "/v1/models",
            "health": "/health",
            "config": "/config",
            "ask": "/ask",
        }),
    })
}
