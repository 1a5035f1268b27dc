use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::models::HealthResponse;
use crate::state::AppState;

/// `GET /health`: 200 when the backend answers, 503 otherwise.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let health = state.health.probe().await;
    let status = if health.reachable {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(HealthResponse::from(health)))
}
