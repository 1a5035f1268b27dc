//! Runtime configuration endpoints.

use axum::Json;
use axum::extract::State;
use bytes::Bytes;
use lmbridge_core::SettingsUpdate;
use tracing::{info, warn};

use crate::error::HttpError;
use crate::models::{ConfigUpdated, ConfigView};
use crate::state::AppState;

/// `GET /config`
pub async fn get_config(State(state): State<AppState>) -> Json<ConfigView> {
    Json(ConfigView::from(state.settings.snapshot().as_ref()))
}

/// `POST /config`: apply a partial update.
///
/// The new settings take effect for the next request. The model registry
/// is refreshed afterwards so a new backend URL is picked up at once; a
/// failed refresh does not fail the update.
pub async fn update_config(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ConfigUpdated>, HttpError> {
    let update: SettingsUpdate =
        serde_json::from_slice(&body).map_err(|e| HttpError::MalformedBody(e.to_string()))?;

    let settings = state.settings.apply(&update)?;
    info!(backend_url = %settings.backend_url, "Configuration updated");

    if let Err(e) = state.registry.refresh().await {
        warn!(error = %e, "Model refresh after configuration update failed");
    }

    Ok(Json(ConfigUpdated {
        status: "updated",
        config: ConfigView::from(settings.as_ref()),
    }))
}
