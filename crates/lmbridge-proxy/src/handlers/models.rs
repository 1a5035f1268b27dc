use axum::Json;
use axum::extract::State;
use tracing::debug;

use crate::models::ModelsResponse;
use crate::state::AppState;

/// `GET /v1/models`: the registry snapshot in OpenAI list form.
///
/// Before the first successful poll the registry is refreshed once; a
/// failed refresh still answers with whatever snapshot is held.
pub async fn list_models(State(state): State<AppState>) -> Json<ModelsResponse> {
    debug!("GET /v1/models");

    let mut snapshot = state.registry.snapshot();
    if snapshot.refreshed_at().is_none() {
        if let Ok(fresh) = state.registry.refresh().await {
            snapshot = fresh;
        }
    }

    Json(ModelsResponse::from_descriptors(snapshot.models()))
}
