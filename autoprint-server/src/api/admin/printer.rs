use axum::{Json, extract::State};
use autoprint_sdk::objects::SinkOutcome;
use autoprint_sdk::objects::admin::ToggleResponse;

use crate::state::AppState;

use super::AdminApiError;

/// `POST /printer/test` — print a test label. Subject to the cooldown.
pub async fn test_print(State(state): State<AppState>) -> Json<SinkOutcome> {
    Json(state.pipeline.dispatcher.test_print().await)
}

/// `POST /printer/pause` — stop automatic dispatch. Wins are still
/// recorded and manual reprints still go through.
pub async fn pause(State(state): State<AppState>) -> Result<Json<ToggleResponse>, AdminApiError> {
    set_printing(&state, false).await
}

/// `POST /printer/resume`
pub async fn resume(State(state): State<AppState>) -> Result<Json<ToggleResponse>, AdminApiError> {
    set_printing(&state, true).await
}

async fn set_printing(
    state: &AppState,
    enabled: bool,
) -> Result<Json<ToggleResponse>, AdminApiError> {
    let settings = state
        .pipeline
        .settings
        .update(|s| s.printing_enabled = enabled)
        .await?;
    tracing::info!(enabled, "Automatic printing toggled");
    Ok(Json(ToggleResponse {
        enabled: settings.printing_enabled,
    }))
}
