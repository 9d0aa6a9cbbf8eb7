use axum::{Json, extract::State};
use autoprint_sdk::objects::admin::StatusResponse;

use crate::state::AppState;

/// `GET /status` — everything the operator console shows at a glance.
pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let settings = state.pipeline.settings.snapshot().await;
    let registry = state.pipeline.sessions.registry().await;
    let active = registry.active().map(|(id, _)| id.to_string());

    Json(StatusResponse {
        printing: settings.printing_enabled,
        print_giveaways: settings.print_giveaways,
        announce_to_chat: settings.announce_to_chat,
        announce_wheel_spins: settings.announce_wheel_spins,
        exclusions: settings.exclusions.to_vec(),
        chat_announce_patterns: settings.chat_announce_patterns.to_vec(),
        has_active_show: active.is_some(),
        current_show: active,
        shows: registry.to_responses(),
        extension_active: state.heartbeat.is_active(),
        last_extension_heartbeat: state.heartbeat.last(),
    })
}
