use axum::{Json, extract::State};
use autoprint_core::config::PatternList;
use autoprint_sdk::objects::admin::{
    PatternsRequest, PatternsResponse, ToggleRequest, ToggleResponse,
};

use crate::state::AppState;

use super::AdminApiError;

/// `PUT /settings/exclusions` — replace the exclusion patterns. Blank
/// patterns are dropped.
pub async fn set_exclusions(
    State(state): State<AppState>,
    Json(request): Json<PatternsRequest>,
) -> Result<Json<PatternsResponse>, AdminApiError> {
    let patterns = PatternList::new(request.patterns);
    let settings = state
        .pipeline
        .settings
        .update(|s| s.exclusions = patterns)
        .await?;
    Ok(Json(PatternsResponse {
        patterns: settings.exclusions.to_vec(),
    }))
}

/// `PUT /settings/chat-patterns` — replace the chat announce patterns.
pub async fn set_chat_patterns(
    State(state): State<AppState>,
    Json(request): Json<PatternsRequest>,
) -> Result<Json<PatternsResponse>, AdminApiError> {
    let patterns = PatternList::new(request.patterns);
    let settings = state
        .pipeline
        .settings
        .update(|s| s.chat_announce_patterns = patterns)
        .await?;
    Ok(Json(PatternsResponse {
        patterns: settings.chat_announce_patterns.to_vec(),
    }))
}

pub async fn set_print_giveaways(
    State(state): State<AppState>,
    Json(request): Json<ToggleRequest>,
) -> Result<Json<ToggleResponse>, AdminApiError> {
    let settings = state
        .pipeline
        .settings
        .update(|s| s.print_giveaways = request.enabled)
        .await?;
    Ok(Json(ToggleResponse {
        enabled: settings.print_giveaways,
    }))
}

pub async fn set_announce_to_chat(
    State(state): State<AppState>,
    Json(request): Json<ToggleRequest>,
) -> Result<Json<ToggleResponse>, AdminApiError> {
    let settings = state
        .pipeline
        .settings
        .update(|s| s.announce_to_chat = request.enabled)
        .await?;
    Ok(Json(ToggleResponse {
        enabled: settings.announce_to_chat,
    }))
}

pub async fn set_announce_wheel_spins(
    State(state): State<AppState>,
    Json(request): Json<ToggleRequest>,
) -> Result<Json<ToggleResponse>, AdminApiError> {
    let settings = state
        .pipeline
        .settings
        .update(|s| s.announce_wheel_spins = request.enabled)
        .await?;
    Ok(Json(ToggleResponse {
        enabled: settings.announce_wheel_spins,
    }))
}
