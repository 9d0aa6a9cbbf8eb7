use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use autoprint_core::entities::ShowId;
use autoprint_sdk::objects::admin::{CreateShowRequest, ResetResponse, ShowResponse};

use crate::state::AppState;

use super::AdminApiError;

/// `GET /shows` — every known show, ordered by id.
pub async fn list_shows(State(state): State<AppState>) -> Json<Vec<ShowResponse>> {
    Json(state.pipeline.sessions.registry().await.to_responses())
}

/// `POST /shows` — create a show and make it the active one.
///
/// Fails with `409` while another show is still active.
pub async fn create_show(
    State(state): State<AppState>,
    Json(request): Json<CreateShowRequest>,
) -> Result<impl IntoResponse, AdminApiError> {
    let (id, record) = state.pipeline.sessions.create_show(&request.name).await?;
    Ok((StatusCode::CREATED, Json(record.to_response(&id))))
}

/// `POST /shows/end`
pub async fn end_show(State(state): State<AppState>) -> Result<Json<ShowResponse>, AdminApiError> {
    let (id, record) = state.pipeline.sessions.end_show().await?;
    Ok(Json(record.to_response(&id)))
}

/// `POST /shows/reset` — drop every ledger entry of the active show.
pub async fn reset_show(
    State(state): State<AppState>,
) -> Result<Json<ResetResponse>, AdminApiError> {
    let (id, removed) = state.pipeline.sessions.reset_show().await?;
    Ok(Json(ResetResponse {
        show_id: id.to_string(),
        removed,
    }))
}

/// `DELETE /shows/{show_id}` — delete a show and its ledger file. Deleting
/// the active show leaves no show active.
pub async fn delete_show(
    State(state): State<AppState>,
    Path(show_id): Path<String>,
) -> Result<StatusCode, AdminApiError> {
    state
        .pipeline
        .sessions
        .delete_show(&ShowId::from_slug(show_id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
