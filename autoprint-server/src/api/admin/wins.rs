use axum::{
    Json,
    extract::{Query, State},
};
use autoprint_core::entities::{ListWinEvents, SearchWinEvents, WinCandidate};
use autoprint_sdk::objects::admin::{
    RecentWinsQuery, ReprintRequest, ReprintResponse, SearchWinsQuery, WinRecordResponse,
    clamp_limit,
};
use autoprint_sdk::objects::{WinEventPayload, WinKind};
use kanau::processor::Processor;
use time::OffsetDateTime;

use crate::state::AppState;

use super::{AdminApiError, win_to_admin_response};

/// `GET /wins` — most recent wins of the active show, newest first.
///
/// Returns an empty list when no show is active.
pub async fn recent_wins(
    State(state): State<AppState>,
    Query(query): Query<RecentWinsQuery>,
) -> Json<Vec<WinRecordResponse>> {
    let Some(ledger) = state.pipeline.sessions.active_ledger().await else {
        return Json(Vec::new());
    };
    let Ok(events) = ledger
        .process(ListWinEvents {
            limit: clamp_limit(query.limit),
        })
        .await;

    let now = OffsetDateTime::now_utc();
    Json(
        events
            .iter()
            .map(|e| win_to_admin_response(e, now))
            .collect(),
    )
}

/// `GET /wins/search?q=` — case-insensitive search over winner and item.
pub async fn search_wins(
    State(state): State<AppState>,
    Query(query): Query<SearchWinsQuery>,
) -> Json<Vec<WinRecordResponse>> {
    let Some(ledger) = state.pipeline.sessions.active_ledger().await else {
        return Json(Vec::new());
    };
    let Ok(events) = ledger
        .process(SearchWinEvents {
            query: query.q,
            limit: clamp_limit(query.limit),
        })
        .await;

    let now = OffsetDateTime::now_utc();
    Json(
        events
            .iter()
            .map(|e| win_to_admin_response(e, now))
            .collect(),
    )
}

/// `POST /wins/reprint` — manual dispatch.
///
/// With `entry_id` the stored entry is reprinted. Otherwise `name` and
/// `item` describe the win, which is admitted first and then dispatched.
pub async fn reprint(
    State(state): State<AppState>,
    Json(request): Json<ReprintRequest>,
) -> Result<Json<ReprintResponse>, AdminApiError> {
    if let Some(entry_id) = request.entry_id {
        let response = state.pipeline.admission.reprint_entry(entry_id).await?;
        return Ok(Json(response));
    }

    let (Some(name), Some(item)) = (request.name, request.item) else {
        return Err(AdminApiError::BadRequest(
            "either entry_id or name and item are required".to_string(),
        ));
    };
    let candidate = WinCandidate::from_payload(WinEventPayload {
        kind: request.kind.unwrap_or(WinKind::Sale),
        name,
        item,
        price: request.price,
        detected_at: None,
        payment_pending: false,
        wheel_hint: false,
    })
    .map_err(|e| AdminApiError::BadRequest(e.to_string()))?;

    Ok(Json(state.pipeline.admission.admit_manual(candidate).await))
}

/// `POST /wins/print-last` — reprint the most recent entry of the active
/// show.
pub async fn print_last(
    State(state): State<AppState>,
) -> Result<Json<ReprintResponse>, AdminApiError> {
    Ok(Json(state.pipeline.admission.print_last().await?))
}
