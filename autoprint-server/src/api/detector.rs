//! Detector API handlers.
//!
//! These endpoints are called by the browser-side detector watching the
//! stream page.
//!
//! # Endpoints
//!
//! - `POST /event`           – submit a detected win
//! - `POST /heartbeat`       – detector liveness check-in
//! - `POST /payment-pending` – set or clear a payment hold for a buyer's item

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};
use autoprint_core::entities::WinCandidate;
use autoprint_sdk::objects::admin::{HeartbeatResponse, PaymentPendingRequest};
use autoprint_sdk::objects::{AdmissionResponse, WinEventPayload};

use crate::state::AppState;

/// Build the Detector API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/event", post(submit_event))
        .route("/heartbeat", post(heartbeat))
        .route("/payment-pending", post(payment_pending))
}

/// `POST /event` — admit a detected win.
///
/// Every admission outcome, including duplicates and drops, is a `200`
/// with the classification in the body. A win without a winner or an item
/// is rejected with `422`.
async fn submit_event(
    State(state): State<AppState>,
    Json(payload): Json<WinEventPayload>,
) -> Result<Json<AdmissionResponse>, (StatusCode, String)> {
    state.heartbeat.beat();

    let candidate = WinCandidate::from_payload(payload).map_err(|e| {
        tracing::debug!(error = %e, "Rejected malformed win event");
        (StatusCode::UNPROCESSABLE_ENTITY, e.to_string())
    })?;

    let decision = state.pipeline.admission.admit(candidate).await;
    Ok(Json(decision.into()))
}

/// `POST /heartbeat` — record that the detector is alive.
async fn heartbeat(State(state): State<AppState>) -> Json<HeartbeatResponse> {
    let timestamp = state.heartbeat.beat();
    Json(HeartbeatResponse {
        status: "ok".to_string(),
        timestamp,
    })
}

/// `POST /payment-pending` — the page marked (or unmarked) a buyer's
/// payment as pending. Held wins are stored as `payment_pending` and not
/// dispatched automatically.
async fn payment_pending(
    State(state): State<AppState>,
    Json(request): Json<PaymentPendingRequest>,
) -> impl IntoResponse {
    tracing::info!(
        winner = %request.name,
        item = %request.item,
        pending = request.pending,
        "Payment hold updated"
    );
    state
        .pipeline
        .holds
        .set(&request.name, &request.item, request.pending);
    StatusCode::NO_CONTENT
}
