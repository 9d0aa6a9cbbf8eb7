//! Admin API handlers.
//!
//! These endpoints are called by the operator console on the streaming
//! machine. The server binds to localhost by default and does not
//! authenticate them.
//!
//! # Endpoints
//!
//! - `GET    /status`                         – settings, shows and detector liveness
//! - `GET    /wins`                           – most recent wins of the active show
//! - `GET    /wins/search`                    – search the active show's wins
//! - `POST   /wins/reprint`                   – manual dispatch of an entry or a described win
//! - `POST   /wins/print-last`                – reprint the most recent entry
//! - `POST   /printer/test`                   – print a test label
//! - `POST   /printer/pause`                  – pause automatic dispatch
//! - `POST   /printer/resume`                 – resume automatic dispatch
//! - `PUT    /settings/exclusions`            – replace the exclusion patterns
//! - `PUT    /settings/chat-patterns`         – replace the chat announce patterns
//! - `PUT    /settings/print-giveaways`       – toggle giveaway printing
//! - `PUT    /settings/announce-to-chat`      – toggle chat announcements
//! - `PUT    /settings/announce-wheel-spins`  – toggle wheel forwarding
//! - `GET    /shows`                          – list shows
//! - `POST   /shows`                          – create a show and make it active
//! - `POST   /shows/end`                      – end the active show
//! - `POST   /shows/reset`                    – clear the active show's history
//! - `DELETE /shows/{show_id}`                – delete a show and its ledger
//! - `GET    /notices/ws`                     – live notice feed (WebSocket)

use axum::{
    Router,
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post, put},
};
use autoprint_core::config::PersistError;
use autoprint_core::entities::WinEvent;
use autoprint_core::processors::AdmissionError;
use autoprint_core::session::SessionError;
use autoprint_sdk::objects::admin::WinRecordResponse;
use time::OffsetDateTime;

use crate::state::AppState;

mod notices;
mod printer;
mod settings;
mod shows;
mod status;
mod wins;

/// Build the Admin API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/status", get(status::status))
        .route("/wins", get(wins::recent_wins))
        .route("/wins/search", get(wins::search_wins))
        .route("/wins/reprint", post(wins::reprint))
        .route("/wins/print-last", post(wins::print_last))
        .route("/printer/test", post(printer::test_print))
        .route("/printer/pause", post(printer::pause))
        .route("/printer/resume", post(printer::resume))
        .route("/settings/exclusions", put(settings::set_exclusions))
        .route("/settings/chat-patterns", put(settings::set_chat_patterns))
        .route(
            "/settings/print-giveaways",
            put(settings::set_print_giveaways),
        )
        .route(
            "/settings/announce-to-chat",
            put(settings::set_announce_to_chat),
        )
        .route(
            "/settings/announce-wheel-spins",
            put(settings::set_announce_wheel_spins),
        )
        .route("/shows", get(shows::list_shows).post(shows::create_show))
        .route("/shows/end", post(shows::end_show))
        .route("/shows/reset", post(shows::reset_show))
        .route("/shows/{show_id}", delete(shows::delete_show))
        .route("/notices/ws", get(notices::notices_ws))
}

// ---------------------------------------------------------------------------
// Shared error type
// ---------------------------------------------------------------------------

/// Errors that can occur in Admin API handlers.
#[derive(Debug)]
pub(crate) enum AdminApiError {
    Session(SessionError),
    Admission(AdmissionError),
    Persist(PersistError),
    BadRequest(String),
}

impl From<SessionError> for AdminApiError {
    fn from(value: SessionError) -> Self {
        AdminApiError::Session(value)
    }
}

impl From<AdmissionError> for AdminApiError {
    fn from(value: AdmissionError) -> Self {
        AdminApiError::Admission(value)
    }
}

impl From<PersistError> for AdminApiError {
    fn from(value: PersistError) -> Self {
        AdminApiError::Persist(value)
    }
}

impl IntoResponse for AdminApiError {
    fn into_response(self) -> axum::response::Response {
        match self {
            AdminApiError::Session(e) => {
                let status = match &e {
                    SessionError::EmptyName | SessionError::InvalidName(_) => {
                        StatusCode::BAD_REQUEST
                    }
                    SessionError::AlreadyActive(_) | SessionError::ShowExists(_) => {
                        StatusCode::CONFLICT
                    }
                    SessionError::NotFound(_) | SessionError::NoActiveShow => StatusCode::NOT_FOUND,
                    SessionError::Ledger(_) | SessionError::Persist(_) => {
                        tracing::error!(error = %e, "Admin API session error");
                        return (StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
                            .into_response();
                    }
                };
                (status, e.to_string()).into_response()
            }
            AdminApiError::Admission(e) => (StatusCode::NOT_FOUND, e.to_string()).into_response(),
            AdminApiError::Persist(e) => {
                tracing::error!(error = %e, "Admin API failed to persist settings");
                (StatusCode::INTERNAL_SERVER_ERROR, "failed to persist settings").into_response()
            }
            AdminApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
        }
    }
}

// ---------------------------------------------------------------------------
// Conversion helpers
// ---------------------------------------------------------------------------

pub(crate) fn win_to_admin_response(event: &WinEvent, now: OffsetDateTime) -> WinRecordResponse {
    WinRecordResponse {
        entry_id: event.entry_id,
        kind: event.kind,
        name: event.winner.clone(),
        item: event.item.clone(),
        price: event.price.clone(),
        status: event.status.into(),
        accepted_at: (event.accepted_at.unix_timestamp_nanos() / 1_000_000) as i64,
        seconds_ago: (now - event.accepted_at).whole_seconds().max(0),
    }
}
