//! Admin API request and response types.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::notice::DispatchSummary;
use super::win::{AdmissionStatus, WinKind};

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// One ledger entry of the active show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinRecordResponse {
    pub entry_id: Uuid,
    #[serde(rename = "type")]
    pub kind: WinKind,
    pub name: String,
    pub item: String,
    pub price: Option<String>,
    pub status: AdmissionStatus,
    /// Unix milliseconds.
    pub accepted_at: i64,
    pub seconds_ago: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShowStatus {
    Active,
    Ended,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShowResponse {
    pub show_id: String,
    pub name: String,
    pub labels_file: String,
    pub status: ShowStatus,
    /// Unix seconds.
    pub created_at: i64,
    pub ended_at: Option<i64>,
}

/// Snapshot returned by `GET /api/v1/admin/status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub printing: bool,
    pub print_giveaways: bool,
    pub announce_to_chat: bool,
    pub announce_wheel_spins: bool,
    pub exclusions: Vec<String>,
    pub chat_announce_patterns: Vec<String>,
    pub current_show: Option<String>,
    pub has_active_show: bool,
    pub shows: Vec<ShowResponse>,
    pub extension_active: bool,
    /// Unix milliseconds of the last detector heartbeat.
    pub last_extension_heartbeat: Option<i64>,
}

/// Response to manual dispatch endpoints (reprint, print-last, test-print).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReprintResponse {
    /// Admission classification when the reprint carried a new win;
    /// `None` when an existing ledger entry was reprinted.
    pub admission: Option<AdmissionStatus>,
    pub entry_id: Option<Uuid>,
    pub dispatch: DispatchSummary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternsResponse {
    pub patterns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToggleResponse {
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetResponse {
    pub show_id: String,
    pub removed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartbeatResponse {
    pub status: String,
    /// Unix milliseconds.
    pub timestamp: i64,
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Body of `POST /api/v1/admin/wins/reprint`.
///
/// Either reference an existing ledger entry by `entry_id`, or describe the
/// win by `name`/`item`/`price`; the latter is admitted with a manual
/// override before dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReprintRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_id: Option<Uuid>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<WinKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternsRequest {
    pub patterns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToggleRequest {
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateShowRequest {
    pub name: String,
}

/// Body of `POST /api/v1/detector/payment-pending`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentPendingRequest {
    pub name: String,
    pub item: String,
    pub pending: bool,
}

// ---------------------------------------------------------------------------
// Query parameters
// ---------------------------------------------------------------------------

const DEFAULT_LIMIT: usize = 100;
const MAX_LIMIT: usize = 1_000;

/// Query parameters for `GET /api/v1/admin/wins`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentWinsQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
}

/// Query parameters for `GET /api/v1/admin/wins/search`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchWinsQuery {
    #[serde(default)]
    pub q: String,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    DEFAULT_LIMIT
}

/// Clamp a caller-supplied limit to a safe maximum.
pub fn clamp_limit(limit: usize) -> usize {
    limit.clamp(1, MAX_LIMIT)
}
