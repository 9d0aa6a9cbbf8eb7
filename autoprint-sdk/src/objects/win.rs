//! Detector → server win event types.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of win observed on the stream page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WinKind {
    Sale,
    Giveaway,
}

impl std::fmt::Display for WinKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WinKind::Sale => write!(f, "sale"),
            WinKind::Giveaway => write!(f, "giveaway"),
        }
    }
}

/// Body of `POST /api/v1/detector/event`.
///
/// `price` is only meaningful for sales; the server ignores it for
/// giveaways. `detected_at` is the detector's clock in unix milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinEventPayload {
    #[serde(rename = "type")]
    pub kind: WinKind,
    pub name: String,
    pub item: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detected_at: Option<i64>,
    /// The page showed a "payment pending" marker for this win.
    #[serde(default)]
    pub payment_pending: bool,
    /// Card-context detection identified this as a wheel spin.
    #[serde(default)]
    pub wheel_hint: bool,
}

impl WinEventPayload {
    pub fn sale(name: impl Into<String>, item: impl Into<String>, price: Option<String>) -> Self {
        Self {
            kind: WinKind::Sale,
            name: name.into(),
            item: item.into(),
            price,
            detected_at: None,
            payment_pending: false,
            wheel_hint: false,
        }
    }

    pub fn giveaway(name: impl Into<String>, item: impl Into<String>) -> Self {
        Self {
            kind: WinKind::Giveaway,
            name: name.into(),
            item: item.into(),
            price: None,
            detected_at: None,
            payment_pending: false,
            wheel_hint: false,
        }
    }

    /// Stamp the payload with the current wall clock.
    pub fn detected_now(mut self) -> Self {
        let now = time::OffsetDateTime::now_utc();
        self.detected_at = Some((now.unix_timestamp_nanos() / 1_000_000) as i64);
        self
    }
}

/// Classification assigned by the server when a win is admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionStatus {
    /// Stored and handed to the dispatcher.
    Recorded,
    /// Stored, but an exclusion pattern or toggle kept it from dispatch.
    Excluded,
    /// Stored, dispatch held because the buyer's payment is pending.
    PaymentPending,
    /// Dropped: no show is running.
    NoActiveSession,
    /// Already stored in the current show.
    Duplicate,
}

impl AdmissionStatus {
    /// Whether an entry with this status exists in the ledger.
    pub fn is_stored(self) -> bool {
        matches!(
            self,
            AdmissionStatus::Recorded | AdmissionStatus::Excluded | AdmissionStatus::PaymentPending
        )
    }
}

impl std::fmt::Display for AdmissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdmissionStatus::Recorded => write!(f, "recorded"),
            AdmissionStatus::Excluded => write!(f, "excluded"),
            AdmissionStatus::PaymentPending => write!(f, "payment_pending"),
            AdmissionStatus::NoActiveSession => write!(f, "no_active_session"),
            AdmissionStatus::Duplicate => write!(f, "duplicate"),
        }
    }
}

/// Response to `POST /api/v1/detector/event`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionResponse {
    pub status: AdmissionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Ledger entry that now holds (or already held) this win.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_id: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_accepts_legacy_shape() {
        let json = r#"{"type":"sale","name":"alice","item":"Charizard Card","price":"$12.50"}"#;
        let payload: WinEventPayload = serde_json::from_str(json).unwrap();
        assert_eq!(payload.kind, WinKind::Sale);
        assert_eq!(payload.price.as_deref(), Some("$12.50"));
        assert!(!payload.payment_pending);
        assert!(!payload.wheel_hint);
    }

    #[test]
    fn test_giveaway_payload_omits_price() {
        let json = serde_json::to_value(WinEventPayload::giveaway("bob", "Giveaway Prize")).unwrap();
        assert_eq!(json["type"], "giveaway");
        assert!(json.get("price").is_none());
    }

    #[test]
    fn test_status_wire_names() {
        let status: AdmissionStatus = serde_json::from_str("\"no_active_session\"").unwrap();
        assert_eq!(status, AdmissionStatus::NoActiveSession);
        assert!(!status.is_stored());
        assert!(AdmissionStatus::PaymentPending.is_stored());
    }
}
