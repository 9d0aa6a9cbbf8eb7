use autoprint_sdk::objects::{AdmissionStatus, WinEventPayload, WinKind};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::entities::show::ShowId;

/// A win as reported by the detector, validated but not yet admitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WinCandidate {
    pub kind: WinKind,
    pub winner: String,
    pub item: String,
    /// Sale only. Always `None` for giveaways.
    pub price: Option<String>,
    pub detected_at: Option<OffsetDateTime>,
    /// The detector saw a "payment pending" marker next to this win.
    pub payment_pending_hint: bool,
    /// The detector identified this as a wheel spin from card context.
    pub wheel_hint: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum InvalidCandidate {
    #[error("winner name is empty")]
    EmptyWinner,
    #[error("item title is empty")]
    EmptyItem,
}

impl WinCandidate {
    pub fn sale(winner: impl Into<String>, item: impl Into<String>, price: Option<String>) -> Self {
        Self {
            kind: WinKind::Sale,
            winner: winner.into(),
            item: item.into(),
            price,
            detected_at: None,
            payment_pending_hint: false,
            wheel_hint: false,
        }
    }

    pub fn giveaway(winner: impl Into<String>, item: impl Into<String>) -> Self {
        Self {
            kind: WinKind::Giveaway,
            winner: winner.into(),
            item: item.into(),
            price: None,
            detected_at: None,
            payment_pending_hint: false,
            wheel_hint: false,
        }
    }

    /// Validate a detector payload. Names and titles are trimmed; blank
    /// prices are treated as absent; giveaway prices are dropped.
    pub fn from_payload(payload: WinEventPayload) -> Result<Self, InvalidCandidate> {
        let winner = payload.name.trim().to_string();
        if winner.is_empty() {
            return Err(InvalidCandidate::EmptyWinner);
        }
        let item = payload.item.trim().to_string();
        if item.is_empty() {
            return Err(InvalidCandidate::EmptyItem);
        }
        let price = match payload.kind {
            WinKind::Sale => payload
                .price
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty()),
            WinKind::Giveaway => None,
        };
        let detected_at = payload.detected_at.and_then(|ms| {
            OffsetDateTime::from_unix_timestamp_nanos(i128::from(ms) * 1_000_000).ok()
        });

        Ok(Self {
            kind: payload.kind,
            winner,
            item,
            price,
            detected_at,
            payment_pending_hint: payload.payment_pending,
            wheel_hint: payload.wheel_hint,
        })
    }

    pub fn identity(&self) -> WinIdentity {
        WinIdentity::new(self.kind, &self.winner, &self.item, self.price.as_deref())
    }
}

/// Deduplication key of a win within one show.
///
/// Sales are keyed on winner, item and price, so the same lot sold twice at
/// different prices is two wins. Giveaways ignore price.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WinIdentity {
    pub kind: WinKind,
    pub winner: String,
    pub item: String,
    pub price: Option<String>,
}

impl WinIdentity {
    pub fn new(kind: WinKind, winner: &str, item: &str, price: Option<&str>) -> Self {
        let price = match kind {
            WinKind::Sale => price.map(str::to_string),
            WinKind::Giveaway => None,
        };
        Self {
            kind,
            winner: winner.to_string(),
            item: item.to_string(),
            price,
        }
    }
}

impl std::fmt::Display for WinIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.price {
            Some(price) => write!(f, "{}:{}|{}|{}", self.kind, self.winner, self.item, price),
            None => write!(f, "{}:{}|{}", self.kind, self.winner, self.item),
        }
    }
}

/// Status of a stored ledger entry. Decided once at admission.
///
/// Only the three stored outcomes exist here; `Duplicate` and
/// `NoActiveSession` never produce an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Recorded,
    Excluded,
    PaymentPending,
}

impl From<EventStatus> for AdmissionStatus {
    fn from(value: EventStatus) -> Self {
        match value {
            EventStatus::Recorded => AdmissionStatus::Recorded,
            EventStatus::Excluded => AdmissionStatus::Excluded,
            EventStatus::PaymentPending => AdmissionStatus::PaymentPending,
        }
    }
}

/// One accepted win, as stored in a show's ledger file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinEvent {
    pub entry_id: Uuid,
    pub session_id: ShowId,
    #[serde(rename = "type")]
    pub kind: WinKind,
    #[serde(rename = "name")]
    pub winner: String,
    pub item: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub accepted_at: OffsetDateTime,
    pub status: EventStatus,
    #[serde(default)]
    pub wheel_hint: bool,
}

impl WinEvent {
    pub fn new(session_id: ShowId, candidate: &WinCandidate, status: EventStatus) -> Self {
        Self {
            entry_id: Uuid::now_v7(),
            session_id,
            kind: candidate.kind,
            winner: candidate.winner.clone(),
            item: candidate.item.clone(),
            price: candidate.price.clone(),
            accepted_at: OffsetDateTime::now_utc(),
            status,
            wheel_hint: candidate.wheel_hint,
        }
    }

    pub fn identity(&self) -> WinIdentity {
        WinIdentity::new(self.kind, &self.winner, &self.item, self.price.as_deref())
    }

    /// Numeric amount parsed out of the display price (`"$12.50"` → `12.50`).
    pub fn amount(&self) -> Option<Decimal> {
        self.price.as_deref().and_then(parse_amount)
    }

    pub fn matches_query(&self, needle_lower: &str) -> bool {
        self.winner.to_lowercase().contains(needle_lower)
            || self.item.to_lowercase().contains(needle_lower)
    }
}

/// Strip currency symbols and thousands separators from a display price.
pub fn parse_amount(price: &str) -> Option<Decimal> {
    let digits: String = price
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    if digits.is_empty() {
        return None;
    }
    Decimal::from_str(&digits).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_giveaway_identity_ignores_price() {
        let a = WinIdentity::new(WinKind::Giveaway, "bob", "Prize", Some("$1"));
        let b = WinIdentity::new(WinKind::Giveaway, "bob", "Prize", Some("$2"));
        assert_eq!(a, b);

        let c = WinIdentity::new(WinKind::Sale, "bob", "Prize", Some("$1"));
        let d = WinIdentity::new(WinKind::Sale, "bob", "Prize", Some("$2"));
        assert_ne!(c, d);
    }

    #[test]
    fn test_from_payload_validates_and_trims() {
        let payload = WinEventPayload::sale("  alice ", "Charizard Card", Some(" $12.50 ".into()));
        let candidate = WinCandidate::from_payload(payload).unwrap();
        assert_eq!(candidate.winner, "alice");
        assert_eq!(candidate.price.as_deref(), Some("$12.50"));

        let blank = WinEventPayload::sale("   ", "Charizard Card", None);
        assert_eq!(
            WinCandidate::from_payload(blank),
            Err(InvalidCandidate::EmptyWinner)
        );

        let mut giveaway = WinEventPayload::giveaway("bob", "Giveaway Prize");
        giveaway.price = Some("$5".into());
        assert_eq!(WinCandidate::from_payload(giveaway).unwrap().price, None);
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("$1,234.50"), Decimal::from_str("1234.50").ok());
        assert_eq!(parse_amount("free"), None);
    }
}
