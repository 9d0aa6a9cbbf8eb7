//! Event type definitions for the win pipeline.

use autoprint_sdk::objects::{
    AdmissionStatus, NoticeMessage, ShowAction, SinkKind, SinkOutcome, WinKind,
};
use uuid::Uuid;

use crate::entities::{EventStatus, ShowId, WinCandidate, WinEvent};

/// Who asked for a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOrigin {
    /// A clean `Recorded` admission.
    Automatic,
    /// Operator reprint. Bypasses pause, exclusions and the payment hold on
    /// the printer, but not the printer cooldown or the wheel hold.
    Manual,
}

/// A win handed to the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchRequest {
    /// Ledger entry, when the win is stored.
    pub entry_id: Option<Uuid>,
    pub kind: WinKind,
    pub winner: String,
    pub item: String,
    pub price: Option<String>,
    /// Stored status; `None` for wins that were never stored.
    pub status: Option<EventStatus>,
    /// Payment is pending for this buyer, as reported by the probe.
    pub payment_pending: bool,
    pub wheel_hint: bool,
    pub origin: DispatchOrigin,
}

impl DispatchRequest {
    pub fn from_event(event: &WinEvent, payment_pending: bool, origin: DispatchOrigin) -> Self {
        Self {
            entry_id: Some(event.entry_id),
            kind: event.kind,
            winner: event.winner.clone(),
            item: event.item.clone(),
            price: event.price.clone(),
            status: Some(event.status),
            payment_pending: payment_pending || event.status == EventStatus::PaymentPending,
            wheel_hint: event.wheel_hint,
            origin,
        }
    }

    /// A manual dispatch of a win that has no ledger entry.
    pub fn unstored(candidate: &WinCandidate, payment_pending: bool) -> Self {
        Self {
            entry_id: None,
            kind: candidate.kind,
            winner: candidate.winner.clone(),
            item: candidate.item.clone(),
            price: candidate.price.clone(),
            status: None,
            payment_pending,
            wheel_hint: candidate.wheel_hint,
            origin: DispatchOrigin::Manual,
        }
    }

    pub fn is_manual(&self) -> bool {
        self.origin == DispatchOrigin::Manual
    }
}

/// Operator-facing record of something the pipeline did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineNotice {
    Admission {
        status: AdmissionStatus,
        kind: WinKind,
        winner: String,
        item: String,
        price: Option<String>,
        show_id: Option<ShowId>,
    },
    Sink {
        sink: SinkKind,
        outcome: SinkOutcome,
        winner: String,
        item: String,
    },
    Show {
        action: ShowAction,
        show_id: ShowId,
    },
}

impl From<PipelineNotice> for NoticeMessage {
    fn from(value: PipelineNotice) -> Self {
        match value {
            PipelineNotice::Admission {
                status,
                kind,
                winner,
                item,
                price,
                show_id,
            } => NoticeMessage::Admission {
                status,
                kind,
                name: winner,
                item,
                price,
                show_id: show_id.map(|id| id.to_string()),
            },
            PipelineNotice::Sink {
                sink,
                outcome,
                winner,
                item,
            } => NoticeMessage::Sink {
                sink,
                outcome,
                name: winner,
                item,
            },
            PipelineNotice::Show { action, show_id } => NoticeMessage::Show {
                action,
                show_id: show_id.to_string(),
            },
        }
    }
}
