//! Admission controller.
//!
//! Every detected win passes through [`AdmissionController::admit`], which
//! decides its fate in a fixed order and stops at the first match:
//!
//! 1. `Duplicate`: the identity is already stored in the active show
//! 2. `NoActiveSession`: no show is running; the win is dropped
//! 3. the win is appended to the show's ledger
//! 4. `Excluded`: an exclusion pattern matched the title
//! 5. `Excluded`: a giveaway while giveaway printing is disabled
//! 6. `PaymentPending`: the buyer's payment is pending
//! 7. `Recorded`: handed to the dispatcher
//!
//! Steps 3 to 7 happen in one locked append: the status is decided before
//! the entry exists and never changes afterwards. Only `Recorded` wins are
//! dispatched automatically; everything else is stored for history and can
//! be reprinted by an operator.

use std::sync::Arc;

use autoprint_sdk::objects::admin::ReprintResponse;
use autoprint_sdk::objects::{AdmissionResponse, AdmissionStatus};
use kanau::processor::Processor;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::config::{ConfigStore, PipelineSettings};
use crate::entities::{
    AppendOutcome, AppendWinEvent, EventStatus, FindWinEvent, ListWinEvents, ShowId,
    WinCandidate, WinEvent,
};
use crate::events::{
    DispatchOrigin, DispatchRequest, DispatchRequestSender, NoticeSender, PipelineNotice,
};
use crate::payment::PaymentPendingProbe;
use crate::processors::dispatcher::Dispatcher;
use crate::session::SessionManager;

#[derive(Debug, thiserror::Error)]
pub enum AdmissionError {
    #[error("no show is active")]
    NoActiveShow,
    #[error("ledger entry {0} not found in the active show")]
    EntryNotFound(Uuid),
    #[error("the active show has no wins yet")]
    EmptyLedger,
}

/// Outcome of one admission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmissionDecision {
    pub status: AdmissionStatus,
    pub reason: Option<String>,
    /// The stored entry: the new one, or the existing one for duplicates.
    pub event: Option<WinEvent>,
}

impl AdmissionDecision {
    fn rejected(status: AdmissionStatus, reason: impl Into<String>) -> Self {
        Self {
            status,
            reason: Some(reason.into()),
            event: None,
        }
    }
}

impl From<AdmissionDecision> for AdmissionResponse {
    fn from(value: AdmissionDecision) -> Self {
        AdmissionResponse {
            status: value.status,
            reason: value.reason,
            entry_id: value.event.map(|e| e.entry_id),
        }
    }
}

pub struct AdmissionController {
    sessions: Arc<SessionManager>,
    settings: ConfigStore<PipelineSettings>,
    probe: Arc<dyn PaymentPendingProbe>,
    dispatch_tx: DispatchRequestSender,
    dispatcher: Arc<Dispatcher>,
    notices: NoticeSender,
}

impl AdmissionController {
    pub fn new(
        sessions: Arc<SessionManager>,
        settings: ConfigStore<PipelineSettings>,
        probe: Arc<dyn PaymentPendingProbe>,
        dispatch_tx: DispatchRequestSender,
        dispatcher: Arc<Dispatcher>,
        notices: NoticeSender,
    ) -> Self {
        Self {
            sessions,
            settings,
            probe,
            dispatch_tx,
            dispatcher,
            notices,
        }
    }

    /// Admit a detected win.
    pub async fn admit(&self, candidate: WinCandidate) -> AdmissionDecision {
        let (decision, show_id) = self.store(candidate.clone()).await;
        self.announce(&candidate, &decision, show_id);

        if decision.status == AdmissionStatus::Recorded {
            if let Some(event) = &decision.event {
                let req = DispatchRequest::from_event(event, false, DispatchOrigin::Automatic);
                if let Err(e) = self.dispatch_tx.send(req).await {
                    error!(entry_id = %event.entry_id, error = %e, "Dispatcher is gone, win not dispatched");
                }
            }
        }
        decision
    }

    /// Operator reprint of a win described by name, item and price.
    ///
    /// A win not yet stored is admitted first and keeps its true
    /// classification. Either way it is then dispatched with the manual
    /// override. Without an active show the win is dispatched without being
    /// stored.
    pub async fn admit_manual(&self, candidate: WinCandidate) -> ReprintResponse {
        let (decision, show_id) = self.store(candidate.clone()).await;
        self.announce(&candidate, &decision, show_id);

        let pending = self.is_pending(&candidate);
        let req = match &decision.event {
            Some(event) => DispatchRequest::from_event(event, pending, DispatchOrigin::Manual),
            None => DispatchRequest::unstored(&candidate, pending),
        };
        info!(winner = %req.winner, item = %req.item, status = %decision.status, "Manual dispatch");
        let dispatch = self.dispatcher.dispatch(req).await;

        ReprintResponse {
            admission: Some(decision.status),
            entry_id: decision.event.map(|e| e.entry_id),
            dispatch,
        }
    }

    /// Operator reprint of an existing ledger entry of the active show.
    pub async fn reprint_entry(&self, entry_id: Uuid) -> Result<ReprintResponse, AdmissionError> {
        let ledger = self
            .sessions
            .active_ledger()
            .await
            .ok_or(AdmissionError::NoActiveShow)?;
        let Ok(found) = ledger.process(FindWinEvent { entry_id }).await;
        let event = found.ok_or(AdmissionError::EntryNotFound(entry_id))?;
        Ok(self.reprint(event).await)
    }

    /// Reprint the most recent entry of the active show.
    pub async fn print_last(&self) -> Result<ReprintResponse, AdmissionError> {
        let ledger = self
            .sessions
            .active_ledger()
            .await
            .ok_or(AdmissionError::NoActiveShow)?;
        let Ok(mut recent) = ledger.process(ListWinEvents { limit: 1 }).await;
        let event = recent.pop().ok_or(AdmissionError::EmptyLedger)?;
        Ok(self.reprint(event).await)
    }

    async fn reprint(&self, event: WinEvent) -> ReprintResponse {
        let pending = self.probe.is_payment_pending(&event.winner, &event.item);
        let req = DispatchRequest::from_event(&event, pending, DispatchOrigin::Manual);
        info!(entry_id = %event.entry_id, winner = %event.winner, item = %event.item, "Reprinting entry");
        let dispatch = self.dispatcher.dispatch(req).await;
        ReprintResponse {
            admission: None,
            entry_id: Some(event.entry_id),
            dispatch,
        }
    }

    /// Duplicate check, session check and classified append, under the
    /// session read guard.
    async fn store(&self, candidate: WinCandidate) -> (AdmissionDecision, Option<ShowId>) {
        let guard = self.sessions.admission_guard().await;
        let Some(ledger) = guard.ledger() else {
            return (
                AdmissionDecision::rejected(AdmissionStatus::NoActiveSession, "no show is active"),
                None,
            );
        };
        let show_id = ledger.show_id().clone();

        let settings = self.settings.snapshot().await;
        let (status, reason) = self.classify(&candidate, &settings);
        let Ok(outcome) = ledger.process(AppendWinEvent { candidate, status }).await;
        drop(guard);

        let decision = match outcome {
            AppendOutcome::Duplicate(existing) => AdmissionDecision {
                status: AdmissionStatus::Duplicate,
                reason: Some("already recorded in this show".to_string()),
                event: Some(existing),
            },
            AppendOutcome::Appended(event) => AdmissionDecision {
                status: event.status.into(),
                reason,
                event: Some(event),
            },
        };
        (decision, Some(show_id))
    }

    fn classify(
        &self,
        candidate: &WinCandidate,
        settings: &PipelineSettings,
    ) -> (EventStatus, Option<String>) {
        if let Some(reason) = settings.exclusion_reason(candidate.kind, &candidate.item) {
            return (EventStatus::Excluded, Some(reason));
        }
        if self.is_pending(candidate) {
            return (EventStatus::PaymentPending, Some("payment pending".to_string()));
        }
        (EventStatus::Recorded, None)
    }

    fn is_pending(&self, candidate: &WinCandidate) -> bool {
        candidate.payment_pending_hint
            || self
                .probe
                .is_payment_pending(&candidate.winner, &candidate.item)
    }

    fn announce(
        &self,
        candidate: &WinCandidate,
        decision: &AdmissionDecision,
        show_id: Option<ShowId>,
    ) {
        match decision.status {
            AdmissionStatus::Recorded => info!(
                kind = %candidate.kind,
                winner = %candidate.winner,
                item = %candidate.item,
                price = ?candidate.price,
                "Win recorded"
            ),
            status => debug!(
                %status,
                reason = ?decision.reason,
                winner = %candidate.winner,
                item = %candidate.item,
                "Win not dispatched"
            ),
        }
        self.notices.publish(PipelineNotice::Admission {
            status: decision.status,
            kind: candidate.kind,
            winner: candidate.winner.clone(),
            item: candidate.item.clone(),
            price: candidate.price.clone(),
            show_id,
        });
    }
}
