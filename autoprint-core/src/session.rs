//! Show lifecycle.
//!
//! [`SessionManager`] owns the show registry and the ledger of the active
//! show. A show goes `Active → Ended` exactly once; there is never more than
//! one active show, and a new one can only be created after the current one
//! ended.
//!
//! Admissions hold a read guard on the session state for the whole
//! check-and-append, and every lifecycle change takes the write side. An
//! admission therefore either completes against the show it started with or
//! sees no active show; it never writes into a show that has ended.

use std::sync::Arc;

use kanau::processor::Processor;
use tokio::sync::{RwLock, RwLockReadGuard};
use tracing::{info, warn};

use crate::config::{PersistError, SettingsPersistence};
use crate::entities::{
    DeleteLedger, LedgerError, LedgerProcessor, ResetLedger, SessionLedger, ShowId, ShowRecord,
    ShowRegistry, ShowStatus,
};
use crate::events::{NoticeSender, PipelineNotice};
use autoprint_sdk::objects::ShowAction;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("show name is empty")]
    EmptyName,
    #[error("show name '{0}' has no letters or digits")]
    InvalidName(String),
    #[error("show '{0}' is still active, end it first")]
    AlreadyActive(ShowId),
    #[error("show '{0}' already exists")]
    ShowExists(ShowId),
    #[error("show '{0}' not found")]
    NotFound(ShowId),
    #[error("no show is active")]
    NoActiveShow,
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Persist(#[from] PersistError),
}

struct SessionState {
    registry: ShowRegistry,
    active: Option<Arc<SessionLedger>>,
}

/// Read access to the active show for the duration of one admission.
pub struct AdmissionGuard<'a> {
    state: RwLockReadGuard<'a, SessionState>,
}

impl AdmissionGuard<'_> {
    pub fn ledger(&self) -> Option<&Arc<SessionLedger>> {
        self.state.active.as_ref()
    }
}

pub struct SessionManager {
    files: LedgerProcessor,
    persistence: Arc<dyn SettingsPersistence>,
    notices: NoticeSender,
    state: RwLock<SessionState>,
}

impl SessionManager {
    /// Restore the registry and, if a show was active, load its ledger.
    pub async fn open(
        files: LedgerProcessor,
        mut registry: ShowRegistry,
        persistence: Arc<dyn SettingsPersistence>,
        notices: NoticeSender,
    ) -> Result<Self, SessionError> {
        let active_id = registry.active().map(|(id, _)| id.clone());
        let active = match active_id {
            Some(id) => {
                info!(show_id = %id, "Resuming active show");
                Some(Arc::new(SessionLedger::open(files.clone(), id).await?))
            }
            None => {
                if let Some(stale) = registry.current_show.take() {
                    warn!(show_id = %stale, "Current show is not active, clearing");
                }
                None
            }
        };

        Ok(Self {
            files,
            persistence,
            notices,
            state: RwLock::new(SessionState { registry, active }),
        })
    }

    pub async fn admission_guard(&self) -> AdmissionGuard<'_> {
        AdmissionGuard {
            state: self.state.read().await,
        }
    }

    /// Ledger of the active show, for history queries.
    pub async fn active_ledger(&self) -> Option<Arc<SessionLedger>> {
        self.state.read().await.active.clone()
    }

    pub async fn active_show_id(&self) -> Option<ShowId> {
        self.state
            .read()
            .await
            .active
            .as_ref()
            .map(|l| l.show_id().clone())
    }

    pub async fn registry(&self) -> ShowRegistry {
        self.state.read().await.registry.clone()
    }

    /// Start a new show and make it active.
    pub async fn create_show(&self, name: &str) -> Result<(ShowId, ShowRecord), SessionError> {
        if name.trim().is_empty() {
            return Err(SessionError::EmptyName);
        }
        let id =
            ShowId::from_name(name).ok_or_else(|| SessionError::InvalidName(name.to_string()))?;

        let mut state = self.state.write().await;
        if let Some((current, _)) = state.registry.active() {
            return Err(SessionError::AlreadyActive(current.clone()));
        }
        if state.registry.shows.contains_key(&id) {
            return Err(SessionError::ShowExists(id));
        }

        let ledger = SessionLedger::create(self.files.clone(), id.clone()).await?;
        let record = ShowRecord::new(&id, name);

        let mut next = state.registry.clone();
        next.shows.insert(id.clone(), record.clone());
        next.current_show = Some(id.clone());
        self.persistence.persist_shows(&next).await?;

        state.registry = next;
        state.active = Some(Arc::new(ledger));
        drop(state);

        info!(show_id = %id, name = %record.name, "Show created");
        self.notices.publish(PipelineNotice::Show {
            action: ShowAction::Created,
            show_id: id.clone(),
        });
        Ok((id, record))
    }

    /// End the active show. Its ledger stays readable on disk.
    pub async fn end_show(&self) -> Result<(ShowId, ShowRecord), SessionError> {
        let mut state = self.state.write().await;
        let id = state
            .registry
            .active()
            .map(|(id, _)| id.clone())
            .ok_or(SessionError::NoActiveShow)?;

        let mut next = state.registry.clone();
        let record = next
            .shows
            .get_mut(&id)
            .ok_or_else(|| SessionError::NotFound(id.clone()))?;
        record.status = ShowStatus::Ended;
        record.ended_at = Some(time::OffsetDateTime::now_utc());
        let record = record.clone();
        next.current_show = None;
        self.persistence.persist_shows(&next).await?;

        state.registry = next;
        state.active = None;
        drop(state);

        info!(show_id = %id, "Show ended");
        self.notices.publish(PipelineNotice::Show {
            action: ShowAction::Ended,
            show_id: id.clone(),
        });
        Ok((id, record))
    }

    /// Remove a show from the registry and delete its ledger file. Deleting
    /// the active show leaves no show active.
    pub async fn delete_show(&self, id: &ShowId) -> Result<(), SessionError> {
        let mut state = self.state.write().await;
        if !state.registry.shows.contains_key(id) {
            return Err(SessionError::NotFound(id.clone()));
        }

        let mut next = state.registry.clone();
        next.shows.remove(id);
        if next.current_show.as_ref() == Some(id) {
            next.current_show = None;
        }
        self.persistence.persist_shows(&next).await?;

        state.registry = next;
        if state.active.as_ref().is_some_and(|l| l.show_id() == id) {
            state.active = None;
        }
        drop(state);

        if let Err(e) = self
            .files
            .process(DeleteLedger {
                show_id: id.clone(),
            })
            .await
        {
            warn!(show_id = %id, error = %e, "Failed to delete ledger file");
        }

        info!(show_id = %id, "Show deleted");
        self.notices.publish(PipelineNotice::Show {
            action: ShowAction::Deleted,
            show_id: id.clone(),
        });
        Ok(())
    }

    /// Clear the active show's ledger. Returns the show and the number of
    /// removed entries.
    ///
    /// Holds the read guard like an admission, so a show that ends
    /// concurrently is never cleared after it ended.
    pub async fn reset_show(&self) -> Result<(ShowId, usize), SessionError> {
        let state = self.state.read().await;
        let ledger = state.active.as_ref().ok_or(SessionError::NoActiveShow)?;
        let removed = ledger.process(ResetLedger).await?;
        let id = ledger.show_id().clone();
        drop(state);

        info!(show_id = %id, removed, "Show history reset");
        self.notices.publish(PipelineNotice::Show {
            action: ShowAction::Reset,
            show_id: id.clone(),
        });
        Ok((id, removed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NoPersistence;
    use crate::entities::{AppendWinEvent, EventStatus, WinCandidate};
    use crate::events::notice_channel;

    async fn manager(dir: &tempfile::TempDir) -> SessionManager {
        SessionManager::open(
            LedgerProcessor::new(dir.path(), 100),
            ShowRegistry::default(),
            Arc::new(NoPersistence),
            notice_channel(),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_lifecycle_requires_end_before_create() {
        let dir = tempfile::tempdir().unwrap();
        let sessions = manager(&dir).await;
        assert!(sessions.active_show_id().await.is_none());

        let (id, _) = sessions.create_show("ShowA").await.unwrap();
        assert_eq!(id.as_str(), "showa");
        assert!(matches!(
            sessions.create_show("ShowB").await,
            Err(SessionError::AlreadyActive(current)) if current == id
        ));

        sessions.end_show().await.unwrap();
        assert!(sessions.active_show_id().await.is_none());
        assert!(matches!(
            sessions.end_show().await,
            Err(SessionError::NoActiveShow)
        ));

        assert!(matches!(
            sessions.create_show("showa").await,
            Err(SessionError::ShowExists(_))
        ));
        let (next, _) = sessions.create_show("ShowB").await.unwrap();
        assert_eq!(sessions.active_show_id().await, Some(next));
    }

    #[tokio::test]
    async fn test_ended_show_is_recorded_in_registry() {
        let dir = tempfile::tempdir().unwrap();
        let sessions = manager(&dir).await;
        sessions.create_show("ShowA").await.unwrap();
        let (_, record) = sessions.end_show().await.unwrap();
        assert_eq!(record.status, ShowStatus::Ended);
        assert!(record.ended_at.is_some());

        let registry = sessions.registry().await;
        assert!(registry.current_show.is_none());
        assert_eq!(registry.shows.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_active_show_clears_session() {
        let dir = tempfile::tempdir().unwrap();
        let sessions = manager(&dir).await;
        let (id, _) = sessions.create_show("ShowA").await.unwrap();
        assert!(dir.path().join("labels-showa.json").exists());

        sessions.delete_show(&id).await.unwrap();
        assert!(sessions.active_show_id().await.is_none());
        assert!(!dir.path().join("labels-showa.json").exists());
        assert!(matches!(
            sessions.delete_show(&id).await,
            Err(SessionError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_blank_name_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let sessions = manager(&dir).await;
        assert!(matches!(
            sessions.create_show("   ").await,
            Err(SessionError::EmptyName)
        ));
        assert!(matches!(
            sessions.create_show("!!!").await,
            Err(SessionError::InvalidName(_))
        ));
    }

    async fn record_sale(sessions: &SessionManager) {
        let ledger = sessions.active_ledger().await.unwrap();
        let Ok(_) = ledger
            .process(AppendWinEvent {
                candidate: WinCandidate::sale("alice", "Charizard Card", Some("$12.50".into())),
                status: EventStatus::Recorded,
            })
            .await;
    }

    #[tokio::test]
    async fn test_new_show_ignores_leftover_ledger_file() {
        let dir = tempfile::tempdir().unwrap();
        let earlier = manager(&dir).await;
        earlier.create_show("ShowA").await.unwrap();
        record_sale(&earlier).await;
        assert!(dir.path().join("labels-showa.json").exists());

        // Fresh registry, same directory: the old file is still there.
        let sessions = manager(&dir).await;
        let (id, _) = sessions.create_show("ShowA").await.unwrap();
        assert!(sessions.active_ledger().await.unwrap().is_empty().await);

        let reopened = SessionLedger::open(LedgerProcessor::new(dir.path(), 100), id)
            .await
            .unwrap();
        assert!(reopened.is_empty().await);
    }

    #[tokio::test]
    async fn test_reset_queued_behind_end_does_not_clear_ended_show() {
        let dir = tempfile::tempdir().unwrap();
        let sessions = Arc::new(manager(&dir).await);
        let (id, _) = sessions.create_show("ShowA").await.unwrap();
        record_sale(&sessions).await;

        // An admission in progress holds the read side.
        let admission = sessions.admission_guard().await;
        let end = tokio::spawn({
            let sessions = Arc::clone(&sessions);
            async move { sessions.end_show().await }
        });
        tokio::task::yield_now().await;
        let reset = tokio::spawn({
            let sessions = Arc::clone(&sessions);
            async move { sessions.reset_show().await }
        });
        tokio::task::yield_now().await;
        drop(admission);

        end.await.unwrap().unwrap();
        assert!(matches!(
            reset.await.unwrap(),
            Err(SessionError::NoActiveShow)
        ));

        let ended = SessionLedger::open(LedgerProcessor::new(dir.path(), 100), id)
            .await
            .unwrap();
        assert_eq!(ended.len().await, 1);
    }

    #[tokio::test]
    async fn test_reset_clears_active_show() {
        let dir = tempfile::tempdir().unwrap();
        let sessions = manager(&dir).await;
        let (id, _) = sessions.create_show("ShowA").await.unwrap();
        record_sale(&sessions).await;

        let (reset_id, removed) = sessions.reset_show().await.unwrap();
        assert_eq!(reset_id, id);
        assert_eq!(removed, 1);
        assert!(sessions.active_ledger().await.unwrap().is_empty().await);
    }
}
