//! Per-show win ledger.
//!
//! Each show owns one JSON file holding an array of [`WinEvent`]s, oldest
//! first, capped at `max_entries`. [`LedgerProcessor`] does the file I/O;
//! [`SessionLedger`] is the in-memory copy of the active show's file and the
//! only place entries are appended.

use std::convert::Infallible;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use kanau::processor::Processor;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::entities::show::ShowId;
use crate::entities::win::{EventStatus, WinCandidate, WinEvent};

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("ledger I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("ledger serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// File access for show ledgers under one directory.
#[derive(Debug, Clone)]
pub struct LedgerProcessor {
    pub dir: PathBuf,
    pub max_entries: usize,
}

impl LedgerProcessor {
    pub fn new(dir: impl Into<PathBuf>, max_entries: usize) -> Self {
        Self {
            dir: dir.into(),
            max_entries: max_entries.max(1),
        }
    }

    pub fn path_for(&self, show_id: &ShowId) -> PathBuf {
        self.dir.join(show_id.labels_file())
    }

    async fn write_events(&self, path: &Path, events: &[WinEvent]) -> Result<(), LedgerError> {
        let body = serde_json::to_vec_pretty(events)?;
        tokio::fs::create_dir_all(&self.dir).await?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &body).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }
}

/// Read a show's ledger file.
///
/// A missing file is created empty. An empty or malformed file is logged and
/// reset to `[]` on disk; it never fails the load.
#[derive(Debug, Clone)]
pub struct LoadLedger {
    pub show_id: ShowId,
}

impl Processor<LoadLedger> for LedgerProcessor {
    type Output = Vec<WinEvent>;
    type Error = LedgerError;
    #[tracing::instrument(skip_all, err, name = "Ledger:LoadLedger")]
    async fn process(&self, query: LoadLedger) -> Result<Vec<WinEvent>, LedgerError> {
        let path = self.path_for(&query.show_id);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "Ledger file missing, creating");
                self.write_events(&path, &[]).await?;
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let mut events: Vec<WinEvent> = match serde_json::from_slice(&bytes) {
            Ok(events) => events,
            Err(e) => {
                warn!(
                    show_id = %query.show_id,
                    path = %path.display(),
                    error = %e,
                    "Ledger file empty or corrupt, resetting"
                );
                self.write_events(&path, &[]).await?;
                return Ok(Vec::new());
            }
        };

        if events.len() > self.max_entries {
            let excess = events.len() - self.max_entries;
            events.drain(..excess);
        }
        Ok(events)
    }
}

/// Atomically replace a show's ledger file.
#[derive(Debug, Clone)]
pub struct PersistLedger {
    pub show_id: ShowId,
    pub events: Vec<WinEvent>,
}

impl Processor<PersistLedger> for LedgerProcessor {
    type Output = ();
    type Error = LedgerError;
    #[tracing::instrument(skip_all, err, name = "Ledger:PersistLedger")]
    async fn process(&self, cmd: PersistLedger) -> Result<(), LedgerError> {
        let path = self.path_for(&cmd.show_id);
        self.write_events(&path, &cmd.events).await
    }
}

/// Remove a show's ledger file. Missing files are not an error.
#[derive(Debug, Clone)]
pub struct DeleteLedger {
    pub show_id: ShowId,
}

impl Processor<DeleteLedger> for LedgerProcessor {
    type Output = bool;
    type Error = LedgerError;
    #[tracing::instrument(skip_all, err, name = "Ledger:DeleteLedger")]
    async fn process(&self, cmd: DeleteLedger) -> Result<bool, LedgerError> {
        match tokio::fs::remove_file(self.path_for(&cmd.show_id)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// In-memory ledger of the active show
// ---------------------------------------------------------------------------

/// Result of [`AppendWinEvent`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppendOutcome {
    /// An entry with the same identity already exists.
    Duplicate(WinEvent),
    Appended(WinEvent),
}

/// The loaded ledger of one show.
///
/// Check-then-append happens under a single lock, so concurrent admissions
/// of the same win produce exactly one entry.
pub struct SessionLedger {
    show_id: ShowId,
    files: LedgerProcessor,
    events: Mutex<Vec<WinEvent>>,
}

impl SessionLedger {
    pub async fn open(files: LedgerProcessor, show_id: ShowId) -> Result<Self, LedgerError> {
        let events = files
            .process(LoadLedger {
                show_id: show_id.clone(),
            })
            .await?;
        info!(show_id = %show_id, entries = events.len(), "Ledger loaded");
        Ok(Self {
            show_id,
            files,
            events: Mutex::new(events),
        })
    }

    /// Start an empty ledger for a new show, overwriting any file left
    /// behind under the same id.
    pub async fn create(files: LedgerProcessor, show_id: ShowId) -> Result<Self, LedgerError> {
        files
            .process(PersistLedger {
                show_id: show_id.clone(),
                events: Vec::new(),
            })
            .await?;
        info!(show_id = %show_id, "Ledger created");
        Ok(Self {
            show_id,
            files,
            events: Mutex::new(Vec::new()),
        })
    }

    pub fn show_id(&self) -> &ShowId {
        &self.show_id
    }

    pub async fn len(&self) -> usize {
        self.events.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.events.lock().await.is_empty()
    }
}

/// Append a candidate with an already decided status, unless its identity
/// is already stored.
///
/// The entry stays in memory even when the file write fails; the failure is
/// logged and the next successful write brings the file up to date.
#[derive(Debug, Clone)]
pub struct AppendWinEvent {
    pub candidate: WinCandidate,
    pub status: EventStatus,
}

impl Processor<AppendWinEvent> for SessionLedger {
    type Output = AppendOutcome;
    type Error = Infallible;
    async fn process(&self, cmd: AppendWinEvent) -> Result<AppendOutcome, Infallible> {
        let identity = cmd.candidate.identity();
        let mut events = self.events.lock().await;

        if let Some(existing) = events.iter().rev().find(|e| e.identity() == identity) {
            return Ok(AppendOutcome::Duplicate(existing.clone()));
        }

        let event = WinEvent::new(self.show_id.clone(), &cmd.candidate, cmd.status);
        events.push(event.clone());
        if events.len() > self.files.max_entries {
            let excess = events.len() - self.files.max_entries;
            events.drain(..excess);
        }

        if let Err(e) = self
            .files
            .process(PersistLedger {
                show_id: self.show_id.clone(),
                events: events.clone(),
            })
            .await
        {
            error!(
                show_id = %self.show_id,
                entry_id = %event.entry_id,
                error = %e,
                "Failed to persist ledger, entry kept in memory"
            );
        }

        Ok(AppendOutcome::Appended(event))
    }
}

/// Most recent entries first.
#[derive(Debug, Clone, Copy)]
pub struct ListWinEvents {
    pub limit: usize,
}

impl Processor<ListWinEvents> for SessionLedger {
    type Output = Vec<WinEvent>;
    type Error = Infallible;
    async fn process(&self, query: ListWinEvents) -> Result<Vec<WinEvent>, Infallible> {
        let events = self.events.lock().await;
        Ok(events.iter().rev().take(query.limit).cloned().collect())
    }
}

/// Case-insensitive substring search over winner and item, most recent
/// first.
#[derive(Debug, Clone)]
pub struct SearchWinEvents {
    pub query: String,
    pub limit: usize,
}

impl Processor<SearchWinEvents> for SessionLedger {
    type Output = Vec<WinEvent>;
    type Error = Infallible;
    async fn process(&self, query: SearchWinEvents) -> Result<Vec<WinEvent>, Infallible> {
        let needle = query.query.trim().to_lowercase();
        let events = self.events.lock().await;
        Ok(events
            .iter()
            .rev()
            .filter(|e| e.matches_query(&needle))
            .take(query.limit)
            .cloned()
            .collect())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FindWinEvent {
    pub entry_id: Uuid,
}

impl Processor<FindWinEvent> for SessionLedger {
    type Output = Option<WinEvent>;
    type Error = Infallible;
    async fn process(&self, query: FindWinEvent) -> Result<Option<WinEvent>, Infallible> {
        let events = self.events.lock().await;
        Ok(events.iter().find(|e| e.entry_id == query.entry_id).cloned())
    }
}

/// Clear the ledger in memory and on disk. Returns how many entries were
/// removed.
#[derive(Debug, Clone, Copy)]
pub struct ResetLedger;

impl Processor<ResetLedger> for SessionLedger {
    type Output = usize;
    type Error = LedgerError;
    #[tracing::instrument(skip_all, err, name = "Ledger:ResetLedger")]
    async fn process(&self, _: ResetLedger) -> Result<usize, LedgerError> {
        let mut events = self.events.lock().await;
        self.files
            .process(PersistLedger {
                show_id: self.show_id.clone(),
                events: Vec::new(),
            })
            .await?;
        let removed = events.len();
        events.clear();
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autoprint_sdk::objects::WinKind;

    fn files(dir: &tempfile::TempDir) -> LedgerProcessor {
        LedgerProcessor::new(dir.path(), 100)
    }

    fn show() -> ShowId {
        ShowId::from_slug("showa")
    }

    async fn append(ledger: &SessionLedger, candidate: WinCandidate) -> AppendOutcome {
        let Ok(outcome) = ledger
            .process(AppendWinEvent {
                candidate,
                status: EventStatus::Recorded,
            })
            .await;
        outcome
    }

    #[tokio::test]
    async fn test_missing_file_is_created_empty() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = SessionLedger::open(files(&dir), show()).await.unwrap();
        assert!(ledger.is_empty().await);

        let on_disk = std::fs::read_to_string(dir.path().join("labels-showa.json")).unwrap();
        assert_eq!(on_disk.trim(), "[]");
    }

    #[tokio::test]
    async fn test_corrupt_file_resets() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels-showa.json");
        std::fs::write(&path, "{not json").unwrap();

        let ledger = SessionLedger::open(files(&dir), show()).await.unwrap();
        assert!(ledger.is_empty().await);
        assert_eq!(std::fs::read_to_string(&path).unwrap().trim(), "[]");

        std::fs::write(&path, "").unwrap();
        let ledger = SessionLedger::open(files(&dir), show()).await.unwrap();
        assert!(ledger.is_empty().await);
    }

    #[tokio::test]
    async fn test_append_dedups_and_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = SessionLedger::open(files(&dir), show()).await.unwrap();
        let win = WinCandidate::sale("alice", "Charizard Card", Some("$12.50".into()));

        let first = append(&ledger, win.clone()).await;
        let AppendOutcome::Appended(stored) = first else {
            panic!("expected append, got {first:?}");
        };
        assert!(matches!(
            append(&ledger, win.clone()).await,
            AppendOutcome::Duplicate(existing) if existing.entry_id == stored.entry_id
        ));

        let reopened = SessionLedger::open(files(&dir), show()).await.unwrap();
        assert_eq!(reopened.len().await, 1);
        assert!(matches!(
            append(&reopened, win).await,
            AppendOutcome::Duplicate(_)
        ));
    }

    #[tokio::test]
    async fn test_retention_bound_drops_oldest() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = SessionLedger::open(LedgerProcessor::new(dir.path(), 3), show())
            .await
            .unwrap();
        for i in 0..5 {
            append(&ledger, WinCandidate::sale("bidder", format!("Lot {i}"), None)).await;
        }

        let Ok(recent) = ledger.process(ListWinEvents { limit: 10 }).await;
        let items: Vec<_> = recent.iter().map(|e| e.item.as_str()).collect();
        assert_eq!(items, vec!["Lot 4", "Lot 3", "Lot 2"]);
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = SessionLedger::open(files(&dir), show()).await.unwrap();
        append(&ledger, WinCandidate::sale("Alice", "Charizard Card", None)).await;
        append(&ledger, WinCandidate::giveaway("bob", "Giveaway Prize")).await;

        let Ok(hits) = ledger
            .process(SearchWinEvents {
                query: "CHARI".into(),
                limit: 10,
            })
            .await;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].winner, "Alice");

        let Ok(hits) = ledger
            .process(SearchWinEvents {
                query: "bob".into(),
                limit: 10,
            })
            .await;
        assert_eq!(hits[0].kind, WinKind::Giveaway);
    }

    #[tokio::test]
    async fn test_reset_clears_file() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = SessionLedger::open(files(&dir), show()).await.unwrap();
        append(&ledger, WinCandidate::sale("alice", "Lot", None)).await;

        assert_eq!(ledger.process(ResetLedger).await.unwrap(), 1);
        let reopened = SessionLedger::open(files(&dir), show()).await.unwrap();
        assert!(reopened.is_empty().await);
    }
}
