//! Serialized, persisted updates of operator settings.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::info;

use super::{ConfigStore, PipelineSettings};
use crate::entities::ShowRegistry;

#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("settings I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("settings serialization error: {0}")]
    Serialize(String),
}

/// Durable home of the mutable settings. The server implements this over
/// its TOML config file.
#[async_trait]
pub trait SettingsPersistence: Send + Sync {
    async fn persist_pipeline(&self, settings: &PipelineSettings) -> Result<(), PersistError>;
    async fn persist_shows(&self, registry: &ShowRegistry) -> Result<(), PersistError>;
}

/// Keeps everything in memory. For tests and embedders without a config
/// file.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPersistence;

#[async_trait]
impl SettingsPersistence for NoPersistence {
    async fn persist_pipeline(&self, _: &PipelineSettings) -> Result<(), PersistError> {
        Ok(())
    }

    async fn persist_shows(&self, _: &ShowRegistry) -> Result<(), PersistError> {
        Ok(())
    }
}

/// Applies operator edits to [`PipelineSettings`].
///
/// Updates are serialized. The edited value is persisted before it becomes
/// visible, so a failed write leaves the live settings untouched.
pub struct SettingsController {
    store: ConfigStore<PipelineSettings>,
    persistence: Arc<dyn SettingsPersistence>,
    write_lock: Mutex<()>,
}

impl SettingsController {
    pub fn new(initial: PipelineSettings, persistence: Arc<dyn SettingsPersistence>) -> Self {
        Self {
            store: ConfigStore::new(initial),
            persistence,
            write_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &ConfigStore<PipelineSettings> {
        &self.store
    }

    pub async fn snapshot(&self) -> PipelineSettings {
        self.store.snapshot().await
    }

    /// Apply `edit` to a copy of the current settings, persist it, then
    /// publish it. Returns the new settings.
    pub async fn update<F>(&self, edit: F) -> Result<PipelineSettings, PersistError>
    where
        F: FnOnce(&mut PipelineSettings),
    {
        let _guard = self.write_lock.lock().await;
        let mut next = self.store.snapshot().await;
        edit(&mut next);
        self.persistence.persist_pipeline(&next).await?;
        let version = self.store.update(next.clone()).await;
        info!(version, "Pipeline settings updated");
        Ok(next)
    }

    /// Publish settings that were reloaded from disk. Not persisted again.
    pub async fn replace(&self, settings: PipelineSettings) {
        let _guard = self.write_lock.lock().await;
        let version = self.store.update(settings).await;
        info!(version, "Pipeline settings reloaded");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Default)]
    struct FailingPersistence {
        fail: AtomicBool,
    }

    #[async_trait]
    impl SettingsPersistence for FailingPersistence {
        async fn persist_pipeline(&self, _: &PipelineSettings) -> Result<(), PersistError> {
            if self.fail.load(Ordering::SeqCst) {
                Err(PersistError::Serialize("disk full".into()))
            } else {
                Ok(())
            }
        }

        async fn persist_shows(&self, _: &ShowRegistry) -> Result<(), PersistError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_failed_persist_keeps_live_settings() {
        let persistence = Arc::new(FailingPersistence::default());
        let controller = SettingsController::new(PipelineSettings::default(), persistence.clone());

        let updated = controller
            .update(|s| s.printing_enabled = false)
            .await
            .unwrap();
        assert!(!updated.printing_enabled);

        persistence.fail.store(true, Ordering::SeqCst);
        assert!(controller.update(|s| s.printing_enabled = true).await.is_err());
        assert!(!controller.snapshot().await.printing_enabled);
    }
}
