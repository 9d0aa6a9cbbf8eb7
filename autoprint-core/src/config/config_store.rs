//! Versioned settings store with change notification.
//!
//! `ConfigStore<T>` keeps the live value behind an `RwLock` and bumps a
//! version on every update, published through a `watch` channel. Readers
//! that only need a consistent copy use [`ConfigStore::snapshot`]; long-lived
//! tasks subscribe with [`ConfigStore::subscribe`] and react to changes.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{RwLock, RwLockReadGuard, watch};

pub struct ConfigStore<T> {
    inner: Arc<ConfigStoreInner<T>>,
}

struct ConfigStoreInner<T> {
    data: RwLock<T>,
    version: AtomicU64,
    version_tx: watch::Sender<u64>,
}

/// Receives the version number of every [`ConfigStore`] update.
pub struct ConfigWatcher {
    version_rx: watch::Receiver<u64>,
}

impl<T> ConfigStore<T> {
    pub fn new(initial: T) -> Self {
        let (version_tx, _) = watch::channel(0u64);
        Self {
            inner: Arc::new(ConfigStoreInner {
                data: RwLock::new(initial),
                version: AtomicU64::new(0),
                version_tx,
            }),
        }
    }

    /// Replace the stored value and notify all watchers. Returns the new
    /// version.
    pub async fn update(&self, value: T) -> u64 {
        let mut guard = self.inner.data.write().await;
        *guard = value;
        let new_version = self.inner.version.fetch_add(1, Ordering::Relaxed) + 1;
        drop(guard);
        let _ = self.inner.version_tx.send(new_version);
        new_version
    }

    pub async fn read(&self) -> RwLockReadGuard<'_, T> {
        self.inner.data.read().await
    }

    pub fn version(&self) -> u64 {
        self.inner.version.load(Ordering::Relaxed)
    }

    pub fn subscribe(&self) -> ConfigWatcher {
        ConfigWatcher {
            version_rx: self.inner.version_tx.subscribe(),
        }
    }
}

impl<T: Clone> ConfigStore<T> {
    /// Clone the current value out of the lock.
    pub async fn snapshot(&self) -> T {
        self.inner.data.read().await.clone()
    }
}

impl<T> Clone for ConfigStore<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl ConfigWatcher {
    /// Wait for the next update. Errors once the store is dropped.
    pub async fn changed(&mut self) -> Result<u64, watch::error::RecvError> {
        self.version_rx.changed().await?;
        Ok(*self.version_rx.borrow_and_update())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_update_notifies_watchers() {
        let store = ConfigStore::new(1u32);
        let mut watcher = store.subscribe();

        assert_eq!(store.update(2).await, 1);
        assert_eq!(watcher.changed().await.unwrap(), 1);
        assert_eq!(store.snapshot().await, 2);
        assert_eq!(store.version(), 1);
    }
}
