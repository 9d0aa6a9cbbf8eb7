//! Application state shared across all request handlers.

use autoprint_core::Pipeline;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;
use time::OffsetDateTime;

/// A detector is considered connected when it checked in this recently.
pub const HEARTBEAT_TIMEOUT: Duration = Duration::from_secs(10);

/// Application state that is shared across all request handlers.
///
/// This is cloneable and cheap to pass around (everything is behind Arc).
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Pipeline,
    pub heartbeat: Arc<HeartbeatMonitor>,
}

impl AppState {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline,
            heartbeat: Arc::new(HeartbeatMonitor::default()),
        }
    }
}

/// Last time the detector checked in, in unix milliseconds.
#[derive(Debug, Default)]
pub struct HeartbeatMonitor {
    last_ms: AtomicI64,
}

impl HeartbeatMonitor {
    /// Record a check-in now and return its timestamp.
    pub fn beat(&self) -> i64 {
        let now = now_ms();
        self.last_ms.store(now, Ordering::Relaxed);
        now
    }

    pub fn last(&self) -> Option<i64> {
        match self.last_ms.load(Ordering::Relaxed) {
            0 => None,
            ms => Some(ms),
        }
    }

    pub fn is_active(&self) -> bool {
        self.last()
            .is_some_and(|last| now_ms() - last <= HEARTBEAT_TIMEOUT.as_millis() as i64)
    }
}

pub fn now_ms() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heartbeat_activity() {
        let monitor = HeartbeatMonitor::default();
        assert!(!monitor.is_active());
        assert_eq!(monitor.last(), None);

        let at = monitor.beat();
        assert_eq!(monitor.last(), Some(at));
        assert!(monitor.is_active());

        monitor.last_ms.store(at - 11_000, Ordering::Relaxed);
        assert!(!monitor.is_active());
    }
}
