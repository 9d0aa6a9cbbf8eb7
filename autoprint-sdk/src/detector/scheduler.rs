//! Scan scheduler for the detector.
//!
//! Scans are triggered by three sources: a periodic timer, bursts of page
//! mutation signals, and the initial page load. The scheduler runs as a
//! single cooperative task that coalesces all of them into scan ticks:
//!
//! - mutation signals are debounced; a scan runs once the page has been
//!   quiet for `debounce`
//! - the periodic timer fires every `periodic`, first after `initial_delay`
//! - two scans are never closer than `min_interval`, whatever triggered them
//!
//! The scan callback itself is opaque; it usually runs the page heuristics
//! and submits candidates through a [`WinSubmitter`](crate::client::transport::WinSubmitter).

use std::future::Future;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

/// Buffer for pending change signals. Signals beyond this are redundant
/// anyway, since a burst collapses into a single debounced scan.
const CHANGE_SIGNAL_BUFFER: usize = 16;

#[derive(Debug, Clone, Copy)]
pub struct ScanSchedulerConfig {
    pub min_interval: Duration,
    pub debounce: Duration,
    pub periodic: Duration,
    pub initial_delay: Duration,
}

impl Default for ScanSchedulerConfig {
    fn default() -> Self {
        Self {
            min_interval: Duration::from_secs(1),
            debounce: Duration::from_millis(500),
            periodic: Duration::from_secs(10),
            initial_delay: Duration::from_secs(1),
        }
    }
}

/// Handle used by page observers to report "something changed".
#[derive(Clone)]
pub struct ChangeNotifier {
    tx: mpsc::Sender<()>,
}

impl ChangeNotifier {
    /// Report a change. Never blocks; a full buffer means a scan is already
    /// due, so the signal is dropped.
    pub fn notify(&self) {
        let _ = self.tx.try_send(());
    }
}

/// Why a scan ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanTrigger {
    Periodic,
    Mutation,
}

pub struct ScanScheduler {
    config: ScanSchedulerConfig,
    changes_rx: mpsc::Receiver<()>,
}

impl ScanScheduler {
    /// Create a scheduler and the notifier that feeds it.
    pub fn new(config: ScanSchedulerConfig) -> (Self, ChangeNotifier) {
        let (tx, changes_rx) = mpsc::channel(CHANGE_SIGNAL_BUFFER);
        (Self { config, changes_rx }, ChangeNotifier { tx })
    }

    /// Run until shutdown is signaled, calling `scan` on every tick.
    pub async fn run<F, Fut>(mut self, mut scan: F, mut shutdown_rx: watch::Receiver<bool>)
    where
        F: FnMut(ScanTrigger) -> Fut,
        Fut: Future<Output = ()>,
    {
        info!("ScanScheduler started");

        let start = Instant::now() + self.config.initial_delay;
        let mut periodic = tokio::time::interval_at(start, self.config.periodic);
        periodic.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut debounce_deadline: Option<Instant> = None;
        let mut last_scan: Option<Instant> = None;
        let mut changes_open = true;

        loop {
            let pending_deadline = debounce_deadline;
            let debounce = async move {
                match pending_deadline {
                    Some(deadline) => tokio::time::sleep_until(deadline).await,
                    None => std::future::pending::<()>().await,
                }
            };

            let trigger = tokio::select! {
                biased;

                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("ScanScheduler received shutdown signal");
                        break;
                    }
                    continue;
                }

                signal = self.changes_rx.recv(), if changes_open => {
                    match signal {
                        Some(()) => debounce_deadline = Some(Instant::now() + self.config.debounce),
                        None => {
                            debug!("All change notifiers dropped");
                            changes_open = false;
                        }
                    }
                    continue;
                }

                _ = debounce => {
                    debounce_deadline = None;
                    ScanTrigger::Mutation
                }

                _ = periodic.tick() => ScanTrigger::Periodic,
            };

            let now = Instant::now();
            if let Some(last) = last_scan {
                if now.saturating_duration_since(last) < self.config.min_interval {
                    debug!(?trigger, "Skipping scan, previous scan too recent");
                    continue;
                }
            }
            last_scan = Some(now);
            scan(trigger).await;
        }

        info!("ScanScheduler shutdown complete");
    }
}
