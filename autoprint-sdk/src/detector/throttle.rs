//! Detector-side suppression of re-detected wins.
//!
//! The page is rescanned on a timer and on every burst of DOM mutations, so
//! the same win is usually seen many times in a row. [`DetectorThrottle`]
//! keeps a bounded map from a coarse key to the time it was last emitted and
//! suppresses repeats. It is a provisional filter only: the server performs
//! the durable deduplication, so every internal failure lets the candidate
//! through.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

use crate::objects::WinEventPayload;

/// How long a key suppresses repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleMode {
    /// Key is `name|item|price`; repeats are suppressed for `window`.
    Windowed,
    /// Key is `name|item`; a key is suppressed until it is evicted by the
    /// entry cap or the throttle is reset.
    SessionLifetime,
}

#[derive(Debug, Clone, Copy)]
pub struct ThrottleConfig {
    pub mode: ThrottleMode,
    pub window: Duration,
    pub max_entries: usize,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            mode: ThrottleMode::Windowed,
            window: Duration::from_secs(5),
            max_entries: 500,
        }
    }
}

#[derive(Default)]
struct ThrottleState {
    last_seen: HashMap<String, Instant>,
    /// Insertion log used for oldest-first eviction. A record is stale when
    /// the map holds a newer instant for the same key.
    order: VecDeque<(String, Instant)>,
}

/// Bounded, time-windowed suppression of repeated candidates.
pub struct DetectorThrottle {
    config: ThrottleConfig,
    state: Mutex<ThrottleState>,
}

impl DetectorThrottle {
    pub fn new(config: ThrottleConfig) -> Self {
        Self {
            config,
            state: Mutex::new(ThrottleState::default()),
        }
    }

    /// Returns `false` when the candidate was emitted recently and should be
    /// suppressed. Records the candidate as emitted otherwise.
    pub fn should_emit(&self, candidate: &WinEventPayload) -> bool {
        let key = self.key_for(candidate);
        let now = Instant::now();

        let mut state = match self.state.lock() {
            Ok(state) => state,
            Err(_) => {
                warn!(%key, "Throttle state poisoned, letting candidate through");
                return true;
            }
        };

        if let Some(last) = state.last_seen.get(&key) {
            let suppressed = match self.config.mode {
                ThrottleMode::Windowed => now.saturating_duration_since(*last) < self.config.window,
                ThrottleMode::SessionLifetime => true,
            };
            if suppressed {
                debug!(%key, "Throttled repeated candidate");
                return false;
            }
        }

        state.last_seen.insert(key.clone(), now);
        state.order.push_back((key, now));
        self.evict(&mut state, now);
        true
    }

    /// Forget every key. Called when the detector starts following a new show.
    pub fn reset(&self) {
        match self.state.lock() {
            Ok(mut state) => {
                state.last_seen.clear();
                state.order.clear();
            }
            Err(_) => warn!("Throttle state poisoned, reset skipped"),
        }
    }

    /// Number of keys currently tracked.
    pub fn len(&self) -> usize {
        self.state.lock().map(|s| s.last_seen.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn key_for(&self, candidate: &WinEventPayload) -> String {
        match self.config.mode {
            ThrottleMode::Windowed => format!(
                "{}|{}|{}",
                candidate.name,
                candidate.item,
                candidate.price.as_deref().unwrap_or("no-price")
            ),
            ThrottleMode::SessionLifetime => format!("{}|{}", candidate.name, candidate.item),
        }
    }

    fn evict(&self, state: &mut ThrottleState, now: Instant) {
        if self.config.mode == ThrottleMode::Windowed {
            let horizon = self.config.window * 2;
            while let Some((_, at)) = state.order.front() {
                if now.saturating_duration_since(*at) <= horizon {
                    break;
                }
                if let Some((key, at)) = state.order.pop_front() {
                    remove_if_current(state, &key, at);
                }
            }
        }

        while state.last_seen.len() > self.config.max_entries {
            let Some((key, at)) = state.order.pop_front() else {
                break;
            };
            remove_if_current(state, &key, at);
        }
    }
}

impl Default for DetectorThrottle {
    fn default() -> Self {
        Self::new(ThrottleConfig::default())
    }
}

fn remove_if_current(state: &mut ThrottleState, key: &str, at: Instant) {
    if state.last_seen.get(key) == Some(&at) {
        state.last_seen.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sale(name: &str, item: &str, price: &str) -> WinEventPayload {
        WinEventPayload::sale(name, item, Some(price.to_string()))
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeat_within_window_is_suppressed() {
        let throttle = DetectorThrottle::default();
        let win = sale("alice", "Charizard Card", "$12.50");

        assert!(throttle.should_emit(&win));
        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(!throttle.should_emit(&win));

        tokio::time::advance(Duration::from_secs(4)).await;
        assert!(throttle.should_emit(&win));
    }

    #[tokio::test(start_paused = true)]
    async fn test_price_is_part_of_windowed_key() {
        let throttle = DetectorThrottle::default();
        assert!(throttle.should_emit(&sale("alice", "Charizard Card", "$12.50")));
        assert!(throttle.should_emit(&sale("alice", "Charizard Card", "$15.00")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_lifetime_ignores_price_and_time() {
        let throttle = DetectorThrottle::new(ThrottleConfig {
            mode: ThrottleMode::SessionLifetime,
            ..ThrottleConfig::default()
        });
        assert!(throttle.should_emit(&sale("alice", "Charizard Card", "$12.50")));
        tokio::time::advance(Duration::from_secs(3600)).await;
        assert!(!throttle.should_emit(&sale("alice", "Charizard Card", "$99.00")));

        throttle.reset();
        assert!(throttle.should_emit(&sale("alice", "Charizard Card", "$12.50")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_entries_are_evicted() {
        let throttle = DetectorThrottle::default();
        for i in 0..10 {
            assert!(throttle.should_emit(&sale("bidder", &format!("Lot {i}"), "$1")));
        }
        assert_eq!(throttle.len(), 10);

        tokio::time::advance(Duration::from_secs(11)).await;
        assert!(throttle.should_emit(&sale("late", "Lot X", "$1")));
        assert_eq!(throttle.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_cap_evicts_oldest_first() {
        let throttle = DetectorThrottle::new(ThrottleConfig {
            mode: ThrottleMode::SessionLifetime,
            max_entries: 3,
            ..ThrottleConfig::default()
        });
        for name in ["a", "b", "c", "d"] {
            assert!(throttle.should_emit(&sale(name, "Lot", "$1")));
        }
        assert_eq!(throttle.len(), 3);
        // "a" was evicted, so it passes again; "d" is still tracked.
        assert!(throttle.should_emit(&sale("a", "Lot", "$1")));
        assert!(!throttle.should_emit(&sale("d", "Lot", "$1")));
    }
}
