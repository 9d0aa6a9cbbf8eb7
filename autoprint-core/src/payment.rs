//! Payment-pending lookups.
//!
//! Whether a buyer still owes payment is a page-state observation made by
//! the detector. The server keeps the latest observations in a
//! [`PendingHoldList`] and admission consults it through
//! [`PaymentPendingProbe`].

use std::collections::HashSet;
use std::sync::Mutex;

use tracing::{debug, warn};

pub trait PaymentPendingProbe: Send + Sync {
    fn is_payment_pending(&self, winner: &str, item: &str) -> bool;
}

/// Probe for setups without payment tracking.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverPending;

impl PaymentPendingProbe for NeverPending {
    fn is_payment_pending(&self, _: &str, _: &str) -> bool {
        false
    }
}

/// `(winner, item)` pairs the detector reported as payment pending.
/// Matching ignores case.
#[derive(Debug, Default)]
pub struct PendingHoldList {
    held: Mutex<HashSet<(String, String)>>,
}

impl PendingHoldList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the latest observation for a pair.
    pub fn set(&self, winner: &str, item: &str, pending: bool) {
        let key = hold_key(winner, item);
        match self.held.lock() {
            Ok(mut held) => {
                if pending {
                    held.insert(key);
                } else {
                    held.remove(&key);
                }
                debug!(winner, item, pending, "Payment hold updated");
            }
            Err(_) => warn!(winner, item, "Payment hold list poisoned, update dropped"),
        }
    }

    pub fn len(&self) -> usize {
        self.held.lock().map(|h| h.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PaymentPendingProbe for PendingHoldList {
    fn is_payment_pending(&self, winner: &str, item: &str) -> bool {
        match self.held.lock() {
            Ok(held) => held.contains(&hold_key(winner, item)),
            Err(_) => {
                warn!(winner, item, "Payment hold list poisoned, assuming paid");
                false
            }
        }
    }
}

fn hold_key(winner: &str, item: &str) -> (String, String) {
    (winner.trim().to_lowercase(), item.trim().to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hold_list_set_and_clear() {
        let holds = PendingHoldList::new();
        holds.set("Alice", "Charizard Card", true);
        assert!(holds.is_payment_pending("alice", "charizard card"));
        assert!(!holds.is_payment_pending("alice", "Pikachu Card"));

        holds.set("ALICE", "Charizard Card", false);
        assert!(holds.is_empty());
    }
}
