//! Per-client subscription set.
//!
//! Tracks which `(hub, port)` pairs a client is subscribed to and
//! provides the server-side filter used by the broadcast engine.

use std::collections::BTreeSet;

use super::{HubId, PortId, Subscription};

/// The set of `(hub, port)` pairs a single client listens to.
///
/// Ordered so confirmations list pairs deterministically.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionSet {
    pairs: BTreeSet<Subscription>,
}

impl SubscriptionSet {
    /// Creates an empty subscription set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds pairs to the set. Already-present pairs are ignored.
    pub fn subscribe(&mut self, pairs: &[Subscription]) {
        for pair in pairs {
            self.pairs.insert(pair.clone());
        }
    }

    /// Removes pairs from the set, returning only those that were present.
    pub fn unsubscribe(&mut self, pairs: &[Subscription]) -> Vec<Subscription> {
        let mut removed = Vec::new();
        for pair in pairs {
            if self.pairs.remove(pair) && !removed.contains(pair) {
                removed.push(pair.clone());
            }
        }
        removed
    }

    /// Returns `true` if the client is subscribed to exactly this pair.
    #[must_use]
    pub fn matches(&self, hub_id: &HubId, port_id: &PortId) -> bool {
        self.pairs
            .contains(&Subscription::new(hub_id.clone(), port_id.clone()))
    }

    /// Returns all subscribed pairs in order.
    #[must_use]
    pub fn to_vec(&self) -> Vec<Subscription> {
        self.pairs.iter().cloned().collect()
    }
}
