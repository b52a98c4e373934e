//! Registry of live hub and client sessions.
//!
//! [`SessionRegistry`] owns every [`HubSession`] and [`ClientSession`].
//! Callers only get owned snapshots ([`HubSummary`], cloned [`Outbound`]
//! handles), never references into the maps.
//!
//! # Hub id collisions
//!
//! Registering a hub id that is already live replaces the old session and
//! returns it so the caller can close its socket. Removal is keyed by the
//! socket's connection id, so the evicted connection's cleanup cannot remove
//! its replacement.

use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::RwLock;

use super::session::{ClientSession, HubSession, HubSummary, Outbound};
use super::{ClientId, HubId, PortId, Subscription};

/// Central store for all live sessions.
///
/// Hubs and clients live behind separate [`RwLock`]s: hub traffic and
/// client subscription changes never contend with each other.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    hubs: RwLock<HashMap<HubId, HubSession>>,
    clients: RwLock<HashMap<ClientId, ClientSession>>,
}

impl SessionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ── Hubs ───────────────────────────────────────────────────────────

    /// Registers a hub session, returning the session it replaced, if any.
    pub async fn register_hub(&self, session: HubSession) -> Option<HubSession> {
        let mut hubs = self.hubs.write().await;
        hubs.insert(session.hub_id.clone(), session)
    }

    /// Removes the hub's session if it still belongs to `connection_id`.
    ///
    /// Returns `true` if a session was removed.
    pub async fn remove_hub(&self, hub_id: &HubId, connection_id: uuid::Uuid) -> bool {
        let mut hubs = self.hubs.write().await;
        match hubs.get(hub_id) {
            Some(current) if current.connection_id == connection_id => {
                hubs.remove(hub_id);
                true
            }
            _ => false,
        }
    }

    /// Updates the hub's last-seen timestamp. Returns `false` if the hub is
    /// not registered.
    pub async fn touch_hub(&self, hub_id: &HubId) -> bool {
        let mut hubs = self.hubs.write().await;
        match hubs.get_mut(hub_id) {
            Some(session) => {
                session.last_seen = Utc::now();
                true
            }
            None => false,
        }
    }

    /// Returns a summary of one hub session.
    pub async fn get_hub(&self, hub_id: &HubId) -> Option<HubSummary> {
        let hubs = self.hubs.read().await;
        hubs.get(hub_id).map(HubSummary::from)
    }

    /// Returns summaries of all hub sessions, ordered by hub id.
    pub async fn list_hubs(&self) -> Vec<HubSummary> {
        let hubs = self.hubs.read().await;
        let mut summaries: Vec<HubSummary> = hubs.values().map(HubSummary::from).collect();
        summaries.sort_by(|a, b| a.hub_id.cmp(&b.hub_id));
        summaries
    }

    /// Returns `true` if the hub has a live session.
    pub async fn is_connected(&self, hub_id: &HubId) -> bool {
        self.hubs.read().await.contains_key(hub_id)
    }

    /// Returns a handle to the hub socket's writer.
    pub async fn hub_outbound(&self, hub_id: &HubId) -> Option<Outbound> {
        let hubs = self.hubs.read().await;
        hubs.get(hub_id).map(|s| s.outbound.clone())
    }

    /// Returns the number of live hub sessions.
    pub async fn hub_count(&self) -> usize {
        self.hubs.read().await.len()
    }

    // ── Clients ────────────────────────────────────────────────────────

    /// Registers a client session and returns its id.
    pub async fn register_client(&self, session: ClientSession) -> ClientId {
        let client_id = session.client_id;
        self.clients.write().await.insert(client_id, session);
        client_id
    }

    /// Removes a client session. Removing an unknown id is a no-op.
    ///
    /// Returns `true` if a session was removed.
    pub async fn remove_client(&self, client_id: ClientId) -> bool {
        self.clients.write().await.remove(&client_id).is_some()
    }

    /// Removes several client sessions under one lock acquisition,
    /// returning their handles so the caller can cancel them.
    pub async fn remove_clients(&self, client_ids: &[ClientId]) -> Vec<Outbound> {
        let mut clients = self.clients.write().await;
        client_ids
            .iter()
            .filter_map(|id| clients.remove(id))
            .map(|s| s.outbound)
            .collect()
    }

    /// Adds pairs to a client's subscription set and returns the full set.
    ///
    /// Returns `None` if the client is not registered.
    pub async fn subscribe(
        &self,
        client_id: ClientId,
        pairs: &[Subscription],
    ) -> Option<Vec<Subscription>> {
        let mut clients = self.clients.write().await;
        let session = clients.get_mut(&client_id)?;
        session.subscriptions.subscribe(pairs);
        Some(session.subscriptions.to_vec())
    }

    /// Removes pairs from a client's subscription set and returns only the
    /// pairs that were actually removed.
    ///
    /// Returns `None` if the client is not registered.
    pub async fn unsubscribe(
        &self,
        client_id: ClientId,
        pairs: &[Subscription],
    ) -> Option<Vec<Subscription>> {
        let mut clients = self.clients.write().await;
        let session = clients.get_mut(&client_id)?;
        Some(session.subscriptions.unsubscribe(pairs))
    }

    /// Returns a client's current subscriptions.
    pub async fn subscriptions(&self, client_id: ClientId) -> Option<Vec<Subscription>> {
        let clients = self.clients.read().await;
        clients.get(&client_id).map(|s| s.subscriptions.to_vec())
    }

    /// Returns the number of live client sessions.
    pub async fn client_count(&self) -> usize {
        self.clients.read().await.len()
    }

    /// Returns handles of clients subscribed to exactly `(hub_id, port_id)`.
    pub async fn subscribed_clients(
        &self,
        hub_id: &HubId,
        port_id: &PortId,
    ) -> Vec<(ClientId, Outbound)> {
        let clients = self.clients.read().await;
        clients
            .values()
            .filter(|s| s.subscriptions.matches(hub_id, port_id))
            .map(|s| (s.client_id, s.outbound.clone()))
            .collect()
    }

    /// Returns handles of every live client.
    pub async fn all_clients(&self) -> Vec<(ClientId, Outbound)> {
        let clients = self.clients.read().await;
        clients
            .values()
            .map(|s| (s.client_id, s.outbound.clone()))
            .collect()
    }
}
