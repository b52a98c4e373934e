//! Fan-out of hub events to browser clients.
//!
//! Recipients are snapshotted under the registry read lock, then offered
//! the frame with a non-blocking enqueue after the lock is released. A
//! client whose queue is full or closed is pruned after the fan-out, so a
//! slow browser never delays the hub's receive loop or other clients.

use std::sync::Arc;

use super::{ClientId, HubId, Outbound, PortId, SessionRegistry};

/// Outcome of one broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Clients the frame was queued for.
    pub delivered: usize,
    /// Clients removed because their queue refused the frame.
    pub pruned: usize,
}

/// Delivers pre-serialized frames to client sessions.
#[derive(Debug, Clone)]
pub struct Broadcaster {
    registry: Arc<SessionRegistry>,
}

impl Broadcaster {
    /// Creates a broadcaster over the given registry.
    #[must_use]
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self { registry }
    }

    /// Sends `payload` to clients subscribed to exactly `(hub_id, port_id)`.
    pub async fn broadcast_scoped(
        &self,
        hub_id: &HubId,
        port_id: &PortId,
        payload: &str,
    ) -> BroadcastReport {
        let targets = self.registry.subscribed_clients(hub_id, port_id).await;
        self.fan_out(targets, payload).await
    }

    /// Sends `payload` to every connected client.
    pub async fn broadcast_all(&self, payload: &str) -> BroadcastReport {
        let targets = self.registry.all_clients().await;
        self.fan_out(targets, payload).await
    }

    async fn fan_out(&self, targets: Vec<(ClientId, Outbound)>, payload: &str) -> BroadcastReport {
        let mut report = BroadcastReport::default();
        let mut failed = Vec::new();

        for (client_id, outbound) in &targets {
            match outbound.try_send_text(payload.to_string()) {
                Ok(()) => report.delivered += 1,
                Err(reason) => {
                    tracing::warn!(client_id = %client_id, %reason, "dropping unreachable client");
                    failed.push(*client_id);
                }
            }
        }

        if !failed.is_empty() {
            for outbound in self.registry.remove_clients(&failed).await {
                outbound.abort();
            }
            report.pruned = failed.len();
        }
        report
    }
}
