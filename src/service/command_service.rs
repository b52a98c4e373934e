//! Command dispatcher: delivers commands to connected hubs.

use std::sync::Arc;

use crate::domain::{HubId, SessionRegistry};
use crate::error::DispatchError;
use crate::ws::messages::{Command, HubOutbound};

/// Sends `command` envelopes through a hub's outbound queue.
///
/// Dispatch never blocks on the hub socket and never tears down the
/// connection. Delivery to the hub is the only guarantee; execution is
/// reported back asynchronously through `task_status` frames.
#[derive(Debug, Clone)]
pub struct CommandDispatcher {
    registry: Arc<SessionRegistry>,
}

impl CommandDispatcher {
    /// Creates a new `CommandDispatcher`.
    #[must_use]
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self { registry }
    }

    /// Queues `command` for `hub_id`.
    ///
    /// # Errors
    ///
    /// - [`DispatchError::HubNotConnected`] if the hub has no live session.
    /// - [`DispatchError::EnqueueFailed`] if its outbound queue is full or
    ///   closed.
    pub async fn dispatch(&self, hub_id: &HubId, command: Command) -> Result<(), DispatchError> {
        let outbound = self
            .registry
            .hub_outbound(hub_id)
            .await
            .ok_or_else(|| DispatchError::HubNotConnected(hub_id.clone()))?;

        let command_id = command.command_id.clone();
        let command_type = command.command_type.as_str();
        let text = HubOutbound::Command { command }.to_json()?;

        outbound
            .try_send_text(text)
            .map_err(|reason| DispatchError::EnqueueFailed {
                hub_id: hub_id.clone(),
                reason,
            })?;

        tracing::info!(hub_id = %hub_id, command_id = %command_id, command_type, "command sent");
        Ok(())
    }
}
