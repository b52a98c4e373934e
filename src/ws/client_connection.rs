//! Browser client socket lifecycle.
//!
//! ```text
//! CONNECTING → AUTHENTICATING → ACTIVE → CLOSED
//! ```
//!
//! Authentication happens before the upgrade completes; an unauthenticated
//! socket is closed with 1008 before it can send or receive anything else.

use axum::extract::ws::{Message, WebSocket};
use futures_util::StreamExt;

use super::messages::{
    ClientCommandRequest, ClientInbound, ClientMessage, Command, CommandOutcome, SubscriptionState,
};
use super::outbound::{close_message, finish, spawn_writer};
use crate::app_state::AppState;
use crate::auth::Principal;
use crate::domain::{ClientId, ClientSession, Outbound};
use crate::error::close_code;

/// Runs one client socket from upgrade to close.
///
/// `principal` is `None` when the bearer token was missing or invalid.
pub async fn run_client_connection(
    mut socket: WebSocket,
    state: AppState,
    principal: Option<Principal>,
) {
    let Some(principal) = principal else {
        tracing::warn!("client rejected: invalid or missing token");
        let _ = socket
            .send(close_message(close_code::POLICY_VIOLATION, "authentication failed"))
            .await;
        return;
    };

    let (sink, mut stream) = socket.split();
    let (outbound, rx) = Outbound::channel(state.limits.outbound_queue_capacity);
    let writer = spawn_writer(sink, rx, outbound.cancellation().clone());

    let client_id = state
        .registry
        .register_client(ClientSession::new(principal.name.clone(), outbound.clone()))
        .await;
    tracing::info!(client_id = %client_id, principal = %principal.name, "client connected");

    reply(&outbound, &ClientMessage::welcome());

    let cancel = outbound.cancellation().clone();
    loop {
        let next = tokio::select! {
            () = cancel.cancelled() => break,
            next = stream.next() => next,
        };
        match next {
            Some(Ok(Message::Text(text))) => {
                handle_frame(&state, client_id, &outbound, text.as_str()).await;
            }
            Some(Ok(Message::Close(_))) | None => break,
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                tracing::debug!(client_id = %client_id, error = %e, "client socket error");
                break;
            }
        }
    }

    state.registry.remove_client(client_id).await;
    tracing::info!(client_id = %client_id, "client disconnected");
    finish(&outbound, writer, close_code::NORMAL, "").await;
}

async fn handle_frame(state: &AppState, client_id: ClientId, outbound: &Outbound, text: &str) {
    let frame = match ClientInbound::decode(text) {
        Ok(frame) => frame,
        Err(e) => {
            tracing::warn!(client_id = %client_id, error = %e, "dropping client message");
            return;
        }
    };

    match frame {
        ClientInbound::Subscribe(pairs) => {
            if let Some(all) = state.registry.subscribe(client_id, &pairs).await {
                tracing::info!(client_id = %client_id, added = pairs.len(), total = all.len(), "subscribed");
                reply(
                    outbound,
                    &ClientMessage::subscription_status(all, SubscriptionState::Active),
                );
            }
        }
        ClientInbound::Unsubscribe(pairs) => {
            if let Some(removed) = state.registry.unsubscribe(client_id, &pairs).await {
                tracing::info!(client_id = %client_id, removed = removed.len(), "unsubscribed");
                reply(
                    outbound,
                    &ClientMessage::subscription_status(removed, SubscriptionState::Inactive),
                );
            }
        }
        ClientInbound::Command(request) => {
            let status = issue_command(state, request).await;
            reply(outbound, &status);
        }
        ClientInbound::Unrecognized(kind) => {
            tracing::warn!(client_id = %client_id, kind = %kind, "ignoring unknown client message type");
        }
    }
}

async fn issue_command(state: &AppState, request: ClientCommandRequest) -> ClientMessage {
    let hub_id = request.hub_id;
    let command = match Command::new(
        request.command_type,
        request.port_id,
        request.params,
        request.priority,
    ) {
        Ok(command) => command,
        Err(message) => {
            return ClientMessage::CommandStatus {
                command_id: String::new(),
                hub_id,
                status: CommandOutcome::Failed,
                message,
            };
        }
    };

    let command_id = command.command_id.clone();
    let (status, message) = match state.dispatcher.dispatch(&hub_id, command).await {
        Ok(()) => (CommandOutcome::Sent, "Command sent to hub".to_string()),
        Err(e) => {
            tracing::warn!(hub_id = %hub_id, error = %e, "client command failed");
            (CommandOutcome::Failed, e.to_string())
        }
    };
    ClientMessage::CommandStatus {
        command_id,
        hub_id,
        status,
        message,
    }
}

/// Queues a reply. A client that cannot take its own replies is dropped.
fn reply(outbound: &Outbound, message: &ClientMessage) {
    let text = match message.to_json() {
        Ok(text) => text,
        Err(e) => {
            tracing::error!(error = %e, "failed to serialize client reply");
            return;
        }
    };
    if let Err(e) = outbound.try_send_text(text) {
        tracing::warn!(error = %e, "client reply queue unavailable, closing");
        outbound.abort();
    }
}
