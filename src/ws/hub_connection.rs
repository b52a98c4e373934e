//! Hub socket lifecycle.
//!
//! ```text
//! CONNECTING → AWAITING_HANDSHAKE → AUTHENTICATED → ACTIVE → CLOSED
//! ```
//!
//! The first frame must be a `hub_connect` handshake carrying a device
//! token bound to the claimed hub id. After that every frame refreshes the
//! hub's last-seen time and is routed through the [`RelayService`].
//! Text that is not JSON and binary frames close the socket with 1002; a
//! JSON frame with bad fields or an unknown type is dropped.
//!
//! [`RelayService`]: crate::service::RelayService

use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use chrono::Utc;
use futures_util::StreamExt;
use futures_util::stream::SplitStream;

use super::messages::{HubHandshake, HubInbound, HubOutbound};
use super::outbound::{finish, spawn_writer};
use crate::app_state::AppState;
use crate::domain::{HubId, HubSession, Outbound};
use crate::error::{SessionError, close_code};

/// Runs one hub socket from upgrade to close.
pub async fn run_hub_connection(socket: WebSocket, state: AppState) {
    let (sink, mut stream) = socket.split();
    let (outbound, rx) = Outbound::channel(state.limits.outbound_queue_capacity);
    let writer = spawn_writer(sink, rx, outbound.cancellation().clone());

    let handshake = match await_handshake(&mut stream, &state).await {
        Ok(handshake) => handshake,
        Err(err) => {
            tracing::warn!(error = %err, "hub handshake rejected");
            let code = err.close_code().unwrap_or(close_code::PROTOCOL_ERROR);
            finish(&outbound, writer, code, &err.to_string()).await;
            return;
        }
    };

    let hub_id = handshake.hub_id.clone();
    let session = HubSession::new(hub_id.clone(), handshake.version.clone(), outbound.clone());
    let connection_id = session.connection_id;

    if let Some(evicted) = state.registry.register_hub(session).await {
        tracing::warn!(
            hub_id = %hub_id,
            evicted = %evicted.connection_id,
            "hub reconnected, replacing previous session"
        );
        evicted
            .outbound
            .close(close_code::SESSION_REPLACED, "session replaced");
    }

    tracing::info!(
        hub_id = %hub_id,
        connection_id = %connection_id,
        version = %handshake.version,
        "hub connected"
    );

    let ack = HubOutbound::HubConnected {
        hub_id: hub_id.clone(),
        timestamp: Utc::now(),
    };
    match ack.to_json() {
        Ok(text) => {
            if let Err(e) = outbound.try_send_text(text) {
                tracing::warn!(hub_id = %hub_id, error = %e, "could not queue handshake ack");
            }
        }
        Err(e) => tracing::error!(error = %e, "failed to serialize handshake ack"),
    }

    let (code, reason) = receive_loop(&mut stream, &state, &hub_id, &outbound).await;

    if state.registry.remove_hub(&hub_id, connection_id).await {
        tracing::info!(hub_id = %hub_id, connection_id = %connection_id, "hub disconnected");
    } else {
        tracing::debug!(hub_id = %hub_id, connection_id = %connection_id, "replaced hub session closed");
    }
    finish(&outbound, writer, code, reason).await;
}

/// Waits for and verifies the handshake frame.
async fn await_handshake(
    stream: &mut SplitStream<WebSocket>,
    state: &AppState,
) -> Result<HubHandshake, SessionError> {
    let text = recv_first_text(stream, state.limits.handshake_timeout).await?;
    let handshake = HubHandshake::parse(&text)?;

    let bound = state
        .device_credentials
        .verify_device_token(&handshake.device_token)
        .ok_or_else(|| SessionError::AuthFailure("unknown device token".to_string()))?;
    if bound != handshake.hub_id {
        return Err(SessionError::AuthFailure(format!(
            "device token is not valid for hub {}",
            handshake.hub_id
        )));
    }
    Ok(handshake)
}

/// Reads the first data frame, skipping pings and pongs.
async fn recv_first_text(
    stream: &mut SplitStream<WebSocket>,
    timeout: Duration,
) -> Result<String, SessionError> {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let next = tokio::time::timeout_at(deadline, stream.next())
            .await
            .map_err(|_| SessionError::ProtocolViolation("handshake timeout".to_string()))?;
        match next {
            Some(Ok(Message::Text(text))) => return Ok(text.as_str().to_owned()),
            Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
            Some(Ok(Message::Binary(_))) => {
                return Err(SessionError::ProtocolViolation(
                    "handshake must be a text frame".to_string(),
                ));
            }
            Some(Ok(Message::Close(_))) | None => {
                return Err(SessionError::ProtocolViolation(
                    "connection closed before handshake".to_string(),
                ));
            }
            Some(Err(e)) => {
                return Err(SessionError::ProtocolViolation(format!(
                    "socket error before handshake: {e}"
                )));
            }
        }
    }
}

/// Processes frames until the socket closes, the hub goes idle, or the
/// session is cancelled. Returns the close code and reason to send.
async fn receive_loop(
    stream: &mut SplitStream<WebSocket>,
    state: &AppState,
    hub_id: &HubId,
    outbound: &Outbound,
) -> (u16, &'static str) {
    let cancel = outbound.cancellation().clone();
    loop {
        let next = tokio::select! {
            () = cancel.cancelled() => return (close_code::NORMAL, ""),
            next = tokio::time::timeout(state.limits.hub_idle_timeout, stream.next()) => next,
        };

        match next {
            Err(_) => {
                tracing::warn!(hub_id = %hub_id, "hub idle timeout");
                return (close_code::GOING_AWAY, "idle timeout");
            }
            Ok(Some(Ok(Message::Text(text)))) => {
                state.registry.touch_hub(hub_id).await;
                if let Err(err) = handle_frame(state, hub_id, text.as_str()).await {
                    tracing::warn!(hub_id = %hub_id, error = %err, "closing hub on bad frame");
                    return (
                        err.close_code().unwrap_or(close_code::PROTOCOL_ERROR),
                        "protocol violation",
                    );
                }
            }
            Ok(Some(Ok(Message::Binary(_)))) => {
                tracing::warn!(hub_id = %hub_id, "closing hub on binary frame");
                return (close_code::PROTOCOL_ERROR, "binary frames are not supported");
            }
            Ok(Some(Ok(Message::Close(_))) | None) => return (close_code::NORMAL, ""),
            Ok(Some(Ok(Message::Ping(_) | Message::Pong(_)))) => {
                state.registry.touch_hub(hub_id).await;
            }
            Ok(Some(Err(e))) => {
                tracing::debug!(hub_id = %hub_id, error = %e, "hub socket error");
                return (close_code::NORMAL, "");
            }
        }
    }
}

/// Decodes and applies one text frame. Only fatal errors are returned;
/// everything else drops the frame.
async fn handle_frame(state: &AppState, hub_id: &HubId, text: &str) -> Result<(), SessionError> {
    let result = match HubInbound::decode(text) {
        Ok(frame) => state.relay.handle(hub_id, frame).await,
        Err(e) => Err(e),
    };
    match result {
        Ok(()) => Ok(()),
        Err(err) if err.is_fatal() => Err(err),
        Err(SessionError::UnknownMessageType(kind)) => {
            tracing::warn!(hub_id = %hub_id, kind = %kind, "ignoring unknown hub message type");
            Ok(())
        }
        Err(e) => {
            tracing::warn!(hub_id = %hub_id, error = %e, "dropping hub message");
            Ok(())
        }
    }
}
