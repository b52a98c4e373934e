//! Live session types and their outbound handle.
//!
//! Every socket, hub or client, owns exactly one writer task fed by a
//! bounded queue. [`Outbound`] is the only way to reach that writer, so the
//! receive loop, the broadcast engine, and the command dispatcher never
//! write to a socket concurrently.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::subscription::SubscriptionSet;
use super::{ClientId, HubId};

/// A frame queued for a session's writer task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundFrame {
    /// A JSON text message.
    Text(String),
    /// A close frame; the writer stops after sending it.
    Close {
        /// WebSocket close code.
        code: u16,
        /// Human-readable reason.
        reason: String,
    },
}

/// Why a frame could not be queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SendFailure {
    /// The receiver is not draining its queue fast enough.
    #[error("outbound queue full")]
    Full,
    /// The writer task is gone or the session was cancelled.
    #[error("outbound queue closed")]
    Closed,
}

/// Cloneable handle to a session's writer queue and cancellation token.
#[derive(Debug, Clone)]
pub struct Outbound {
    tx: mpsc::Sender<OutboundFrame>,
    cancel: CancellationToken,
}

impl Outbound {
    /// Creates a handle together with the receiver its writer task drains.
    #[must_use]
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<OutboundFrame>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            Self {
                tx,
                cancel: CancellationToken::new(),
            },
            rx,
        )
    }

    /// Queues a text frame without waiting.
    ///
    /// # Errors
    ///
    /// Returns [`SendFailure::Full`] when the queue is at capacity and
    /// [`SendFailure::Closed`] when the session is gone.
    pub fn try_send_text(&self, text: String) -> Result<(), SendFailure> {
        if self.cancel.is_cancelled() {
            return Err(SendFailure::Closed);
        }
        self.tx
            .try_send(OutboundFrame::Text(text))
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => SendFailure::Full,
                mpsc::error::TrySendError::Closed(_) => SendFailure::Closed,
            })
    }

    /// Asks the writer to send a close frame and stop.
    ///
    /// If the frame cannot be queued the session is cancelled instead.
    pub fn close(&self, code: u16, reason: impl Into<String>) {
        let frame = OutboundFrame::Close {
            code,
            reason: reason.into(),
        };
        if self.tx.try_send(frame).is_err() {
            self.cancel.cancel();
        }
    }

    /// Cancels the session: both its receive loop and writer stop.
    pub fn abort(&self) {
        self.cancel.cancel();
    }

    /// Returns the session's cancellation token.
    #[must_use]
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }
}

/// A live, authenticated hub connection.
#[derive(Debug, Clone)]
pub struct HubSession {
    /// Authenticated hub identifier.
    pub hub_id: HubId,
    /// Unique id of the physical socket carrying this session.
    pub connection_id: uuid::Uuid,
    /// Protocol version announced in the handshake.
    pub version: String,
    /// When the handshake completed.
    pub connected_at: DateTime<Utc>,
    /// When the last message was received.
    pub last_seen: DateTime<Utc>,
    /// Handle to the hub socket's writer.
    pub outbound: Outbound,
}

impl HubSession {
    /// Creates a session stamped with the current time and a fresh
    /// connection id.
    #[must_use]
    pub fn new(hub_id: HubId, version: impl Into<String>, outbound: Outbound) -> Self {
        let now = Utc::now();
        Self {
            hub_id,
            connection_id: uuid::Uuid::new_v4(),
            version: version.into(),
            connected_at: now,
            last_seen: now,
            outbound,
        }
    }
}

/// Read-only view of a hub session, safe to hand to the REST layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HubSummary {
    /// Hub identifier.
    pub hub_id: HubId,
    /// When the handshake completed.
    pub connected_at: DateTime<Utc>,
    /// When the last message was received.
    pub last_seen: DateTime<Utc>,
    /// Protocol version announced in the handshake.
    pub version: String,
}

impl From<&HubSession> for HubSummary {
    fn from(session: &HubSession) -> Self {
        Self {
            hub_id: session.hub_id.clone(),
            connected_at: session.connected_at,
            last_seen: session.last_seen,
            version: session.version.clone(),
        }
    }
}

/// A live, authenticated browser client connection.
#[derive(Debug, Clone)]
pub struct ClientSession {
    /// Session identifier.
    pub client_id: ClientId,
    /// Authenticated principal name.
    pub principal: String,
    /// Handle to the client socket's writer.
    pub outbound: Outbound,
    /// Current `(hub, port)` subscriptions.
    pub subscriptions: SubscriptionSet,
}

impl ClientSession {
    /// Creates a session with no subscriptions.
    #[must_use]
    pub fn new(principal: impl Into<String>, outbound: Outbound) -> Self {
        Self {
            client_id: ClientId::new(),
            principal: principal.into(),
            outbound,
            subscriptions: SubscriptionSet::new(),
        }
    }
}
