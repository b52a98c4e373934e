//! Relay error types.
//!
//! - [`RelayError`] is the REST error type; each variant maps to an HTTP
//!   status code and a structured JSON body.
//! - [`SessionError`] classifies failures on a socket and decides whether
//!   the connection is closed (and with which code) or only the offending
//!   message is dropped.
//! - [`DispatchError`] is returned to whoever issued a command.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::HubId;

/// WebSocket close codes used by the relay.
pub mod close_code {
    /// Normal closure.
    pub const NORMAL: u16 = 1000;
    /// Endpoint going away (used for idle hubs).
    pub const GOING_AWAY: u16 = 1001;
    /// Protocol error: malformed or missing handshake.
    pub const PROTOCOL_ERROR: u16 = 1002;
    /// Policy violation: authentication failed.
    pub const POLICY_VIOLATION: u16 = 1008;
    /// Another socket registered the same hub id.
    pub const SESSION_REPLACED: u16 = 4000;
}

/// Structured JSON error response body.
///
/// ```json
/// { "error": { "code": 2001, "message": "hub not found: rpi-bridge-01" } }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// REST error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category        | HTTP Status               |
/// |-----------|-----------------|---------------------------|
/// | 1000–1999 | Validation      | 400 Bad Request           |
/// | 2000–2999 | Not Found       | 404 Not Found             |
/// | 3000–3999 | Server          | 500 Internal Server Error |
/// | 4000–4999 | Authentication  | 401 Unauthorized          |
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// No live session for the hub.
    #[error("hub not found: {0}")]
    HubNotFound(HubId),

    /// The requested record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Missing, malformed, or expired bearer token.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// A command could not be queued for a connected hub.
    #[error("failed to send command to hub: {0}")]
    DispatchFailed(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl RelayError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::HubNotFound(_) => 2001,
            Self::NotFound(_) => 2002,
            Self::Internal(_) => 3000,
            Self::DispatchFailed(_) => 3001,
            Self::Unauthorized(_) => 4001,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::HubNotFound(_) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::DispatchFailed(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

impl From<DispatchError> for RelayError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::HubNotConnected(hub_id) => Self::HubNotFound(hub_id),
            DispatchError::EnqueueFailed { .. } => Self::DispatchFailed(err.to_string()),
            DispatchError::Serialize(_) => Self::Internal(err.to_string()),
        }
    }
}

/// Failure while handling a socket or one of its messages.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Malformed handshake or frame. Closes the connection.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    /// Bad or unknown token, or hub id mismatch. Closes the connection.
    #[error("authentication failed: {0}")]
    AuthFailure(String),

    /// A known message type with malformed fields. Drops the message.
    #[error("invalid {kind} message: {reason}")]
    ValidationFailure {
        /// Message type discriminator.
        kind: String,
        /// What was wrong with it.
        reason: String,
    },

    /// A message type the relay does not understand. Drops the message.
    #[error("unknown message type: {0}")]
    UnknownMessageType(String),
}

impl SessionError {
    /// Returns the close code if this error terminates the connection.
    #[must_use]
    pub const fn close_code(&self) -> Option<u16> {
        match self {
            Self::ProtocolViolation(_) => Some(close_code::PROTOCOL_ERROR),
            Self::AuthFailure(_) => Some(close_code::POLICY_VIOLATION),
            Self::ValidationFailure { .. } | Self::UnknownMessageType(_) => None,
        }
    }

    /// Returns `true` if the connection must be closed.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        self.close_code().is_some()
    }
}

/// Failure to hand a command to a hub.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The hub has no live session.
    #[error("hub not connected: {0}")]
    HubNotConnected(HubId),

    /// The hub's outbound queue refused the command.
    #[error("could not queue command for hub {hub_id}: {reason}")]
    EnqueueFailed {
        /// Target hub.
        hub_id: HubId,
        /// Queue failure.
        reason: crate::domain::SendFailure,
    },

    /// The command envelope could not be serialized.
    #[error("could not serialize command: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::SendFailure;

    #[test]
    fn status_codes_follow_ranges() {
        assert_eq!(
            RelayError::HubNotFound(HubId::new("H1")).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            RelayError::Unauthorized("no token".to_string()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            RelayError::InvalidRequest("bad".to_string()).error_code(),
            1001
        );
    }

    #[test]
    fn dispatch_errors_map_to_http() {
        let not_connected: RelayError = DispatchError::HubNotConnected(HubId::new("H1")).into();
        assert_eq!(not_connected.status_code(), StatusCode::NOT_FOUND);

        let enqueue: RelayError = DispatchError::EnqueueFailed {
            hub_id: HubId::new("H1"),
            reason: SendFailure::Closed,
        }
        .into();
        assert_eq!(enqueue.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(enqueue.error_code(), 3001);

        let Err(json_err) = serde_json::from_str::<serde_json::Value>("{") else {
            panic!("truncated JSON must fail");
        };
        let serialize: RelayError = DispatchError::Serialize(json_err).into();
        assert!(matches!(serialize, RelayError::Internal(_)));
        assert_eq!(serialize.error_code(), 3000);
    }

    #[test]
    fn only_protocol_and_auth_failures_are_fatal() {
        assert_eq!(
            SessionError::ProtocolViolation("x".to_string()).close_code(),
            Some(close_code::PROTOCOL_ERROR)
        );
        assert_eq!(
            SessionError::AuthFailure("x".to_string()).close_code(),
            Some(close_code::POLICY_VIOLATION)
        );
        assert!(!SessionError::UnknownMessageType("x".to_string()).is_fatal());
        assert!(
            !SessionError::ValidationFailure {
                kind: "telemetry".to_string(),
                reason: "x".to_string()
            }
            .is_fatal()
        );
    }
}
