//! WebSocket message types for both sockets.
//!
//! Every frame is a JSON object with a `type` discriminator. Inbound frames
//! are decoded in two steps: the discriminator is read first, then the
//! payload is decoded into the variant's struct. This keeps "unknown type"
//! and "known type with bad fields" apart, so the session handlers can log
//! them differently and drop only the offending message.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::domain::records::{DeviceEventKind, DeviceInfo};
use crate::domain::{HubId, PortId, Subscription};
use crate::error::SessionError;

/// Discriminator of the hub handshake frame.
pub const HUB_CONNECT: &str = "hub_connect";

/// Lowest accepted command priority.
pub const MIN_PRIORITY: u8 = 1;
/// Highest accepted command priority.
pub const MAX_PRIORITY: u8 = 10;

fn default_version() -> String {
    "1.0.0".to_string()
}

/// Splits a text frame into its `type` discriminator and full JSON value.
///
/// Text that is not JSON at all is a protocol violation; JSON without a
/// string `type` is only a validation failure.
fn split_type(text: &str) -> Result<(String, Value), SessionError> {
    let value: Value = serde_json::from_str(text)
        .map_err(|e| SessionError::ProtocolViolation(format!("frame is not JSON: {e}")))?;
    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| SessionError::ValidationFailure {
            kind: "message".to_string(),
            reason: "missing string field `type`".to_string(),
        })?
        .to_string();
    Ok((kind, value))
}

fn decode_variant<T: DeserializeOwned>(kind: &str, value: Value) -> Result<T, SessionError> {
    serde_json::from_value(value).map_err(|e| SessionError::ValidationFailure {
        kind: kind.to_string(),
        reason: e.to_string(),
    })
}

// ── Hub → relay ────────────────────────────────────────────────────────

/// The first frame a hub must send.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HubHandshake {
    /// Hub id the device claims to be.
    pub hub_id: HubId,
    /// Device token bound to a hub id.
    pub device_token: String,
    /// Hub protocol version.
    #[serde(default = "default_version")]
    pub version: String,
    /// Hub-side timestamp.
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl HubHandshake {
    /// Parses a handshake frame.
    ///
    /// # Errors
    ///
    /// Any malformed payload or a `type` other than `hub_connect` is a
    /// [`SessionError::ProtocolViolation`].
    pub fn parse(text: &str) -> Result<Self, SessionError> {
        let (kind, value) = split_type(text).map_err(|e| match e {
            SessionError::ProtocolViolation(_) => e,
            other => SessionError::ProtocolViolation(other.to_string()),
        })?;
        if kind != HUB_CONNECT {
            return Err(SessionError::ProtocolViolation(format!(
                "expected {HUB_CONNECT}, got {kind}"
            )));
        }
        serde_json::from_value(value)
            .map_err(|e| SessionError::ProtocolViolation(format!("invalid handshake: {e}")))
    }
}

/// A chunk of serial bytes read by the hub.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryMessage {
    /// Hub id the frame claims to come from.
    #[serde(default)]
    pub hub_id: Option<HubId>,
    /// Hub-side timestamp.
    pub timestamp: String,
    /// Source port.
    pub port_id: PortId,
    /// Hub-side serial session id.
    pub session_id: String,
    /// Base64-encoded payload.
    pub data: String,
}

/// Periodic hub health report.
#[derive(Debug, Clone, Deserialize)]
pub struct HealthMessage {
    /// Hub id the frame claims to come from.
    #[serde(default, rename = "hubId")]
    pub hub_id: Option<HubId>,
    /// Hub-side timestamp.
    pub timestamp: String,
    /// Hub uptime in seconds.
    pub uptime_seconds: u64,
    /// System metrics.
    #[serde(default)]
    pub system: Value,
    /// Service metrics.
    #[serde(default)]
    pub service: Value,
    /// Error counters.
    #[serde(default)]
    pub errors: Value,
}

/// A serial device was attached or detached.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceEventMessage {
    /// Hub id the frame claims to come from.
    #[serde(default)]
    pub hub_id: Option<HubId>,
    /// Hub-side timestamp.
    pub timestamp: String,
    /// Event kind.
    pub event_type: DeviceEventKind,
    /// Affected port.
    pub port_id: PortId,
    /// Device metadata. Malformed metadata is dropped, not the event.
    #[serde(default, deserialize_with = "lenient_device_info")]
    pub device_info: Option<DeviceInfo>,
}

fn lenient_device_info<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<DeviceInfo>, D::Error> {
    Value::deserialize(deserializer).map(DeviceInfo::from_value)
}

/// Progress of a task running on the hub.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatusMessage {
    /// Hub id the frame claims to come from.
    #[serde(default)]
    pub hub_id: Option<HubId>,
    /// Hub-side timestamp.
    pub timestamp: String,
    /// Task id.
    pub task_id: String,
    /// Task status.
    pub status: String,
    /// Progress percentage.
    #[serde(default)]
    pub progress: Option<u32>,
    /// Result payload.
    #[serde(default)]
    pub result: Option<Value>,
    /// Error message.
    #[serde(default)]
    pub error: Option<String>,
}

/// A decoded hub frame after the handshake.
#[derive(Debug, Clone)]
pub enum HubInbound {
    /// `telemetry`
    Telemetry(TelemetryMessage),
    /// `health`
    Health(HealthMessage),
    /// `device_event`
    DeviceEvent(DeviceEventMessage),
    /// `task_status`, kept alongside the raw text for passthrough.
    TaskStatus {
        /// Decoded fields.
        message: TaskStatusMessage,
        /// The frame exactly as received.
        raw: String,
    },
    /// Any other `type`.
    Unrecognized(String),
}

impl HubInbound {
    /// Decodes a hub frame.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::ProtocolViolation`] for text that is not
    /// JSON, and [`SessionError::ValidationFailure`] for a missing
    /// discriminator or a known type with invalid fields.
    pub fn decode(text: &str) -> Result<Self, SessionError> {
        let (kind, value) = split_type(text)?;
        match kind.as_str() {
            "telemetry" => decode_variant(&kind, value).map(Self::Telemetry),
            "health" => decode_variant(&kind, value).map(Self::Health),
            "device_event" => decode_variant(&kind, value).map(Self::DeviceEvent),
            "task_status" => decode_variant(&kind, value).map(|message| Self::TaskStatus {
                message,
                raw: text.to_string(),
            }),
            _ => Ok(Self::Unrecognized(kind)),
        }
    }

    /// Returns the message type name, for logging.
    #[must_use]
    pub fn kind(&self) -> &str {
        match self {
            Self::Telemetry(_) => "telemetry",
            Self::Health(_) => "health",
            Self::DeviceEvent(_) => "device_event",
            Self::TaskStatus { .. } => "task_status",
            Self::Unrecognized(kind) => kind,
        }
    }

    fn claimed_hub(&self) -> Option<&HubId> {
        match self {
            Self::Telemetry(m) => m.hub_id.as_ref(),
            Self::Health(m) => m.hub_id.as_ref(),
            Self::DeviceEvent(m) => m.hub_id.as_ref(),
            Self::TaskStatus { message, .. } => message.hub_id.as_ref(),
            Self::Unrecognized(_) => None,
        }
    }

    /// Checks that a `hubId` carried by the frame, if any, matches the
    /// authenticated hub.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::ValidationFailure`] on mismatch.
    pub fn check_origin(&self, authenticated: &HubId) -> Result<(), SessionError> {
        match self.claimed_hub() {
            Some(claimed) if claimed != authenticated => Err(SessionError::ValidationFailure {
                kind: self.kind().to_string(),
                reason: format!("hubId {claimed} does not match session hub {authenticated}"),
            }),
            _ => Ok(()),
        }
    }
}

// ── Relay → hub ────────────────────────────────────────────────────────

/// Command kinds a hub understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandType {
    /// Write bytes to a serial port.
    SerialWrite,
    /// Flash firmware onto a device.
    Flash,
    /// Restart a device.
    Restart,
    /// Close a serial connection.
    CloseConnection,
}

impl CommandType {
    /// Priority used when the caller does not give one.
    #[must_use]
    pub const fn default_priority(self) -> u8 {
        match self {
            Self::SerialWrite => 5,
            Self::Flash => 3,
            Self::Restart => 2,
            Self::CloseConnection => 1,
        }
    }

    /// Returns the wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SerialWrite => "serial_write",
            Self::Flash => "flash",
            Self::Restart => "restart",
            Self::CloseConnection => "close_connection",
        }
    }
}

/// A command addressed to one port of a hub.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Command {
    /// Unique command id; the hub reports progress under it as a task id.
    pub command_id: String,
    /// Command kind.
    pub command_type: CommandType,
    /// Target port.
    pub port_id: PortId,
    /// Kind-specific parameters.
    pub params: Value,
    /// Priority, 1 (lowest) to 10.
    pub priority: u8,
}

impl Command {
    /// Builds a command with a fresh id.
    ///
    /// `params` of `null` becomes an empty object; `priority` defaults per
    /// command type.
    ///
    /// # Errors
    ///
    /// Returns a description of the problem when `priority` is outside
    /// `1..=10`.
    pub fn new(
        command_type: CommandType,
        port_id: PortId,
        params: Value,
        priority: Option<u8>,
    ) -> Result<Self, String> {
        let priority = priority.unwrap_or_else(|| command_type.default_priority());
        if !(MIN_PRIORITY..=MAX_PRIORITY).contains(&priority) {
            return Err(format!(
                "priority must be between {MIN_PRIORITY} and {MAX_PRIORITY}, got {priority}"
            ));
        }
        let params = if params.is_null() {
            Value::Object(serde_json::Map::new())
        } else {
            params
        };
        Ok(Self {
            command_id: format!("cmd-{}", uuid::Uuid::new_v4()),
            command_type,
            port_id,
            params,
            priority,
        })
    }
}

/// Frames the relay sends to a hub.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HubOutbound {
    /// Handshake acknowledgement.
    HubConnected {
        /// Authenticated hub id.
        #[serde(rename = "hubId")]
        hub_id: HubId,
        /// Relay time.
        timestamp: DateTime<Utc>,
    },
    /// A command envelope.
    Command {
        /// The command.
        command: Command,
    },
}

impl HubOutbound {
    /// Serializes the frame to JSON text.
    ///
    /// # Errors
    ///
    /// Propagates serialization failures.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

// ── Client → relay ─────────────────────────────────────────────────────

/// One entry of a subscribe/unsubscribe request. Incomplete entries are
/// skipped.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionRequest {
    /// Hub id.
    #[serde(default)]
    pub hub_id: Option<String>,
    /// Port id.
    #[serde(default)]
    pub port_id: Option<String>,
}

impl SubscriptionRequest {
    /// Returns the pair if both ids are present and non-empty.
    #[must_use]
    pub fn pair(&self) -> Option<Subscription> {
        match (self.hub_id.as_deref(), self.port_id.as_deref()) {
            (Some(hub), Some(port)) if !hub.is_empty() && !port.is_empty() => {
                Some(Subscription::new(hub, port))
            }
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SubscriptionList {
    #[serde(default)]
    subscriptions: Vec<SubscriptionRequest>,
}

/// A command issued by a browser client.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientCommandRequest {
    /// Target hub.
    pub hub_id: HubId,
    /// Command kind.
    pub command_type: CommandType,
    /// Target port.
    pub port_id: PortId,
    /// Kind-specific parameters.
    #[serde(default)]
    pub params: Value,
    /// Optional priority override.
    #[serde(default)]
    pub priority: Option<u8>,
}

/// A decoded client frame.
#[derive(Debug, Clone)]
pub enum ClientInbound {
    /// Add subscriptions.
    Subscribe(Vec<Subscription>),
    /// Remove subscriptions.
    Unsubscribe(Vec<Subscription>),
    /// Send a command to a hub.
    Command(ClientCommandRequest),
    /// Any other `type`.
    Unrecognized(String),
}

impl ClientInbound {
    /// Decodes a client frame.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::ProtocolViolation`] for text that is not
    /// JSON and [`SessionError::ValidationFailure`] for malformed frames.
    pub fn decode(text: &str) -> Result<Self, SessionError> {
        let (kind, value) = split_type(text)?;
        match kind.as_str() {
            "subscribe" => decode_variant::<SubscriptionList>(&kind, value)
                .map(|l| Self::Subscribe(complete_pairs(&l.subscriptions))),
            "unsubscribe" => decode_variant::<SubscriptionList>(&kind, value)
                .map(|l| Self::Unsubscribe(complete_pairs(&l.subscriptions))),
            "command" => decode_variant(&kind, value).map(Self::Command),
            _ => Ok(Self::Unrecognized(kind)),
        }
    }
}

fn complete_pairs(requests: &[SubscriptionRequest]) -> Vec<Subscription> {
    requests.iter().filter_map(SubscriptionRequest::pair).collect()
}

// ── Relay → client ─────────────────────────────────────────────────────

/// Whether a listed subscription is now active or was just removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionState {
    /// Currently subscribed.
    Active,
    /// Just unsubscribed.
    Inactive,
}

/// One entry of a `subscription_status` reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionStatusEntry {
    /// Hub id.
    pub hub_id: HubId,
    /// Port id.
    pub port_id: PortId,
    /// State.
    pub status: SubscriptionState,
}

impl SubscriptionStatusEntry {
    /// Lists pairs with the same state.
    #[must_use]
    pub fn list(pairs: Vec<Subscription>, status: SubscriptionState) -> Vec<Self> {
        pairs
            .into_iter()
            .map(|s| Self {
                hub_id: s.hub_id,
                port_id: s.port_id,
                status,
            })
            .collect()
    }
}

/// Outcome of a client-issued command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandOutcome {
    /// Queued for the hub.
    Sent,
    /// Could not be delivered.
    Failed,
}

/// Frames the relay sends to a browser client.
///
/// `task_status` frames are forwarded verbatim and never pass through
/// this type.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Welcome message after authentication.
    Connected {
        /// Greeting.
        message: String,
        /// Relay time.
        timestamp: DateTime<Utc>,
    },
    /// Telemetry from a subscribed port.
    #[serde(rename_all = "camelCase")]
    TelemetryStream {
        /// Source hub.
        hub_id: HubId,
        /// Source port.
        port_id: PortId,
        /// Hub-side serial session id.
        session_id: String,
        /// Hub-side timestamp.
        timestamp: String,
        /// Base64 payload as received.
        data: String,
        /// Decoded payload length.
        data_size_bytes: usize,
    },
    /// Hub health summary.
    Health {
        /// Source hub.
        #[serde(rename = "hubId")]
        hub_id: HubId,
        /// Hub-side timestamp.
        timestamp: String,
        /// CPU usage.
        cpu_percent: Option<f64>,
        /// Memory usage.
        memory_percent: Option<f64>,
        /// Disk usage.
        disk_percent: Option<f64>,
    },
    /// Device attached or detached on a subscribed port.
    #[serde(rename_all = "camelCase")]
    DeviceEvent {
        /// Source hub.
        hub_id: HubId,
        /// Affected port.
        port_id: PortId,
        /// Hub-side timestamp.
        timestamp: String,
        /// Event kind.
        event: DeviceEventKind,
    },
    /// Reply to subscribe/unsubscribe.
    SubscriptionStatus {
        /// Listed pairs.
        subscriptions: Vec<SubscriptionStatusEntry>,
        /// Relay time.
        timestamp: DateTime<Utc>,
    },
    /// Reply to a client-issued command.
    #[serde(rename_all = "camelCase")]
    CommandStatus {
        /// Command id, empty if the command was never built.
        command_id: String,
        /// Target hub.
        hub_id: HubId,
        /// Outcome.
        status: CommandOutcome,
        /// Human-readable detail.
        message: String,
    },
}

impl ClientMessage {
    /// Builds the welcome message.
    #[must_use]
    pub fn welcome() -> Self {
        Self::Connected {
            message: "Connected to telemetry stream".to_string(),
            timestamp: Utc::now(),
        }
    }

    /// Builds a `subscription_status` reply.
    #[must_use]
    pub fn subscription_status(pairs: Vec<Subscription>, status: SubscriptionState) -> Self {
        Self::SubscriptionStatus {
            subscriptions: SubscriptionStatusEntry::list(pairs, status),
            timestamp: Utc::now(),
        }
    }

    /// Serializes the frame to JSON text.
    ///
    /// # Errors
    ///
    /// Propagates serialization failures.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn handshake_parses_with_default_version() {
        let Ok(hs) = HubHandshake::parse(
            r#"{"type":"hub_connect","hubId":"H1","deviceToken":"t","timestamp":"x"}"#,
        ) else {
            panic!("valid handshake");
        };
        assert_eq!(hs.hub_id, HubId::new("H1"));
        assert_eq!(hs.version, "1.0.0");
    }

    #[test]
    fn handshake_rejects_wrong_type_and_garbage() {
        let wrong = HubHandshake::parse(r#"{"type":"telemetry","hubId":"H1","deviceToken":"t"}"#);
        assert!(matches!(wrong, Err(SessionError::ProtocolViolation(_))));
        let garbage = HubHandshake::parse("not json");
        assert!(matches!(garbage, Err(SessionError::ProtocolViolation(_))));
        let missing = HubHandshake::parse(r#"{"type":"hub_connect","hubId":"H1"}"#);
        assert!(matches!(missing, Err(SessionError::ProtocolViolation(_))));
    }

    #[test]
    fn hub_frames_decode_by_type() {
        let Ok(HubInbound::Telemetry(t)) = HubInbound::decode(
            r#"{"type":"telemetry","hubId":"H1","timestamp":"t","portId":"P1","sessionId":"s","data":"aGk="}"#,
        ) else {
            panic!("telemetry frame");
        };
        assert_eq!(t.port_id, PortId::new("P1"));

        let Ok(HubInbound::Health(h)) = HubInbound::decode(
            r#"{"type":"health","timestamp":"t","uptime_seconds":5,"system":{"cpu":{"percent":3.5}},"service":{},"errors":{}}"#,
        ) else {
            panic!("health frame");
        };
        assert_eq!(h.uptime_seconds, 5);
        assert!(h.system.get("cpu").is_some());

        let raw = r#"{"type":"task_status","timestamp":"t","taskId":"c1","status":"running","progress":40}"#;
        let Ok(HubInbound::TaskStatus { message, raw: kept }) = HubInbound::decode(raw) else {
            panic!("task status frame");
        };
        assert_eq!(message.progress, Some(40));
        assert_eq!(kept, raw);
    }

    #[test]
    fn unknown_type_is_not_an_error() {
        let Ok(HubInbound::Unrecognized(kind)) = HubInbound::decode(r#"{"type":"reboot"}"#) else {
            panic!("unrecognized frame");
        };
        assert_eq!(kind, "reboot");
    }

    #[test]
    fn known_type_with_bad_fields_is_validation_failure() {
        let result = HubInbound::decode(r#"{"type":"telemetry","portId":"P1"}"#);
        assert!(matches!(
            result,
            Err(SessionError::ValidationFailure { ref kind, .. }) if kind == "telemetry"
        ));
        let bad_event = HubInbound::decode(
            r#"{"type":"device_event","timestamp":"t","eventType":"exploded","portId":"P1"}"#,
        );
        assert!(bad_event.is_err());
    }

    #[test]
    fn device_event_tolerates_loose_device_info() {
        let Ok(HubInbound::DeviceEvent(event)) = HubInbound::decode(
            r#"{"type":"device_event","timestamp":"t","eventType":"connected","portId":"P1",
                "deviceInfo":{"vendor_id":1027,"product_id":24577,"baud_rate":9600}}"#,
        ) else {
            panic!("device event should decode");
        };
        let Some(info) = event.device_info else {
            panic!("device info kept");
        };
        assert_eq!(info.vendor_id.as_deref(), Some("1027"));
        assert_eq!(info.baud_rate, Some(9600));

        let Ok(HubInbound::DeviceEvent(event)) = HubInbound::decode(
            r#"{"type":"device_event","timestamp":"t","eventType":"connected","portId":"P1","deviceInfo":"usb"}"#,
        ) else {
            panic!("device event should decode");
        };
        assert!(event.device_info.is_none());
    }

    #[test]
    fn non_json_hub_frame_is_fatal() {
        let Err(err) = HubInbound::decode("this is not json") else {
            panic!("non-JSON text must not decode");
        };
        assert!(matches!(err, SessionError::ProtocolViolation(_)));
        assert!(err.is_fatal());

        let Err(err) = HubInbound::decode(r#"{"portId":"P1"}"#) else {
            panic!("missing discriminator must not decode");
        };
        assert!(!err.is_fatal());
    }

    #[test]
    fn origin_mismatch_is_rejected() {
        let Ok(frame) = HubInbound::decode(
            r#"{"type":"telemetry","hubId":"H2","timestamp":"t","portId":"P1","sessionId":"s","data":""}"#,
        ) else {
            panic!("telemetry frame");
        };
        assert!(frame.check_origin(&HubId::new("H1")).is_err());
        assert!(frame.check_origin(&HubId::new("H2")).is_ok());
    }

    #[test]
    fn command_envelope_shape() {
        let Ok(command) = Command::new(
            CommandType::SerialWrite,
            PortId::new("P1"),
            serde_json::json!({"data": "AT\r\n"}),
            None,
        ) else {
            panic!("valid command");
        };
        assert_eq!(command.priority, 5);
        let Ok(json) = HubOutbound::Command { command }.to_json() else {
            panic!("serializable");
        };
        let value: Value = serde_json::from_str(&json).unwrap_or_default();
        assert_eq!(value["type"], "command");
        assert_eq!(value["command"]["commandType"], "serial_write");
        assert_eq!(value["command"]["portId"], "P1");
    }

    #[test]
    fn command_priority_bounds() {
        assert!(Command::new(CommandType::Flash, PortId::new("P"), Value::Null, Some(0)).is_err());
        assert!(Command::new(CommandType::Flash, PortId::new("P"), Value::Null, Some(11)).is_err());
        let Ok(cmd) = Command::new(CommandType::Restart, PortId::new("P"), Value::Null, None) else {
            panic!("valid command");
        };
        assert_eq!(cmd.priority, 2);
        assert!(cmd.params.is_object());
    }

    #[test]
    fn subscribe_skips_incomplete_pairs() {
        let Ok(ClientInbound::Subscribe(pairs)) = ClientInbound::decode(
            r#"{"type":"subscribe","subscriptions":[{"hubId":"H1","portId":"P1"},{"hubId":"H1"},{"portId":""}]}"#,
        ) else {
            panic!("subscribe frame");
        };
        assert_eq!(pairs, vec![Subscription::new("H1", "P1")]);
    }

    #[test]
    fn client_command_decodes() {
        let Ok(ClientInbound::Command(req)) = ClientInbound::decode(
            r#"{"type":"command","hubId":"H1","commandType":"restart","portId":"P1"}"#,
        ) else {
            panic!("command frame");
        };
        assert_eq!(req.command_type, CommandType::Restart);
        assert!(req.priority.is_none());
    }

    #[test]
    fn telemetry_stream_uses_camel_case() {
        let msg = ClientMessage::TelemetryStream {
            hub_id: HubId::new("H1"),
            port_id: PortId::new("P1"),
            session_id: "s".to_string(),
            timestamp: "t".to_string(),
            data: "aGk=".to_string(),
            data_size_bytes: 2,
        };
        let value: Value = serde_json::from_str(&msg.to_json().unwrap_or_default()).unwrap_or_default();
        assert_eq!(value["type"], "telemetry_stream");
        assert_eq!(value["hubId"], "H1");
        assert_eq!(value["dataSizeBytes"], 2);
    }

    #[test]
    fn health_keeps_snake_case_percentages() {
        let msg = ClientMessage::Health {
            hub_id: HubId::new("H1"),
            timestamp: "t".to_string(),
            cpu_percent: Some(1.0),
            memory_percent: None,
            disk_percent: None,
        };
        let value: Value = serde_json::from_str(&msg.to_json().unwrap_or_default()).unwrap_or_default();
        assert_eq!(value["hubId"], "H1");
        assert_eq!(value["cpu_percent"], 1.0);
        assert!(value["memory_percent"].is_null());
    }

    #[test]
    fn subscription_status_lists_state() {
        let msg = ClientMessage::subscription_status(
            vec![Subscription::new("H1", "P1")],
            SubscriptionState::Inactive,
        );
        let value: Value = serde_json::from_str(&msg.to_json().unwrap_or_default()).unwrap_or_default();
        assert_eq!(value["subscriptions"][0]["status"], "inactive");
        assert_eq!(value["subscriptions"][0]["portId"], "P1");
    }
}
