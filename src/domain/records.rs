//! Records held by the [`super::EventStore`].
//!
//! These are owned snapshots: the store hands out clones, never references
//! into its internal maps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::{HubId, PortId};

/// Baud rate assumed when a `connected` device event does not report one.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// One telemetry frame received from a hub.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TelemetryEntry {
    /// Time the relay received the frame.
    pub timestamp: DateTime<Utc>,
    /// Hub that produced the frame.
    pub hub_id: HubId,
    /// Port the bytes were read from.
    pub port_id: PortId,
    /// Hub-side serial session identifier.
    pub session_id: String,
    /// Payload exactly as received (base64 text).
    pub data: String,
    /// Length of the decoded payload in bytes.
    pub data_size_bytes: usize,
}

/// Aggregate over a hub's retained telemetry, read atomically.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TelemetryStats {
    /// Number of retained entries.
    pub count: usize,
    /// Sum of decoded payload sizes of retained entries.
    pub total_bytes: usize,
}

/// Latest health report of a hub. Overwritten on every report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthSnapshot {
    /// Time the relay received the report.
    pub timestamp: DateTime<Utc>,
    /// Hub uptime in seconds.
    pub uptime_seconds: u64,
    /// System metrics section (cpu, memory, disk, ...).
    pub system: serde_json::Value,
    /// Hub service metrics section.
    pub service: serde_json::Value,
    /// Error counters section.
    pub errors: serde_json::Value,
}

impl HealthSnapshot {
    /// Reads `system.<section>.percent` as a float, if present.
    #[must_use]
    pub fn system_percent(&self, section: &str) -> Option<f64> {
        self.system
            .get(section)
            .and_then(|s| s.get("percent"))
            .and_then(serde_json::Value::as_f64)
    }
}

/// Kind of a device event reported by a hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceEventKind {
    /// A serial device was attached or opened.
    Connected,
    /// A serial device was detached or closed.
    Disconnected,
}

impl DeviceEventKind {
    /// Returns the wire name of the event kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
        }
    }
}

/// Device metadata attached to a `connected` event.
///
/// Hubs report whatever their serial library exposes, so every field is
/// read leniently: numbers are accepted where strings are expected (USB
/// ids), numeric strings where numbers are expected (baud rate), and
/// values of any other shape are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceInfo {
    /// OS device path (e.g. `/dev/ttyUSB0`).
    #[serde(deserialize_with = "lenient_string")]
    pub port: Option<String>,
    /// Human-readable description.
    #[serde(deserialize_with = "lenient_string")]
    pub description: Option<String>,
    /// Device manufacturer.
    #[serde(deserialize_with = "lenient_string")]
    pub manufacturer: Option<String>,
    /// Device serial number.
    #[serde(deserialize_with = "lenient_string")]
    pub serial_number: Option<String>,
    /// USB vendor id.
    #[serde(deserialize_with = "lenient_string")]
    pub vendor_id: Option<String>,
    /// USB product id.
    #[serde(deserialize_with = "lenient_string")]
    pub product_id: Option<String>,
    /// Baud rate the hub opened the port with.
    #[serde(deserialize_with = "lenient_u32")]
    pub baud_rate: Option<u32>,
    /// Hub-side serial session identifier.
    #[serde(deserialize_with = "lenient_string")]
    pub session_id: Option<String>,
}

impl DeviceInfo {
    /// Reads device metadata from an arbitrary JSON value. Anything but an
    /// object yields `None`.
    #[must_use]
    pub fn from_value(value: serde_json::Value) -> Option<Self> {
        if value.is_object() {
            serde_json::from_value(value).ok()
        } else {
            None
        }
    }
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

fn lenient_u32<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

/// One device event, kept in a bounded per-hub log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceEventRecord {
    /// Time the relay recorded the event.
    pub timestamp: DateTime<Utc>,
    /// Event kind.
    pub event_type: DeviceEventKind,
    /// Port the event concerns.
    pub port_id: PortId,
    /// Optional device metadata.
    pub device_info: Option<DeviceInfo>,
}

impl DeviceEventRecord {
    /// Creates a record stamped with the current time.
    #[must_use]
    pub fn new(event_type: DeviceEventKind, port_id: PortId, device_info: Option<DeviceInfo>) -> Self {
        Self {
            timestamp: Utc::now(),
            event_type,
            port_id,
            device_info,
        }
    }
}

/// Metadata of a port known to a hub.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortRecord {
    /// Port identifier.
    pub port_id: PortId,
    /// OS device path.
    pub port: String,
    /// Human-readable description.
    pub description: Option<String>,
    /// Device manufacturer.
    pub manufacturer: Option<String>,
    /// Device serial number.
    pub serial_number: Option<String>,
    /// USB vendor id.
    pub vendor_id: Option<String>,
    /// USB product id.
    pub product_id: Option<String>,
}

impl PortRecord {
    /// Builds a port record from a `connected` event's device info.
    #[must_use]
    pub fn from_device_info(port_id: &PortId, info: Option<&DeviceInfo>) -> Self {
        let info = info.cloned().unwrap_or_default();
        Self {
            port_id: port_id.clone(),
            port: info.port.unwrap_or_else(|| port_id.to_string()),
            description: info.description,
            manufacturer: info.manufacturer,
            serial_number: info.serial_number,
            vendor_id: info.vendor_id,
            product_id: info.product_id,
        }
    }
}

/// State of an open serial connection on a hub port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionRecord {
    /// Port identifier.
    pub port_id: PortId,
    /// Connection status (`"connected"`).
    pub status: String,
    /// Baud rate, `0` when unknown.
    pub baud_rate: u32,
    /// Hub-side serial session identifier.
    pub session_id: String,
    /// Cumulative bytes read from the device.
    pub bytes_read: u64,
    /// Cumulative bytes written to the device.
    pub bytes_written: u64,
    /// When the connection was first seen.
    pub connected_at: DateTime<Utc>,
}

impl ConnectionRecord {
    /// Creates a fresh `connected` record with zeroed counters.
    #[must_use]
    pub fn connected(port_id: PortId, baud_rate: u32, session_id: impl Into<String>) -> Self {
        Self {
            port_id,
            status: "connected".to_string(),
            baud_rate,
            session_id: session_id.into(),
            bytes_read: 0,
            bytes_written: 0,
            connected_at: Utc::now(),
        }
    }
}

/// Latest known status of a task running on a hub.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskStatusRecord {
    /// Time the relay received the status.
    pub timestamp: DateTime<Utc>,
    /// Task identifier (usually a command id).
    pub task_id: String,
    /// Status string (`running`, `completed`, `failed`, ...).
    pub status: String,
    /// Progress percentage, if reported.
    pub progress: Option<u32>,
    /// Result payload, if reported.
    pub result: Option<serde_json::Value>,
    /// Error message, if reported.
    pub error: Option<String>,
}
