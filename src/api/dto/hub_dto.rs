//! Hub-related DTOs for the read-only REST endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::HubSummary;
use crate::domain::records::{
    ConnectionRecord, DeviceEventRecord, HealthSnapshot, PortRecord, TaskStatusRecord,
    TelemetryEntry,
};

/// Largest accepted `limit` on history endpoints.
pub const MAX_HISTORY_LIMIT: usize = 1000;

/// `?limit=` for history endpoints.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HistoryParams {
    /// Most recent entries to return (1..=1000). All retained if omitted.
    #[serde(default)]
    pub limit: Option<usize>,
}

impl HistoryParams {
    /// Returns the validated limit.
    ///
    /// # Errors
    ///
    /// Returns a description of the problem when `limit` is outside
    /// `1..=1000`.
    pub fn validated(&self) -> Result<Option<usize>, String> {
        match self.limit {
            Some(limit) if !(1..=MAX_HISTORY_LIMIT).contains(&limit) => Err(format!(
                "limit must be between 1 and {MAX_HISTORY_LIMIT}, got {limit}"
            )),
            other => Ok(other),
        }
    }
}

/// One connected hub.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HubInfo {
    /// Hub identifier.
    pub hub_id: String,
    /// Always `true`: only live hubs are listed.
    pub connected: bool,
    /// Handshake time.
    pub connected_at: DateTime<Utc>,
    /// Last frame received.
    pub last_seen: DateTime<Utc>,
    /// Hub protocol version.
    pub version: String,
}

impl From<HubSummary> for HubInfo {
    fn from(summary: HubSummary) -> Self {
        Self {
            hub_id: summary.hub_id.to_string(),
            connected: true,
            connected_at: summary.connected_at,
            last_seen: summary.last_seen,
            version: summary.version,
        }
    }
}

/// Response body for `GET /api/hubs`.
#[derive(Debug, Serialize, ToSchema)]
pub struct HubListResponse {
    /// Connected hubs ordered by id.
    pub hubs: Vec<HubInfo>,
    /// Number of hubs.
    pub count: usize,
}

/// One retained telemetry frame.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryEntryDto {
    /// Relay receive time.
    pub timestamp: DateTime<Utc>,
    /// Source port.
    pub port_id: String,
    /// Hub-side serial session id.
    pub session_id: String,
    /// Base64 payload.
    pub data: String,
    /// Decoded payload length.
    pub data_size_bytes: usize,
}

impl From<TelemetryEntry> for TelemetryEntryDto {
    fn from(entry: TelemetryEntry) -> Self {
        Self {
            timestamp: entry.timestamp,
            port_id: entry.port_id.to_string(),
            session_id: entry.session_id,
            data: entry.data,
            data_size_bytes: entry.data_size_bytes,
        }
    }
}

/// Response body for `GET /api/hubs/{hub_id}/telemetry`.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryListResponse {
    /// Hub identifier.
    pub hub_id: String,
    /// Most recent entries, oldest first.
    pub telemetry: Vec<TelemetryEntryDto>,
    /// Retained entries (independent of `limit`).
    pub count: usize,
    /// Decoded bytes across retained entries.
    pub total_bytes: usize,
}

/// Response body for `GET /api/hubs/{hub_id}/health`.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HubHealthResponse {
    /// Hub identifier.
    pub hub_id: String,
    /// Relay receive time of the report.
    pub timestamp: DateTime<Utc>,
    /// Hub uptime in seconds.
    #[serde(rename = "uptime_seconds")]
    pub uptime_seconds: u64,
    /// System metrics.
    #[schema(value_type = Object)]
    pub system: serde_json::Value,
    /// Service metrics.
    #[schema(value_type = Object)]
    pub service: serde_json::Value,
    /// Error counters.
    #[schema(value_type = Object)]
    pub errors: serde_json::Value,
}

impl HubHealthResponse {
    /// Wraps a stored snapshot.
    #[must_use]
    pub fn new(hub_id: String, snapshot: HealthSnapshot) -> Self {
        Self {
            hub_id,
            timestamp: snapshot.timestamp,
            uptime_seconds: snapshot.uptime_seconds,
            system: snapshot.system,
            service: snapshot.service,
            errors: snapshot.errors,
        }
    }
}

/// Port metadata.
#[derive(Debug, Serialize, ToSchema)]
pub struct PortInfo {
    /// Port identifier.
    pub port_id: String,
    /// OS device path.
    pub port: String,
    /// Description.
    pub description: Option<String>,
    /// Manufacturer.
    pub manufacturer: Option<String>,
    /// Serial number.
    pub serial_number: Option<String>,
    /// USB vendor id.
    pub vendor_id: Option<String>,
    /// USB product id.
    pub product_id: Option<String>,
}

impl From<PortRecord> for PortInfo {
    fn from(record: PortRecord) -> Self {
        Self {
            port_id: record.port_id.to_string(),
            port: record.port,
            description: record.description,
            manufacturer: record.manufacturer,
            serial_number: record.serial_number,
            vendor_id: record.vendor_id,
            product_id: record.product_id,
        }
    }
}

/// Response body for `GET /api/hubs/{hub_id}/ports`.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PortListResponse {
    /// Hub identifier.
    pub hub_id: String,
    /// Known ports.
    pub ports: Vec<PortInfo>,
    /// Number of ports.
    pub count: usize,
}

/// Serial connection state.
#[derive(Debug, Serialize, ToSchema)]
pub struct ConnectionInfo {
    /// Port identifier.
    pub port_id: String,
    /// Connection status.
    pub status: String,
    /// Baud rate, `0` when unknown.
    pub baud_rate: u32,
    /// Hub-side serial session id.
    pub session_id: String,
    /// Bytes read from the device.
    pub bytes_read: u64,
    /// Bytes written to the device.
    pub bytes_written: u64,
    /// First seen.
    pub connected_at: DateTime<Utc>,
}

impl From<ConnectionRecord> for ConnectionInfo {
    fn from(record: ConnectionRecord) -> Self {
        Self {
            port_id: record.port_id.to_string(),
            status: record.status,
            baud_rate: record.baud_rate,
            session_id: record.session_id,
            bytes_read: record.bytes_read,
            bytes_written: record.bytes_written,
            connected_at: record.connected_at,
        }
    }
}

/// Response body for `GET /api/hubs/{hub_id}/connections`.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionListResponse {
    /// Hub identifier.
    pub hub_id: String,
    /// Open connections.
    pub connections: Vec<ConnectionInfo>,
    /// Number of connections.
    pub count: usize,
}

/// One recorded device event.
#[derive(Debug, Serialize, ToSchema)]
pub struct DeviceEventDto {
    /// Relay receive time.
    pub timestamp: DateTime<Utc>,
    /// `connected` or `disconnected`.
    pub event_type: String,
    /// Affected port.
    pub port_id: String,
    /// Device metadata.
    #[schema(value_type = Option<Object>)]
    pub device_info: Option<serde_json::Value>,
}

impl From<DeviceEventRecord> for DeviceEventDto {
    fn from(record: DeviceEventRecord) -> Self {
        Self {
            timestamp: record.timestamp,
            event_type: record.event_type.as_str().to_string(),
            port_id: record.port_id.to_string(),
            device_info: record
                .device_info
                .and_then(|info| serde_json::to_value(info).ok()),
        }
    }
}

/// Response body for `GET /api/hubs/{hub_id}/events`.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeviceEventListResponse {
    /// Hub identifier.
    pub hub_id: String,
    /// Most recent events, oldest first.
    pub events: Vec<DeviceEventDto>,
    /// Number of events returned.
    pub count: usize,
}

/// Status of one hub task.
#[derive(Debug, Serialize, ToSchema)]
pub struct TaskStatusResponse {
    /// Task (command) id.
    pub task_id: String,
    /// Task status.
    pub status: String,
    /// Progress percentage.
    pub progress: Option<u32>,
    /// Result payload.
    #[schema(value_type = Option<Object>)]
    pub result: Option<serde_json::Value>,
    /// Error message.
    pub error: Option<String>,
    /// Time of the status.
    pub timestamp: DateTime<Utc>,
}

impl TaskStatusResponse {
    /// A freshly dispatched command that the hub has not reported on yet.
    #[must_use]
    pub fn pending(task_id: String) -> Self {
        Self {
            task_id,
            status: "pending".to_string(),
            progress: None,
            result: None,
            error: None,
            timestamp: Utc::now(),
        }
    }
}

impl From<TaskStatusRecord> for TaskStatusResponse {
    fn from(record: TaskStatusRecord) -> Self {
        Self {
            task_id: record.task_id,
            status: record.status,
            progress: record.progress,
            result: record.result,
            error: record.error,
            timestamp: record.timestamp,
        }
    }
}

/// Response body for `GET /api/hubs/{hub_id}/tasks`.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaskListResponse {
    /// Hub identifier.
    pub hub_id: String,
    /// Task statuses, newest first.
    pub tasks: Vec<TaskStatusResponse>,
    /// Number of tasks.
    pub count: usize,
}
