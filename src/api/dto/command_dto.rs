//! Request bodies for the command endpoints.
//!
//! Each body maps to one [`CommandType`] with its own parameter shape and
//! default priority.

use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;

use crate::domain::PortId;
use crate::ws::messages::CommandType;

fn default_encoding() -> String {
    "utf-8".to_string()
}

/// Request body for `POST /api/hubs/{hub_id}/commands/write`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SerialWriteRequest {
    /// Target port.
    pub port_id: String,
    /// Data to write.
    pub data: String,
    /// Data encoding.
    #[serde(default = "default_encoding")]
    pub encoding: String,
    /// Priority (1-10). Defaults to 5.
    #[serde(default)]
    pub priority: Option<u8>,
}

/// Request body for `POST /api/hubs/{hub_id}/commands/flash`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FlashFirmwareRequest {
    /// Target port.
    pub port_id: String,
    /// Base64-encoded firmware image.
    pub firmware_data: String,
    /// Board FQBN.
    #[serde(default)]
    pub board_fqbn: Option<String>,
    /// Priority (1-10). Defaults to 3.
    #[serde(default)]
    pub priority: Option<u8>,
}

/// Request body for `POST /api/hubs/{hub_id}/commands/restart`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RestartDeviceRequest {
    /// Target port.
    pub port_id: String,
    /// Priority (1-10). Defaults to 2.
    #[serde(default)]
    pub priority: Option<u8>,
}

/// Request body for `POST /api/hubs/{hub_id}/commands/close`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CloseConnectionRequest {
    /// Target port.
    pub port_id: String,
    /// Priority (1-10). Defaults to 1.
    #[serde(default)]
    pub priority: Option<u8>,
}

/// The parts a [`crate::ws::messages::Command`] is built from.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandParts {
    /// Command kind.
    pub command_type: CommandType,
    /// Target port.
    pub port_id: PortId,
    /// Kind-specific parameters.
    pub params: serde_json::Value,
    /// Requested priority.
    pub priority: Option<u8>,
}

impl From<SerialWriteRequest> for CommandParts {
    fn from(req: SerialWriteRequest) -> Self {
        Self {
            command_type: CommandType::SerialWrite,
            port_id: PortId::new(req.port_id),
            params: json!({ "data": req.data, "encoding": req.encoding }),
            priority: req.priority,
        }
    }
}

impl From<FlashFirmwareRequest> for CommandParts {
    fn from(req: FlashFirmwareRequest) -> Self {
        Self {
            command_type: CommandType::Flash,
            port_id: PortId::new(req.port_id),
            params: json!({ "firmwareData": req.firmware_data, "boardFqbn": req.board_fqbn }),
            priority: req.priority,
        }
    }
}

impl From<RestartDeviceRequest> for CommandParts {
    fn from(req: RestartDeviceRequest) -> Self {
        Self {
            command_type: CommandType::Restart,
            port_id: PortId::new(req.port_id),
            params: json!({}),
            priority: req.priority,
        }
    }
}

impl From<CloseConnectionRequest> for CommandParts {
    fn from(req: CloseConnectionRequest) -> Self {
        Self {
            command_type: CommandType::CloseConnection,
            port_id: PortId::new(req.port_id),
            params: json!({}),
            priority: req.priority,
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn write_request_defaults_encoding() {
        let Ok(req) = serde_json::from_str::<SerialWriteRequest>(r#"{"portId":"P1","data":"AT"}"#)
        else {
            panic!("valid request");
        };
        assert_eq!(req.encoding, "utf-8");
        let parts = CommandParts::from(req);
        assert_eq!(parts.command_type, CommandType::SerialWrite);
        assert_eq!(parts.params.get("data").and_then(|v| v.as_str()), Some("AT"));
    }

    #[test]
    fn close_request_maps_to_close_connection() {
        let parts = CommandParts::from(CloseConnectionRequest {
            port_id: "P1".to_string(),
            priority: None,
        });
        assert_eq!(parts.command_type, CommandType::CloseConnection);
        assert!(parts.params.as_object().is_some_and(serde_json::Map::is_empty));
    }
}
