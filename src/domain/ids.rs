//! Typed identifiers for hubs, ports, and client sessions.
//!
//! [`HubId`] and [`PortId`] wrap the strings chosen by the hub software.
//! [`ClientId`] is generated server-side (UUID v4) for every accepted
//! client socket. All three serialize transparently.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a remote device hub (e.g. `"rpi-bridge-01"`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HubId(String);

impl HubId {
    /// Creates a `HubId` from any string-like value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HubId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for HubId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for HubId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Identifier of a serial port on a hub (e.g. `"ttyUSB0"`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PortId(String);

impl PortId {
    /// Creates a `PortId` from any string-like value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PortId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for PortId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Opaque identifier of one client WebSocket connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(uuid::Uuid);

impl ClientId {
    /// Creates a new random `ClientId` (UUID v4).
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Returns the inner [`uuid::Uuid`].
    #[must_use]
    pub const fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A `(hub, port)` pair a client can subscribe to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Subscription {
    /// Hub the port belongs to.
    #[serde(rename = "hubId")]
    pub hub_id: HubId,
    /// Port on that hub.
    #[serde(rename = "portId")]
    pub port_id: PortId,
}

impl Subscription {
    /// Creates a subscription key.
    #[must_use]
    pub fn new(hub_id: impl Into<HubId>, port_id: impl Into<PortId>) -> Self {
        Self {
            hub_id: hub_id.into(),
            port_id: port_id.into(),
        }
    }
}

impl fmt::Display for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.hub_id, self.port_id)
    }
}
