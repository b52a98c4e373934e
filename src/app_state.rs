//! Shared application state injected into all Axum handlers.

use std::sync::Arc;
use std::time::Duration;

use crate::auth::{ClientTokenVerifier, DeviceCredentials, JwtVerifier, StaticDeviceTokens};
use crate::config::RelayConfig;
use crate::domain::{Broadcaster, EventStore, SessionRegistry};
use crate::service::{CommandDispatcher, RelayService};

/// Per-socket limits applied by the session handlers.
#[derive(Debug, Clone, Copy)]
pub struct SessionLimits {
    /// Frames buffered per socket writer.
    pub outbound_queue_capacity: usize,
    /// Time allowed for the hub handshake.
    pub handshake_timeout: Duration,
    /// Silence after which a hub is disconnected.
    pub hub_idle_timeout: Duration,
}

impl From<&RelayConfig> for SessionLimits {
    fn from(config: &RelayConfig) -> Self {
        Self {
            outbound_queue_capacity: config.outbound_queue_capacity,
            handshake_timeout: config.handshake_timeout,
            hub_idle_timeout: config.hub_idle_timeout,
        }
    }
}

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Live hub and client sessions.
    pub registry: Arc<SessionRegistry>,
    /// Per-hub event history.
    pub store: Arc<EventStore>,
    /// Applies hub frames and fans them out.
    pub relay: RelayService,
    /// Sends commands to hubs.
    pub dispatcher: CommandDispatcher,
    /// Hub device-token verification.
    pub device_credentials: Arc<dyn DeviceCredentials>,
    /// Client bearer-token verification.
    pub client_tokens: Arc<dyn ClientTokenVerifier>,
    /// Socket limits.
    pub limits: SessionLimits,
}

impl AppState {
    /// Wires the domain and service layers around the given credential
    /// verifiers.
    #[must_use]
    pub fn new(
        config: &RelayConfig,
        device_credentials: Arc<dyn DeviceCredentials>,
        client_tokens: Arc<dyn ClientTokenVerifier>,
    ) -> Self {
        let registry = Arc::new(SessionRegistry::new());
        let store = Arc::new(EventStore::new(
            config.telemetry_capacity,
            config.device_event_capacity,
        ));
        let relay = RelayService::new(
            Arc::clone(&store),
            Broadcaster::new(Arc::clone(&registry)),
        );
        let dispatcher = CommandDispatcher::new(Arc::clone(&registry));
        Self {
            registry,
            store,
            relay,
            dispatcher,
            device_credentials,
            client_tokens,
            limits: SessionLimits::from(config),
        }
    }

    /// Builds state with the default verifiers: the configured device
    /// tokens and an HS256 JWT verifier.
    #[must_use]
    pub fn from_config(config: &RelayConfig) -> Self {
        let devices = StaticDeviceTokens::new(config.device_tokens.iter().cloned());
        if devices.is_empty() {
            tracing::warn!("no device tokens configured, every hub handshake will be rejected");
        } else {
            tracing::info!(count = devices.len(), "device tokens loaded");
        }
        let jwt = JwtVerifier::hs256(config.jwt_secret.as_bytes());
        Self::new(config, Arc::new(devices), Arc::new(jwt))
    }
}
