//! Relay service: applies hub events to the store and fans them out.

use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::Utc;

use crate::domain::records::{
    DeviceEventKind, DeviceEventRecord, DeviceInfo, HealthSnapshot, TaskStatusRecord,
    TelemetryEntry,
};
use crate::domain::{BroadcastReport, Broadcaster, EventStore, HubId};
use crate::error::SessionError;
use crate::ws::messages::{
    ClientMessage, DeviceEventMessage, HealthMessage, HubInbound, TaskStatusMessage,
    TelemetryMessage,
};

/// Processes decoded hub frames.
///
/// Every ingest method follows the same pattern: validate → update the
/// [`EventStore`] → build the client frame → hand it to the
/// [`Broadcaster`]. Failures only ever affect the frame being processed.
#[derive(Debug, Clone)]
pub struct RelayService {
    store: Arc<EventStore>,
    broadcaster: Broadcaster,
}

impl RelayService {
    /// Creates a new `RelayService`.
    #[must_use]
    pub fn new(store: Arc<EventStore>, broadcaster: Broadcaster) -> Self {
        Self { store, broadcaster }
    }

    /// Returns a reference to the inner [`EventStore`].
    #[must_use]
    pub fn store(&self) -> &Arc<EventStore> {
        &self.store
    }

    /// Routes one decoded frame from `hub_id`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::ValidationFailure`] when the frame claims a
    /// different hub or carries an invalid payload, and
    /// [`SessionError::UnknownMessageType`] for unrecognized types.
    pub async fn handle(&self, hub_id: &HubId, frame: HubInbound) -> Result<(), SessionError> {
        frame.check_origin(hub_id)?;
        match frame {
            HubInbound::Telemetry(msg) => self.ingest_telemetry(hub_id, msg).await.map(drop),
            HubInbound::Health(msg) => {
                self.ingest_health(hub_id, msg).await;
                Ok(())
            }
            HubInbound::DeviceEvent(msg) => {
                self.ingest_device_event(hub_id, msg).await;
                Ok(())
            }
            HubInbound::TaskStatus { message, raw } => {
                self.ingest_task_status(hub_id, message, &raw).await;
                Ok(())
            }
            HubInbound::Unrecognized(kind) => Err(SessionError::UnknownMessageType(kind)),
        }
    }

    /// Stores a telemetry frame and streams it to subscribers of its port.
    ///
    /// The first frame seen on a port without a connection record creates
    /// one, and records a synthesized `connected` device event so the port
    /// becomes visible.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::ValidationFailure`] if `data` is not valid
    /// base64.
    pub async fn ingest_telemetry(
        &self,
        hub_id: &HubId,
        msg: TelemetryMessage,
    ) -> Result<BroadcastReport, SessionError> {
        let decoded = BASE64
            .decode(msg.data.as_bytes())
            .map_err(|e| SessionError::ValidationFailure {
                kind: "telemetry".to_string(),
                reason: format!("invalid base64 payload: {e}"),
            })?;
        let size = decoded.len();

        self.store
            .append_telemetry(TelemetryEntry {
                timestamp: Utc::now(),
                hub_id: hub_id.clone(),
                port_id: msg.port_id.clone(),
                session_id: msg.session_id.clone(),
                data: msg.data.clone(),
                data_size_bytes: size,
            })
            .await;

        let created = self
            .store
            .record_port_traffic(
                hub_id,
                &msg.port_id,
                &msg.session_id,
                u64::try_from(size).unwrap_or(u64::MAX),
            )
            .await;
        if created {
            tracing::info!(hub_id = %hub_id, port_id = %msg.port_id, "port discovered from telemetry");
            let info = DeviceInfo {
                port: Some(msg.port_id.to_string()),
                ..DeviceInfo::default()
            };
            self.store
                .record_device_event(
                    hub_id,
                    DeviceEventRecord::new(DeviceEventKind::Connected, msg.port_id.clone(), Some(info)),
                )
                .await;
        }

        tracing::debug!(hub_id = %hub_id, port_id = %msg.port_id, bytes = size, "telemetry");

        let frame = ClientMessage::TelemetryStream {
            hub_id: hub_id.clone(),
            port_id: msg.port_id.clone(),
            session_id: msg.session_id,
            timestamp: msg.timestamp,
            data: msg.data,
            data_size_bytes: size,
        };
        Ok(match encode(&frame) {
            Some(text) => {
                self.broadcaster
                    .broadcast_scoped(hub_id, &msg.port_id, &text)
                    .await
            }
            None => BroadcastReport::default(),
        })
    }

    /// Replaces the hub's health snapshot and notifies every client.
    pub async fn ingest_health(&self, hub_id: &HubId, msg: HealthMessage) -> BroadcastReport {
        let snapshot = HealthSnapshot {
            timestamp: Utc::now(),
            uptime_seconds: msg.uptime_seconds,
            system: msg.system,
            service: msg.service,
            errors: msg.errors,
        };
        let frame = ClientMessage::Health {
            hub_id: hub_id.clone(),
            timestamp: msg.timestamp,
            cpu_percent: snapshot.system_percent("cpu"),
            memory_percent: snapshot.system_percent("memory"),
            disk_percent: snapshot.system_percent("disk"),
        };

        tracing::info!(
            hub_id = %hub_id,
            uptime_seconds = snapshot.uptime_seconds,
            cpu_percent = ?snapshot.system_percent("cpu"),
            "health report"
        );

        self.store.set_health(hub_id, snapshot).await;

        match encode(&frame) {
            Some(text) => self.broadcaster.broadcast_all(&text).await,
            None => BroadcastReport::default(),
        }
    }

    /// Records a device event and notifies subscribers of its port.
    pub async fn ingest_device_event(
        &self,
        hub_id: &HubId,
        msg: DeviceEventMessage,
    ) -> BroadcastReport {
        tracing::info!(
            hub_id = %hub_id,
            port_id = %msg.port_id,
            event = msg.event_type.as_str(),
            "device event"
        );

        self.store
            .record_device_event(
                hub_id,
                DeviceEventRecord::new(msg.event_type, msg.port_id.clone(), msg.device_info),
            )
            .await;

        let frame = ClientMessage::DeviceEvent {
            hub_id: hub_id.clone(),
            port_id: msg.port_id.clone(),
            timestamp: msg.timestamp,
            event: msg.event_type,
        };
        match encode(&frame) {
            Some(text) => {
                self.broadcaster
                    .broadcast_scoped(hub_id, &msg.port_id, &text)
                    .await
            }
            None => BroadcastReport::default(),
        }
    }

    /// Records a task status and forwards the raw frame to every client.
    pub async fn ingest_task_status(
        &self,
        hub_id: &HubId,
        msg: TaskStatusMessage,
        raw: &str,
    ) -> BroadcastReport {
        tracing::info!(hub_id = %hub_id, task_id = %msg.task_id, status = %msg.status, "task status");

        self.store
            .set_task_status(
                hub_id,
                TaskStatusRecord {
                    timestamp: Utc::now(),
                    task_id: msg.task_id,
                    status: msg.status,
                    progress: msg.progress,
                    result: msg.result,
                    error: msg.error,
                },
            )
            .await;

        self.broadcaster.broadcast_all(raw).await
    }
}

fn encode(frame: &ClientMessage) -> Option<String> {
    match frame.to_json() {
        Ok(text) => Some(text),
        Err(e) => {
            tracing::error!(error = %e, "failed to serialize client frame");
            None
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;
    use crate::domain::{
        ClientSession, Outbound, OutboundFrame, PortId, SessionRegistry, Subscription,
    };

    struct Fixture {
        registry: Arc<SessionRegistry>,
        service: RelayService,
    }

    fn fixture() -> Fixture {
        let registry = Arc::new(SessionRegistry::new());
        let service = RelayService::new(
            Arc::new(EventStore::default()),
            Broadcaster::new(Arc::clone(&registry)),
        );
        Fixture { registry, service }
    }

    async fn add_client(
        registry: &SessionRegistry,
        pairs: &[Subscription],
    ) -> mpsc::Receiver<OutboundFrame> {
        let (outbound, rx) = Outbound::channel(16);
        let id = registry
            .register_client(ClientSession::new("admin", outbound))
            .await;
        registry.subscribe(id, pairs).await;
        rx
    }

    fn text(frame: Option<OutboundFrame>) -> serde_json::Value {
        match frame {
            Some(OutboundFrame::Text(t)) => serde_json::from_str(&t).unwrap_or_default(),
            other => panic!("expected text frame, got {other:?}"),
        }
    }

    fn telemetry(port: &str, data: &str) -> HubInbound {
        HubInbound::Telemetry(TelemetryMessage {
            hub_id: Some(HubId::new("H1")),
            timestamp: "2026-01-01T00:00:00Z".to_string(),
            port_id: PortId::new(port),
            session_id: "s1".to_string(),
            data: data.to_string(),
        })
    }

    #[tokio::test]
    async fn telemetry_is_stored_and_streamed_to_subscribers() {
        let f = fixture();
        let mut subscribed = add_client(&f.registry, &[Subscription::new("H1", "P1")]).await;
        let mut other = add_client(&f.registry, &[]).await;
        let hub = HubId::new("H1");

        // "0123456789" is ten bytes.
        let result = f.service.handle(&hub, telemetry("P1", "MDEyMzQ1Njc4OQ==")).await;
        assert!(result.is_ok());

        let value = text(subscribed.try_recv().ok());
        assert_eq!(value.get("type").and_then(|v| v.as_str()), Some("telemetry_stream"));
        assert_eq!(value.get("dataSizeBytes").and_then(|v| v.as_u64()), Some(10));
        assert!(subscribed.try_recv().is_err());
        assert!(other.try_recv().is_err());

        let stats = f.service.store().telemetry_stats(&hub).await;
        assert_eq!(stats.count, 1);
        assert_eq!(stats.total_bytes, 10);
    }

    #[tokio::test]
    async fn first_telemetry_makes_port_visible() {
        let f = fixture();
        let hub = HubId::new("H1");
        assert!(f.service.handle(&hub, telemetry("P7", "aGk=")).await.is_ok());
        assert!(f.service.handle(&hub, telemetry("P7", "aGk=")).await.is_ok());

        let store = f.service.store();
        let Some(conn) = store.get_connection(&hub, &PortId::new("P7")).await else {
            panic!("connection should exist");
        };
        assert_eq!(conn.bytes_read, 4);
        assert!(store.get_port(&hub, &PortId::new("P7")).await.is_some());
        assert_eq!(store.read_device_events(&hub, None).await.len(), 1);
    }

    #[tokio::test]
    async fn invalid_base64_is_dropped() {
        let f = fixture();
        let hub = HubId::new("H1");
        let result = f.service.handle(&hub, telemetry("P1", "***")).await;
        assert!(matches!(result, Err(SessionError::ValidationFailure { .. })));
        assert_eq!(f.service.store().telemetry_stats(&hub).await.count, 0);
    }

    #[tokio::test]
    async fn foreign_hub_id_is_rejected() {
        let f = fixture();
        let result = f.service.handle(&HubId::new("H2"), telemetry("P1", "aGk=")).await;
        assert!(matches!(result, Err(SessionError::ValidationFailure { .. })));
        assert_eq!(f.service.store().telemetry_stats(&HubId::new("H2")).await.count, 0);
    }

    #[tokio::test]
    async fn health_reaches_clients_without_subscriptions() {
        let f = fixture();
        let mut rx = add_client(&f.registry, &[]).await;
        let hub = HubId::new("H1");
        let msg = HealthMessage {
            hub_id: None,
            timestamp: "t".to_string(),
            uptime_seconds: 42,
            system: serde_json::json!({"cpu": {"percent": 9.5}, "disk": {"percent": 70.0}}),
            service: serde_json::json!({}),
            errors: serde_json::json!({}),
        };
        let report = f.service.ingest_health(&hub, msg).await;
        assert_eq!(report.delivered, 1);

        let value = text(rx.try_recv().ok());
        assert_eq!(value.get("type").and_then(|v| v.as_str()), Some("health"));
        assert_eq!(value.get("cpu_percent").and_then(|v| v.as_f64()), Some(9.5));
        assert!(value.get("memory_percent").is_some_and(serde_json::Value::is_null));

        let Some(snapshot) = f.service.store().get_health(&hub).await else {
            panic!("health stored");
        };
        assert_eq!(snapshot.uptime_seconds, 42);
    }

    #[tokio::test]
    async fn device_events_update_connections() {
        let f = fixture();
        let mut rx = add_client(&f.registry, &[Subscription::new("H1", "P1")]).await;
        let hub = HubId::new("H1");

        let connected = DeviceEventMessage {
            hub_id: None,
            timestamp: "t".to_string(),
            event_type: DeviceEventKind::Connected,
            port_id: PortId::new("P1"),
            device_info: Some(DeviceInfo {
                session_id: Some("sess".to_string()),
                ..DeviceInfo::default()
            }),
        };
        f.service.ingest_device_event(&hub, connected).await;
        let Some(conn) = f.service.store().get_connection(&hub, &PortId::new("P1")).await else {
            panic!("connection created");
        };
        assert_eq!(conn.baud_rate, crate::domain::records::DEFAULT_BAUD_RATE);
        assert_eq!(conn.session_id, "sess");
        let value = text(rx.try_recv().ok());
        assert_eq!(value.get("event").and_then(|v| v.as_str()), Some("connected"));

        let disconnected = DeviceEventMessage {
            hub_id: None,
            timestamp: "t".to_string(),
            event_type: DeviceEventKind::Disconnected,
            port_id: PortId::new("P1"),
            device_info: None,
        };
        f.service.ingest_device_event(&hub, disconnected).await;
        assert!(f.service.store().get_connection(&hub, &PortId::new("P1")).await.is_none());
    }

    #[tokio::test]
    async fn device_event_reaches_only_its_port() {
        let f = fixture();
        let mut same_port = add_client(&f.registry, &[Subscription::new("H1", "P1")]).await;
        let mut other_port = add_client(&f.registry, &[Subscription::new("H1", "P2")]).await;
        let mut other_hub = add_client(&f.registry, &[Subscription::new("H2", "P1")]).await;
        let hub = HubId::new("H1");

        let Ok(frame) = HubInbound::decode(
            r#"{"type":"device_event","hubId":"H1","timestamp":"t","eventType":"connected","portId":"P1",
                "deviceInfo":{"port":"/dev/ttyUSB0","vendor_id":1027,"product_id":24577,"baud_rate":9600}}"#,
        ) else {
            panic!("device event with numeric ids should decode");
        };
        assert!(f.service.handle(&hub, frame).await.is_ok());

        let value = text(same_port.try_recv().ok());
        assert_eq!(value.get("type").and_then(|v| v.as_str()), Some("device_event"));
        assert!(other_port.try_recv().is_err());
        assert!(other_hub.try_recv().is_err());

        let store = f.service.store();
        let Some(conn) = store.get_connection(&hub, &PortId::new("P1")).await else {
            panic!("connection created");
        };
        assert_eq!(conn.baud_rate, 9600);
        let Some(port) = store.get_port(&hub, &PortId::new("P1")).await else {
            panic!("port recorded");
        };
        assert_eq!(port.vendor_id.as_deref(), Some("1027"));
        assert_eq!(port.product_id.as_deref(), Some("24577"));
    }

    #[tokio::test]
    async fn task_status_is_forwarded_verbatim() {
        let f = fixture();
        let mut rx = add_client(&f.registry, &[]).await;
        let hub = HubId::new("H1");
        let raw = r#"{"type":"task_status","timestamp":"t","taskId":"c1","status":"completed","extra":1}"#;
        let Ok(frame) = HubInbound::decode(raw) else {
            panic!("valid frame");
        };
        assert!(f.service.handle(&hub, frame).await.is_ok());

        assert_eq!(rx.try_recv().ok(), Some(OutboundFrame::Text(raw.to_string())));
        let Some(task) = f.service.store().get_task_status(&hub, "c1").await else {
            panic!("task stored");
        };
        assert_eq!(task.status, "completed");
    }

    #[tokio::test]
    async fn unknown_type_is_reported() {
        let f = fixture();
        let result = f
            .service
            .handle(&HubId::new("H1"), HubInbound::Unrecognized("reboot".to_string()))
            .await;
        assert!(matches!(result, Err(SessionError::UnknownMessageType(_))));
    }
}
