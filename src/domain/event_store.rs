//! Bounded per-hub event history.
//!
//! [`EventStore`] keeps, for every hub that ever reported anything, a
//! telemetry ring buffer, the latest health snapshot, port and connection
//! tables, a task-status table, and a bounded device-event log.
//!
//! # Concurrency
//!
//! All hubs share one [`tokio::sync::RwLock`]. Every method takes the lock
//! once, so multi-field reads such as [`EventStore::telemetry_snapshot`] are
//! never observed mid-update. No method awaits anything while holding it.

use std::collections::{BTreeMap, HashMap, VecDeque};

use tokio::sync::RwLock;

use super::records::{
    ConnectionRecord, DEFAULT_BAUD_RATE, DeviceEventKind, DeviceEventRecord, HealthSnapshot,
    PortRecord, TaskStatusRecord, TelemetryEntry, TelemetryStats,
};
use super::{HubId, PortId};

/// Default number of telemetry entries retained per hub.
pub const DEFAULT_TELEMETRY_CAPACITY: usize = 1000;

/// Everything retained for a single hub.
#[derive(Debug, Default)]
struct HubHistory {
    telemetry: VecDeque<TelemetryEntry>,
    telemetry_bytes: usize,
    health: Option<HealthSnapshot>,
    device_events: VecDeque<DeviceEventRecord>,
    ports: BTreeMap<PortId, PortRecord>,
    connections: BTreeMap<PortId, ConnectionRecord>,
    tasks: HashMap<String, TaskStatusRecord>,
}

impl HubHistory {
    fn push_telemetry(&mut self, entry: TelemetryEntry, capacity: usize) {
        self.telemetry_bytes = self.telemetry_bytes.saturating_add(entry.data_size_bytes);
        self.telemetry.push_back(entry);
        while self.telemetry.len() > capacity {
            if let Some(evicted) = self.telemetry.pop_front() {
                self.telemetry_bytes = self.telemetry_bytes.saturating_sub(evicted.data_size_bytes);
            }
        }
    }

    fn stats(&self) -> TelemetryStats {
        TelemetryStats {
            count: self.telemetry.len(),
            total_bytes: self.telemetry_bytes,
        }
    }

    fn tail_telemetry(&self, limit: Option<usize>) -> Vec<TelemetryEntry> {
        tail(&self.telemetry, limit)
    }
}

/// Returns the last `limit` items (all items when `limit` is `None`).
fn tail<T: Clone>(items: &VecDeque<T>, limit: Option<usize>) -> Vec<T> {
    let skip = limit.map_or(0, |l| items.len().saturating_sub(l));
    items.iter().skip(skip).cloned().collect()
}

/// In-memory store of hub events with bounded history.
#[derive(Debug)]
pub struct EventStore {
    hubs: RwLock<HashMap<HubId, HubHistory>>,
    telemetry_capacity: usize,
    device_event_capacity: usize,
}

impl EventStore {
    /// Creates an empty store.
    ///
    /// Capacities of `0` are raised to `1`.
    #[must_use]
    pub fn new(telemetry_capacity: usize, device_event_capacity: usize) -> Self {
        Self {
            hubs: RwLock::new(HashMap::new()),
            telemetry_capacity: telemetry_capacity.max(1),
            device_event_capacity: device_event_capacity.max(1),
        }
    }

    // ── Telemetry ──────────────────────────────────────────────────────

    /// Appends a telemetry entry to its hub's ring buffer, evicting the
    /// oldest entries beyond the cap.
    pub async fn append_telemetry(&self, entry: TelemetryEntry) {
        let mut hubs = self.hubs.write().await;
        hubs.entry(entry.hub_id.clone())
            .or_default()
            .push_telemetry(entry, self.telemetry_capacity);
    }

    /// Returns the most recent `limit` entries in arrival order, or all
    /// retained entries when `limit` is `None`.
    pub async fn read_telemetry(&self, hub_id: &HubId, limit: Option<usize>) -> Vec<TelemetryEntry> {
        let hubs = self.hubs.read().await;
        hubs.get(hub_id)
            .map(|h| h.tail_telemetry(limit))
            .unwrap_or_default()
    }

    /// Returns count and total byte size of retained telemetry.
    pub async fn telemetry_stats(&self, hub_id: &HubId) -> TelemetryStats {
        let hubs = self.hubs.read().await;
        hubs.get(hub_id).map(HubHistory::stats).unwrap_or_default()
    }

    /// Returns entries and stats read under a single lock acquisition.
    pub async fn telemetry_snapshot(
        &self,
        hub_id: &HubId,
        limit: Option<usize>,
    ) -> (Vec<TelemetryEntry>, TelemetryStats) {
        let hubs = self.hubs.read().await;
        hubs.get(hub_id)
            .map(|h| (h.tail_telemetry(limit), h.stats()))
            .unwrap_or_default()
    }

    // ── Health ─────────────────────────────────────────────────────────

    /// Replaces the hub's health snapshot.
    pub async fn set_health(&self, hub_id: &HubId, snapshot: HealthSnapshot) {
        let mut hubs = self.hubs.write().await;
        hubs.entry(hub_id.clone()).or_default().health = Some(snapshot);
    }

    /// Returns the hub's latest health snapshot.
    pub async fn get_health(&self, hub_id: &HubId) -> Option<HealthSnapshot> {
        let hubs = self.hubs.read().await;
        hubs.get(hub_id).and_then(|h| h.health.clone())
    }

    // ── Device events, ports, connections ──────────────────────────────

    /// Records a device event and applies its side effects.
    ///
    /// - `connected`: upserts the port record from the device info and
    ///   ensures a connection record exists. An existing connection keeps
    ///   its byte counters and connect time.
    /// - `disconnected`: removes the connection record.
    pub async fn record_device_event(&self, hub_id: &HubId, event: DeviceEventRecord) {
        let mut hubs = self.hubs.write().await;
        let history = hubs.entry(hub_id.clone()).or_default();
        let port_id = event.port_id.clone();

        match event.event_type {
            DeviceEventKind::Connected => {
                let info = event.device_info.as_ref();
                history
                    .ports
                    .insert(port_id.clone(), PortRecord::from_device_info(&port_id, info));

                let baud_rate = info.and_then(|i| i.baud_rate);
                let session_id = info.and_then(|i| i.session_id.clone());
                match history.connections.get_mut(&port_id) {
                    Some(existing) => {
                        existing.status = "connected".to_string();
                        if let Some(baud) = baud_rate {
                            existing.baud_rate = baud;
                        }
                        if let Some(session) = session_id {
                            existing.session_id = session;
                        }
                    }
                    None => {
                        let record = ConnectionRecord::connected(
                            port_id.clone(),
                            baud_rate.unwrap_or(DEFAULT_BAUD_RATE),
                            session_id.unwrap_or_default(),
                        );
                        history.connections.insert(port_id, record);
                    }
                }
            }
            DeviceEventKind::Disconnected => {
                history.connections.remove(&port_id);
            }
        }

        history.device_events.push_back(event);
        while history.device_events.len() > self.device_event_capacity {
            history.device_events.pop_front();
        }
    }

    /// Returns the most recent `limit` device events in arrival order.
    pub async fn read_device_events(
        &self,
        hub_id: &HubId,
        limit: Option<usize>,
    ) -> Vec<DeviceEventRecord> {
        let hubs = self.hubs.read().await;
        hubs.get(hub_id)
            .map(|h| tail(&h.device_events, limit))
            .unwrap_or_default()
    }

    /// Inserts or replaces a connection record.
    pub async fn upsert_connection(&self, hub_id: &HubId, record: ConnectionRecord) {
        let mut hubs = self.hubs.write().await;
        hubs.entry(hub_id.clone())
            .or_default()
            .connections
            .insert(record.port_id.clone(), record);
    }

    /// Adds `bytes_read` to the port's connection record, creating a
    /// minimal one (baud rate `0`) when absent.
    ///
    /// A non-empty `session_id` replaces the stored one. Returns `true` if
    /// the record was created by this call.
    pub async fn record_port_traffic(
        &self,
        hub_id: &HubId,
        port_id: &PortId,
        session_id: &str,
        bytes_read: u64,
    ) -> bool {
        let mut hubs = self.hubs.write().await;
        let history = hubs.entry(hub_id.clone()).or_default();
        match history.connections.get_mut(port_id) {
            Some(existing) => {
                existing.bytes_read = existing.bytes_read.saturating_add(bytes_read);
                existing.status = "connected".to_string();
                if !session_id.is_empty() {
                    existing.session_id = session_id.to_string();
                }
                false
            }
            None => {
                let mut record = ConnectionRecord::connected(port_id.clone(), 0, session_id);
                record.bytes_read = bytes_read;
                history.connections.insert(port_id.clone(), record);
                true
            }
        }
    }

    /// Removes a connection record, returning it if it existed.
    pub async fn remove_connection(&self, hub_id: &HubId, port_id: &PortId) -> Option<ConnectionRecord> {
        let mut hubs = self.hubs.write().await;
        hubs.get_mut(hub_id)
            .and_then(|h| h.connections.remove(port_id))
    }

    /// Returns one connection record.
    pub async fn get_connection(&self, hub_id: &HubId, port_id: &PortId) -> Option<ConnectionRecord> {
        let hubs = self.hubs.read().await;
        hubs.get(hub_id)
            .and_then(|h| h.connections.get(port_id).cloned())
    }

    /// Returns all connection records of a hub, ordered by port id.
    pub async fn list_connections(&self, hub_id: &HubId) -> Vec<ConnectionRecord> {
        let hubs = self.hubs.read().await;
        hubs.get(hub_id)
            .map(|h| h.connections.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Returns all known ports of a hub, ordered by port id.
    pub async fn list_ports(&self, hub_id: &HubId) -> Vec<PortRecord> {
        let hubs = self.hubs.read().await;
        hubs.get(hub_id)
            .map(|h| h.ports.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Returns one port record.
    pub async fn get_port(&self, hub_id: &HubId, port_id: &PortId) -> Option<PortRecord> {
        let hubs = self.hubs.read().await;
        hubs.get(hub_id).and_then(|h| h.ports.get(port_id).cloned())
    }

    // ── Task status ────────────────────────────────────────────────────

    /// Stores a task status; the latest status for a task id wins.
    pub async fn set_task_status(&self, hub_id: &HubId, record: TaskStatusRecord) {
        let mut hubs = self.hubs.write().await;
        hubs.entry(hub_id.clone())
            .or_default()
            .tasks
            .insert(record.task_id.clone(), record);
    }

    /// Returns the latest status of one task.
    pub async fn get_task_status(&self, hub_id: &HubId, task_id: &str) -> Option<TaskStatusRecord> {
        let hubs = self.hubs.read().await;
        hubs.get(hub_id).and_then(|h| h.tasks.get(task_id).cloned())
    }

    /// Returns all task statuses of a hub, newest first.
    pub async fn list_task_statuses(&self, hub_id: &HubId) -> Vec<TaskStatusRecord> {
        let hubs = self.hubs.read().await;
        let mut tasks: Vec<TaskStatusRecord> = hubs
            .get(hub_id)
            .map(|h| h.tasks.values().cloned().collect())
            .unwrap_or_default();
        tasks.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        tasks
    }
}

impl Default for EventStore {
    fn default() -> Self {
        Self::new(DEFAULT_TELEMETRY_CAPACITY, DEFAULT_TELEMETRY_CAPACITY)
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::indexing_slicing)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use chrono::Utc;

    use super::*;
    use crate::domain::records::DeviceInfo;

    fn entry(hub: &str, port: &str, data: &str, size: usize) -> TelemetryEntry {
        TelemetryEntry {
            timestamp: Utc::now(),
            hub_id: HubId::new(hub),
            port_id: PortId::new(port),
            session_id: "s-1".to_string(),
            data: data.to_string(),
            data_size_bytes: size,
        }
    }

    #[tokio::test]
    async fn telemetry_keeps_last_cap_entries_in_order() {
        let store = EventStore::new(5, 5);
        for i in 0..12 {
            store.append_telemetry(entry("H1", "P1", &format!("e{i}"), 1)).await;
        }
        let kept: Vec<String> = store
            .read_telemetry(&HubId::new("H1"), None)
            .await
            .into_iter()
            .map(|e| e.data)
            .collect();
        assert_eq!(kept, vec!["e7", "e8", "e9", "e10", "e11"]);
    }

    #[tokio::test]
    async fn read_telemetry_limit_returns_most_recent() {
        let store = EventStore::new(10, 10);
        for i in 0..6 {
            store.append_telemetry(entry("H1", "P1", &format!("e{i}"), 1)).await;
        }
        let recent = store.read_telemetry(&HubId::new("H1"), Some(2)).await;
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].data, "e4");
        assert_eq!(recent[1].data, "e5");

        let oversized = store.read_telemetry(&HubId::new("H1"), Some(100)).await;
        assert_eq!(oversized.len(), 6);
    }

    #[tokio::test]
    async fn stats_track_evictions() {
        let store = EventStore::new(3, 3);
        for size in [10, 20, 30, 40] {
            store.append_telemetry(entry("H1", "P1", "x", size)).await;
        }
        let stats = store.telemetry_stats(&HubId::new("H1")).await;
        assert_eq!(stats.count, 3);
        assert_eq!(stats.total_bytes, 90);

        let (entries, snap_stats) = store.telemetry_snapshot(&HubId::new("H1"), Some(1)).await;
        assert_eq!(entries.len(), 1);
        assert_eq!(snap_stats, stats);
    }

    #[tokio::test]
    async fn unknown_hub_reads_are_empty() {
        let store = EventStore::default();
        let hub = HubId::new("nobody");
        assert!(store.read_telemetry(&hub, None).await.is_empty());
        assert_eq!(store.telemetry_stats(&hub).await, TelemetryStats::default());
        assert!(store.get_health(&hub).await.is_none());
        assert!(store.list_ports(&hub).await.is_empty());
        assert!(store.remove_connection(&hub, &PortId::new("P1")).await.is_none());
    }

    #[tokio::test]
    async fn concurrent_appends_are_neither_lost_nor_duplicated() {
        let store = Arc::new(EventStore::new(10_000, 10));
        let mut handles = Vec::new();
        for sender in 0..8 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                for i in 0..250 {
                    store
                        .append_telemetry(entry("H1", "P1", &format!("{sender}-{i}"), 2))
                        .await;
                }
            }));
        }
        for handle in handles {
            assert!(handle.await.is_ok());
        }

        let entries = store.read_telemetry(&HubId::new("H1"), None).await;
        assert_eq!(entries.len(), 2000);
        let unique: HashSet<&str> = entries.iter().map(|e| e.data.as_str()).collect();
        assert_eq!(unique.len(), 2000);
        assert_eq!(store.telemetry_stats(&HubId::new("H1")).await.total_bytes, 4000);
    }

    #[tokio::test]
    async fn concurrent_appends_respect_cap() {
        let store = Arc::new(EventStore::new(100, 10));
        let mut handles = Vec::new();
        for sender in 0..4 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                for i in 0..100 {
                    store
                        .append_telemetry(entry("H1", "P1", &format!("{sender}-{i}"), 1))
                        .await;
                }
            }));
        }
        for handle in handles {
            assert!(handle.await.is_ok());
        }
        let stats = store.telemetry_stats(&HubId::new("H1")).await;
        assert_eq!(stats.count, 100);
        assert_eq!(stats.total_bytes, 100);
    }

    #[tokio::test]
    async fn health_is_overwritten() {
        let store = EventStore::default();
        let hub = HubId::new("H1");
        for uptime in [1, 2, 3] {
            store
                .set_health(
                    &hub,
                    HealthSnapshot {
                        timestamp: Utc::now(),
                        uptime_seconds: uptime,
                        system: serde_json::json!({}),
                        service: serde_json::json!({}),
                        errors: serde_json::json!({}),
                    },
                )
                .await;
        }
        let Some(health) = store.get_health(&hub).await else {
            panic!("health should be present");
        };
        assert_eq!(health.uptime_seconds, 3);
    }

    #[tokio::test]
    async fn connected_event_creates_port_and_connection() {
        let store = EventStore::default();
        let hub = HubId::new("H1");
        let port = PortId::new("ttyUSB0");
        let info = DeviceInfo {
            port: Some("/dev/ttyUSB0".to_string()),
            manufacturer: Some("Arduino".to_string()),
            baud_rate: Some(9600),
            session_id: Some("sess-9".to_string()),
            ..DeviceInfo::default()
        };
        store
            .record_device_event(
                &hub,
                DeviceEventRecord::new(DeviceEventKind::Connected, port.clone(), Some(info)),
            )
            .await;

        let Some(port_record) = store.get_port(&hub, &port).await else {
            panic!("port should exist");
        };
        assert_eq!(port_record.port, "/dev/ttyUSB0");
        assert_eq!(port_record.manufacturer.as_deref(), Some("Arduino"));

        let Some(conn) = store.get_connection(&hub, &port).await else {
            panic!("connection should exist");
        };
        assert_eq!(conn.baud_rate, 9600);
        assert_eq!(conn.session_id, "sess-9");
        assert_eq!(conn.bytes_read, 0);
        assert_eq!(store.read_device_events(&hub, None).await.len(), 1);
    }

    #[tokio::test]
    async fn connected_event_without_baud_uses_default() {
        let store = EventStore::default();
        let hub = HubId::new("H1");
        let port = PortId::new("P1");
        store
            .record_device_event(
                &hub,
                DeviceEventRecord::new(DeviceEventKind::Connected, port.clone(), None),
            )
            .await;
        let Some(conn) = store.get_connection(&hub, &port).await else {
            panic!("connection should exist");
        };
        assert_eq!(conn.baud_rate, DEFAULT_BAUD_RATE);
    }

    #[tokio::test]
    async fn disconnected_event_removes_connection_but_keeps_port() {
        let store = EventStore::default();
        let hub = HubId::new("H1");
        let port = PortId::new("P1");
        store
            .record_device_event(
                &hub,
                DeviceEventRecord::new(DeviceEventKind::Connected, port.clone(), None),
            )
            .await;
        store
            .record_device_event(
                &hub,
                DeviceEventRecord::new(DeviceEventKind::Disconnected, port.clone(), None),
            )
            .await;
        assert!(store.get_connection(&hub, &port).await.is_none());
        assert!(store.get_port(&hub, &port).await.is_some());
    }

    #[tokio::test]
    async fn port_traffic_creates_then_accumulates() {
        let store = EventStore::default();
        let hub = HubId::new("H1");
        let port = PortId::new("P1");

        assert!(store.record_port_traffic(&hub, &port, "s1", 10).await);
        let Some(first) = store.get_connection(&hub, &port).await else {
            panic!("connection should exist");
        };
        assert_eq!(first.baud_rate, 0);

        assert!(!store.record_port_traffic(&hub, &port, "", 5).await);
        let Some(second) = store.get_connection(&hub, &port).await else {
            panic!("connection should exist");
        };
        assert_eq!(second.bytes_read, 15);
        assert_eq!(second.session_id, "s1");
        assert_eq!(second.connected_at, first.connected_at);
    }

    #[tokio::test]
    async fn repeated_connected_event_preserves_counters() {
        let store = EventStore::default();
        let hub = HubId::new("H1");
        let port = PortId::new("P1");
        store.record_port_traffic(&hub, &port, "s1", 42).await;
        store
            .record_device_event(
                &hub,
                DeviceEventRecord::new(DeviceEventKind::Connected, port.clone(), None),
            )
            .await;
        let Some(conn) = store.get_connection(&hub, &port).await else {
            panic!("connection should exist");
        };
        assert_eq!(conn.bytes_read, 42);
        assert_eq!(store.list_ports(&hub).await.len(), 1);
    }

    #[tokio::test]
    async fn device_event_log_is_bounded() {
        let store = EventStore::new(10, 2);
        let hub = HubId::new("H1");
        for port in ["a", "b", "c"] {
            store
                .record_device_event(
                    &hub,
                    DeviceEventRecord::new(DeviceEventKind::Disconnected, PortId::new(port), None),
                )
                .await;
        }
        let events = store.read_device_events(&hub, None).await;
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].port_id.as_str(), "b");
    }

    #[tokio::test]
    async fn latest_task_status_wins() {
        let store = EventStore::default();
        let hub = HubId::new("H1");
        for status in ["running", "completed"] {
            store
                .set_task_status(
                    &hub,
                    TaskStatusRecord {
                        timestamp: Utc::now(),
                        task_id: "cmd-1".to_string(),
                        status: status.to_string(),
                        progress: None,
                        result: None,
                        error: None,
                    },
                )
                .await;
        }
        let Some(task) = store.get_task_status(&hub, "cmd-1").await else {
            panic!("task should exist");
        };
        assert_eq!(task.status, "completed");
        assert_eq!(store.list_task_statuses(&hub).await.len(), 1);
        assert!(store.get_task_status(&hub, "cmd-2").await.is_none());
    }

    #[tokio::test]
    async fn upsert_connection_replaces_record_for_port() {
        let store = EventStore::default();
        let hub = HubId::new("H1");

        store
            .upsert_connection(&hub, ConnectionRecord::connected(PortId::new("P1"), 9600, "s-1"))
            .await;
        store
            .upsert_connection(&hub, ConnectionRecord::connected(PortId::new("P2"), 57600, "s-2"))
            .await;
        let mut replacement = ConnectionRecord::connected(PortId::new("P1"), 115_200, "s-3");
        replacement.bytes_written = 12;
        store.upsert_connection(&hub, replacement).await;

        let Some(p1) = store.get_connection(&hub, &PortId::new("P1")).await else {
            panic!("P1 connection should exist");
        };
        assert_eq!(p1.baud_rate, 115_200);
        assert_eq!(p1.session_id, "s-3");
        assert_eq!(p1.bytes_written, 12);

        let Some(p2) = store.get_connection(&hub, &PortId::new("P2")).await else {
            panic!("P2 connection should exist");
        };
        assert_eq!(p2.baud_rate, 57600);
        assert_eq!(store.list_connections(&hub).await.len(), 2);
    }
}
