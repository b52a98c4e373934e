//! Read-only hub handlers: hubs, telemetry, health, ports, connections,
//! device events, and tasks.
//!
//! Every endpoint except the list returns 404 unless the hub has a live
//! session.

use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};

use crate::api::auth::AuthenticatedUser;
use crate::api::dto::{
    ConnectionInfo, ConnectionListResponse, DeviceEventDto, DeviceEventListResponse,
    HistoryParams, HubHealthResponse, HubInfo, HubListResponse, PortInfo, PortListResponse,
    TaskListResponse, TaskStatusResponse, TelemetryEntryDto, TelemetryListResponse,
};
use crate::app_state::AppState;
use crate::domain::HubId;
use crate::error::{ErrorResponse, RelayError};

/// Returns the hub id if the hub is connected.
async fn connected_hub(state: &AppState, hub_id: String) -> Result<HubId, RelayError> {
    let hub_id = HubId::new(hub_id);
    if state.registry.is_connected(&hub_id).await {
        Ok(hub_id)
    } else {
        Err(RelayError::HubNotFound(hub_id))
    }
}

/// `GET /api/hubs` — List connected hubs.
///
/// # Errors
///
/// Returns [`RelayError::Unauthorized`] without a valid token.
#[utoipa::path(
    get,
    path = "/api/hubs",
    tag = "Hubs",
    summary = "List connected hubs",
    responses(
        (status = 200, description = "Connected hubs", body = HubListResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
    ),
    security(("bearer" = []))
)]
pub async fn list_hubs(
    _user: AuthenticatedUser,
    State(state): State<AppState>,
) -> Result<Json<HubListResponse>, RelayError> {
    let hubs: Vec<HubInfo> = state
        .registry
        .list_hubs()
        .await
        .into_iter()
        .map(HubInfo::from)
        .collect();
    let count = hubs.len();
    Ok(Json(HubListResponse { hubs, count }))
}

/// `GET /api/hubs/{hub_id}` — Hub details.
///
/// # Errors
///
/// Returns [`RelayError::HubNotFound`] if the hub is not connected.
#[utoipa::path(
    get,
    path = "/api/hubs/{hub_id}",
    tag = "Hubs",
    summary = "Get hub details",
    params(("hub_id" = String, Path, description = "Hub identifier")),
    responses(
        (status = 200, description = "Hub details", body = HubInfo),
        (status = 404, description = "Hub not connected", body = ErrorResponse),
    ),
    security(("bearer" = []))
)]
pub async fn get_hub(
    _user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(hub_id): Path<String>,
) -> Result<Json<HubInfo>, RelayError> {
    let hub_id = HubId::new(hub_id);
    state
        .registry
        .get_hub(&hub_id)
        .await
        .map(|summary| Json(HubInfo::from(summary)))
        .ok_or(RelayError::HubNotFound(hub_id))
}

/// `GET /api/hubs/{hub_id}/telemetry` — Recent telemetry.
///
/// # Errors
///
/// Returns [`RelayError::InvalidRequest`] for an out-of-range `limit` and
/// [`RelayError::HubNotFound`] if the hub is not connected.
#[utoipa::path(
    get,
    path = "/api/hubs/{hub_id}/telemetry",
    tag = "Hubs",
    summary = "Get recent telemetry",
    description = "Returns the most recent telemetry frames. `count` and `totalBytes` cover all retained frames regardless of `limit`.",
    params(("hub_id" = String, Path, description = "Hub identifier"), HistoryParams),
    responses(
        (status = 200, description = "Telemetry frames", body = TelemetryListResponse),
        (status = 400, description = "Invalid limit", body = ErrorResponse),
        (status = 404, description = "Hub not connected", body = ErrorResponse),
    ),
    security(("bearer" = []))
)]
pub async fn get_telemetry(
    _user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(hub_id): Path<String>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<TelemetryListResponse>, RelayError> {
    let limit = params.validated().map_err(RelayError::InvalidRequest)?;
    let hub_id = connected_hub(&state, hub_id).await?;
    let (entries, stats) = state.store.telemetry_snapshot(&hub_id, limit).await;
    Ok(Json(TelemetryListResponse {
        hub_id: hub_id.to_string(),
        telemetry: entries.into_iter().map(TelemetryEntryDto::from).collect(),
        count: stats.count,
        total_bytes: stats.total_bytes,
    }))
}

/// `GET /api/hubs/{hub_id}/health` — Latest health report.
///
/// # Errors
///
/// Returns [`RelayError::HubNotFound`] if the hub is not connected and
/// [`RelayError::NotFound`] if it has not reported yet.
#[utoipa::path(
    get,
    path = "/api/hubs/{hub_id}/health",
    tag = "Hubs",
    summary = "Get latest health report",
    params(("hub_id" = String, Path, description = "Hub identifier")),
    responses(
        (status = 200, description = "Health snapshot", body = HubHealthResponse),
        (status = 404, description = "Hub not connected or no report yet", body = ErrorResponse),
    ),
    security(("bearer" = []))
)]
pub async fn get_health(
    _user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(hub_id): Path<String>,
) -> Result<Json<HubHealthResponse>, RelayError> {
    let hub_id = connected_hub(&state, hub_id).await?;
    let snapshot = state
        .store
        .get_health(&hub_id)
        .await
        .ok_or_else(|| RelayError::NotFound(format!("no health report from {hub_id}")))?;
    Ok(Json(HubHealthResponse::new(hub_id.to_string(), snapshot)))
}

/// `GET /api/hubs/{hub_id}/ports` — Known ports.
///
/// # Errors
///
/// Returns [`RelayError::HubNotFound`] if the hub is not connected.
#[utoipa::path(
    get,
    path = "/api/hubs/{hub_id}/ports",
    tag = "Hubs",
    summary = "List known ports",
    params(("hub_id" = String, Path, description = "Hub identifier")),
    responses(
        (status = 200, description = "Ports", body = PortListResponse),
        (status = 404, description = "Hub not connected", body = ErrorResponse),
    ),
    security(("bearer" = []))
)]
pub async fn get_ports(
    _user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(hub_id): Path<String>,
) -> Result<Json<PortListResponse>, RelayError> {
    let hub_id = connected_hub(&state, hub_id).await?;
    let ports: Vec<PortInfo> = state
        .store
        .list_ports(&hub_id)
        .await
        .into_iter()
        .map(PortInfo::from)
        .collect();
    Ok(Json(PortListResponse {
        hub_id: hub_id.to_string(),
        count: ports.len(),
        ports,
    }))
}

/// `GET /api/hubs/{hub_id}/connections` — Open serial connections.
///
/// # Errors
///
/// Returns [`RelayError::HubNotFound`] if the hub is not connected.
#[utoipa::path(
    get,
    path = "/api/hubs/{hub_id}/connections",
    tag = "Hubs",
    summary = "List open serial connections",
    params(("hub_id" = String, Path, description = "Hub identifier")),
    responses(
        (status = 200, description = "Connections", body = ConnectionListResponse),
        (status = 404, description = "Hub not connected", body = ErrorResponse),
    ),
    security(("bearer" = []))
)]
pub async fn get_connections(
    _user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(hub_id): Path<String>,
) -> Result<Json<ConnectionListResponse>, RelayError> {
    let hub_id = connected_hub(&state, hub_id).await?;
    let connections: Vec<ConnectionInfo> = state
        .store
        .list_connections(&hub_id)
        .await
        .into_iter()
        .map(ConnectionInfo::from)
        .collect();
    Ok(Json(ConnectionListResponse {
        hub_id: hub_id.to_string(),
        count: connections.len(),
        connections,
    }))
}

/// `GET /api/hubs/{hub_id}/events` — Recent device events.
///
/// # Errors
///
/// Returns [`RelayError::InvalidRequest`] for an out-of-range `limit` and
/// [`RelayError::HubNotFound`] if the hub is not connected.
#[utoipa::path(
    get,
    path = "/api/hubs/{hub_id}/events",
    tag = "Hubs",
    summary = "List recent device events",
    params(("hub_id" = String, Path, description = "Hub identifier"), HistoryParams),
    responses(
        (status = 200, description = "Device events", body = DeviceEventListResponse),
        (status = 400, description = "Invalid limit", body = ErrorResponse),
        (status = 404, description = "Hub not connected", body = ErrorResponse),
    ),
    security(("bearer" = []))
)]
pub async fn get_device_events(
    _user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(hub_id): Path<String>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<DeviceEventListResponse>, RelayError> {
    let limit = params.validated().map_err(RelayError::InvalidRequest)?;
    let hub_id = connected_hub(&state, hub_id).await?;
    let events: Vec<DeviceEventDto> = state
        .store
        .read_device_events(&hub_id, limit)
        .await
        .into_iter()
        .map(DeviceEventDto::from)
        .collect();
    Ok(Json(DeviceEventListResponse {
        hub_id: hub_id.to_string(),
        count: events.len(),
        events,
    }))
}

/// `GET /api/hubs/{hub_id}/tasks` — Latest status of every task.
///
/// # Errors
///
/// Returns [`RelayError::HubNotFound`] if the hub is not connected.
#[utoipa::path(
    get,
    path = "/api/hubs/{hub_id}/tasks",
    tag = "Hubs",
    summary = "List task statuses",
    params(("hub_id" = String, Path, description = "Hub identifier")),
    responses(
        (status = 200, description = "Task statuses, newest first", body = TaskListResponse),
        (status = 404, description = "Hub not connected", body = ErrorResponse),
    ),
    security(("bearer" = []))
)]
pub async fn list_tasks(
    _user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(hub_id): Path<String>,
) -> Result<Json<TaskListResponse>, RelayError> {
    let hub_id = connected_hub(&state, hub_id).await?;
    let tasks: Vec<TaskStatusResponse> = state
        .store
        .list_task_statuses(&hub_id)
        .await
        .into_iter()
        .map(TaskStatusResponse::from)
        .collect();
    Ok(Json(TaskListResponse {
        hub_id: hub_id.to_string(),
        count: tasks.len(),
        tasks,
    }))
}

/// `GET /api/hubs/{hub_id}/tasks/{task_id}` — Status of one task.
///
/// # Errors
///
/// Returns [`RelayError::HubNotFound`] if the hub is not connected and
/// [`RelayError::NotFound`] for an unknown task.
#[utoipa::path(
    get,
    path = "/api/hubs/{hub_id}/tasks/{task_id}",
    tag = "Hubs",
    summary = "Get task status",
    params(
        ("hub_id" = String, Path, description = "Hub identifier"),
        ("task_id" = String, Path, description = "Task (command) identifier"),
    ),
    responses(
        (status = 200, description = "Task status", body = TaskStatusResponse),
        (status = 404, description = "Hub not connected or task unknown", body = ErrorResponse),
    ),
    security(("bearer" = []))
)]
pub async fn get_task(
    _user: AuthenticatedUser,
    State(state): State<AppState>,
    Path((hub_id, task_id)): Path<(String, String)>,
) -> Result<Json<TaskStatusResponse>, RelayError> {
    let hub_id = connected_hub(&state, hub_id).await?;
    state
        .store
        .get_task_status(&hub_id, &task_id)
        .await
        .map(|record| Json(TaskStatusResponse::from(record)))
        .ok_or_else(|| RelayError::NotFound(format!("task {task_id}")))
}

/// Read-only hub routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/hubs", get(list_hubs))
        .route("/api/hubs/{hub_id}", get(get_hub))
        .route("/api/hubs/{hub_id}/telemetry", get(get_telemetry))
        .route("/api/hubs/{hub_id}/health", get(get_health))
        .route("/api/hubs/{hub_id}/ports", get(get_ports))
        .route("/api/hubs/{hub_id}/connections", get(get_connections))
        .route("/api/hubs/{hub_id}/events", get(get_device_events))
        .route("/api/hubs/{hub_id}/tasks", get(list_tasks))
        .route("/api/hubs/{hub_id}/tasks/{task_id}", get(get_task))
}
