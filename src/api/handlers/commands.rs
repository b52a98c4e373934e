//! Command handlers: serial write, firmware flash, restart, close.
//!
//! A successful response only means the command was queued for the hub.
//! Its progress is reported later through `task_status` frames and
//! `GET /api/hubs/{hub_id}/tasks/{task_id}`.

use axum::extract::{Path, State};
use axum::routing::post;
use axum::{Json, Router};

use crate::api::auth::AuthenticatedUser;
use crate::api::dto::{
    CloseConnectionRequest, CommandParts, FlashFirmwareRequest, RestartDeviceRequest,
    SerialWriteRequest, TaskStatusResponse,
};
use crate::app_state::AppState;
use crate::domain::HubId;
use crate::error::{ErrorResponse, RelayError};
use crate::ws::messages::Command;

/// Builds and dispatches a command, returning its pending status.
async fn send_command(
    state: &AppState,
    hub_id: String,
    parts: CommandParts,
) -> Result<Json<TaskStatusResponse>, RelayError> {
    let hub_id = HubId::new(hub_id);
    let command = Command::new(parts.command_type, parts.port_id, parts.params, parts.priority)
        .map_err(RelayError::InvalidRequest)?;
    let command_id = command.command_id.clone();
    state.dispatcher.dispatch(&hub_id, command).await?;
    Ok(Json(TaskStatusResponse::pending(command_id)))
}

/// `POST /api/hubs/{hub_id}/commands/write` — Write to a serial port.
///
/// # Errors
///
/// Returns [`RelayError::HubNotFound`] if the hub is not connected and
/// [`RelayError::DispatchFailed`] if the command could not be queued.
#[utoipa::path(
    post,
    path = "/api/hubs/{hub_id}/commands/write",
    tag = "Commands",
    summary = "Write data to a serial port",
    params(("hub_id" = String, Path, description = "Hub identifier")),
    request_body = SerialWriteRequest,
    responses(
        (status = 200, description = "Command queued", body = TaskStatusResponse),
        (status = 400, description = "Invalid priority", body = ErrorResponse),
        (status = 404, description = "Hub not connected", body = ErrorResponse),
        (status = 500, description = "Failed to send command to hub", body = ErrorResponse),
    ),
    security(("bearer" = []))
)]
pub async fn write(
    _user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(hub_id): Path<String>,
    Json(req): Json<SerialWriteRequest>,
) -> Result<Json<TaskStatusResponse>, RelayError> {
    send_command(&state, hub_id, req.into()).await
}

/// `POST /api/hubs/{hub_id}/commands/flash` — Flash firmware.
///
/// # Errors
///
/// Returns [`RelayError::HubNotFound`] if the hub is not connected and
/// [`RelayError::DispatchFailed`] if the command could not be queued.
#[utoipa::path(
    post,
    path = "/api/hubs/{hub_id}/commands/flash",
    tag = "Commands",
    summary = "Flash firmware onto a device",
    params(("hub_id" = String, Path, description = "Hub identifier")),
    request_body = FlashFirmwareRequest,
    responses(
        (status = 200, description = "Command queued", body = TaskStatusResponse),
        (status = 400, description = "Invalid priority", body = ErrorResponse),
        (status = 404, description = "Hub not connected", body = ErrorResponse),
        (status = 500, description = "Failed to send command to hub", body = ErrorResponse),
    ),
    security(("bearer" = []))
)]
pub async fn flash(
    _user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(hub_id): Path<String>,
    Json(req): Json<FlashFirmwareRequest>,
) -> Result<Json<TaskStatusResponse>, RelayError> {
    send_command(&state, hub_id, req.into()).await
}

/// `POST /api/hubs/{hub_id}/commands/restart` — Restart a device.
///
/// # Errors
///
/// Returns [`RelayError::HubNotFound`] if the hub is not connected and
/// [`RelayError::DispatchFailed`] if the command could not be queued.
#[utoipa::path(
    post,
    path = "/api/hubs/{hub_id}/commands/restart",
    tag = "Commands",
    summary = "Restart a device",
    params(("hub_id" = String, Path, description = "Hub identifier")),
    request_body = RestartDeviceRequest,
    responses(
        (status = 200, description = "Command queued", body = TaskStatusResponse),
        (status = 400, description = "Invalid priority", body = ErrorResponse),
        (status = 404, description = "Hub not connected", body = ErrorResponse),
        (status = 500, description = "Failed to send command to hub", body = ErrorResponse),
    ),
    security(("bearer" = []))
)]
pub async fn restart(
    _user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(hub_id): Path<String>,
    Json(req): Json<RestartDeviceRequest>,
) -> Result<Json<TaskStatusResponse>, RelayError> {
    send_command(&state, hub_id, req.into()).await
}

/// `POST /api/hubs/{hub_id}/commands/close` — Close a serial connection.
///
/// # Errors
///
/// Returns [`RelayError::HubNotFound`] if the hub is not connected and
/// [`RelayError::DispatchFailed`] if the command could not be queued.
#[utoipa::path(
    post,
    path = "/api/hubs/{hub_id}/commands/close",
    tag = "Commands",
    summary = "Close a serial connection",
    params(("hub_id" = String, Path, description = "Hub identifier")),
    request_body = CloseConnectionRequest,
    responses(
        (status = 200, description = "Command queued", body = TaskStatusResponse),
        (status = 400, description = "Invalid priority", body = ErrorResponse),
        (status = 404, description = "Hub not connected", body = ErrorResponse),
        (status = 500, description = "Failed to send command to hub", body = ErrorResponse),
    ),
    security(("bearer" = []))
)]
pub async fn close(
    _user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(hub_id): Path<String>,
    Json(req): Json<CloseConnectionRequest>,
) -> Result<Json<TaskStatusResponse>, RelayError> {
    send_command(&state, hub_id, req.into()).await
}

/// Command routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/hubs/{hub_id}/commands/write", post(write))
        .route("/api/hubs/{hub_id}/commands/flash", post(flash))
        .route("/api/hubs/{hub_id}/commands/restart", post(restart))
        .route("/api/hubs/{hub_id}/commands/close", post(close))
}
