//! REST API layer: route handlers, DTOs, and router composition.
//!
//! Hub resources live under `/api/hubs` and require a bearer token.
//! `/health` and the OpenAPI document are public.

pub mod auth;
pub mod dto;
pub mod handlers;

use axum::Router;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::app_state::AppState;

/// OpenAPI document for the REST surface.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "hub-relay",
        description = "Live telemetry, status history and command dispatch for remote device hubs."
    ),
    paths(
        handlers::system::health_handler,
        handlers::hubs::list_hubs,
        handlers::hubs::get_hub,
        handlers::hubs::get_telemetry,
        handlers::hubs::get_health,
        handlers::hubs::get_ports,
        handlers::hubs::get_connections,
        handlers::hubs::get_device_events,
        handlers::hubs::list_tasks,
        handlers::hubs::get_task,
        handlers::commands::write,
        handlers::commands::flash,
        handlers::commands::restart,
        handlers::commands::close,
    ),
    components(schemas(
        crate::error::ErrorResponse,
        crate::error::ErrorBody,
        handlers::system::HealthResponse,
        dto::HubInfo,
        dto::HubListResponse,
        dto::TelemetryEntryDto,
        dto::TelemetryListResponse,
        dto::HubHealthResponse,
        dto::PortInfo,
        dto::PortListResponse,
        dto::ConnectionInfo,
        dto::ConnectionListResponse,
        dto::DeviceEventDto,
        dto::DeviceEventListResponse,
        dto::TaskStatusResponse,
        dto::TaskListResponse,
        dto::SerialWriteRequest,
        dto::FlashFirmwareRequest,
        dto::RestartDeviceRequest,
        dto::CloseConnectionRequest,
    )),
    modifiers(&BearerAuth),
    tags(
        (name = "System", description = "Service health"),
        (name = "Hubs", description = "Connected hubs and their recorded state"),
        (name = "Commands", description = "Commands forwarded to hubs"),
    )
)]
pub struct ApiDoc;

/// Registers the `bearer` security scheme referenced by protected paths.
#[derive(Debug)]
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Builds the complete API router with all REST endpoints.
pub fn build_router() -> Router<AppState> {
    Router::new()
        .merge(handlers::routes())
        .merge(handlers::system::routes())
        .merge(docs_router())
}

#[cfg(feature = "swagger-ui")]
fn docs_router() -> Router<AppState> {
    use utoipa_swagger_ui::SwaggerUi;

    Router::new().merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

#[cfg(not(feature = "swagger-ui"))]
fn docs_router() -> Router<AppState> {
    use axum::Json;
    use axum::routing::get;

    Router::new().route(
        "/api-docs/openapi.json",
        get(|| async { Json(ApiDoc::openapi()) }),
    )
}
