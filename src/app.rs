//! Top-level router: REST API, hub and client sockets, HTTP middleware.

use axum::Router;
use axum::routing::get;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api;
use crate::app_state::AppState;
use crate::ws::handler::{client_ws_handler, hub_ws_handler};

/// Builds the full application router bound to `state`.
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .merge(api::build_router())
        .route("/hub", get(hub_ws_handler))
        .route("/ws/client", get(client_ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
