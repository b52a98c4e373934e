//! REST endpoint handlers organized by resource.

pub mod commands;
pub mod hubs;
pub mod system;

use axum::Router;

use crate::app_state::AppState;

/// Composes all authenticated resource routes under `/api/hubs`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(hubs::routes())
        .merge(commands::routes())
}
