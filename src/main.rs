//! hub-relay server entry point.
//!
//! Starts the Axum HTTP server with REST and WebSocket endpoints.

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use hub_relay::app::build_app;
use hub_relay::app_state::AppState;
use hub_relay::config::{RelayConfig, log_json_from_env};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing; loading the configuration below already logs
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if log_json_from_env() {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    // Load configuration
    let config = RelayConfig::from_env()
        .map_err(|e| anyhow::anyhow!("{e}"))
        .context("invalid configuration")?;

    tracing::info!(
        addr = %config.listen_addr,
        device_tokens = config.device_tokens.len(),
        "starting hub-relay"
    );

    let app = build_app(AppState::from_config(&config));

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
