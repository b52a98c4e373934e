//! Relay configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`).
//!
//! | Variable                  | Default                  |
//! |---------------------------|--------------------------|
//! | `LISTEN_ADDR`             | `0.0.0.0:8080`           |
//! | `JWT_SECRET`              | development secret       |
//! | `DEVICE_TOKENS`           | two development hubs     |
//! | `TELEMETRY_CAPACITY`      | `1000`                   |
//! | `DEVICE_EVENT_CAPACITY`   | `1000`                   |
//! | `OUTBOUND_QUEUE_CAPACITY` | `256`                    |
//! | `HANDSHAKE_TIMEOUT_SECS`  | `10`                     |
//! | `HUB_IDLE_TIMEOUT_SECS`   | `300`                    |
//! | `LOG_FORMAT`              | text (`json` to switch)  |

use std::net::SocketAddr;
use std::time::Duration;

/// Secret used when `JWT_SECRET` is not set. Never use in production.
const DEV_JWT_SECRET: &str = "dev-secret-change-in-production";

/// Top-level relay configuration.
///
/// Loaded once at startup via [`RelayConfig::from_env`].
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Socket address to bind the HTTP server to.
    pub listen_addr: SocketAddr,

    /// HS256 secret for client bearer tokens.
    pub jwt_secret: String,

    /// `(device_token, hub_id)` pairs accepted from hubs.
    pub device_tokens: Vec<(String, String)>,

    /// Telemetry entries retained per hub.
    pub telemetry_capacity: usize,

    /// Device events retained per hub.
    pub device_event_capacity: usize,

    /// Frames buffered per socket before a client counts as slow.
    pub outbound_queue_capacity: usize,

    /// How long a hub may take to send its handshake.
    pub handshake_timeout: Duration,

    /// How long a hub may stay silent before it is disconnected.
    pub hub_idle_timeout: Duration,

    /// Emit logs as JSON lines.
    pub log_json: bool,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            jwt_secret: DEV_JWT_SECRET.to_string(),
            device_tokens: default_device_tokens(),
            telemetry_capacity: 1000,
            device_event_capacity: 1000,
            outbound_queue_capacity: 256,
            handshake_timeout: Duration::from_secs(10),
            hub_idle_timeout: Duration::from_secs(300),
            log_json: false,
        }
    }
}

impl RelayConfig {
    /// Loads configuration from environment variables.
    ///
    /// Falls back to the [`Default`] values when a variable is not set.
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns an error if `LISTEN_ADDR` is set but cannot be parsed as
    /// a [`SocketAddr`].
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        let listen_addr: SocketAddr = match std::env::var("LISTEN_ADDR") {
            Ok(addr) => addr.parse()?,
            Err(_) => defaults.listen_addr,
        };

        let jwt_secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| {
            tracing::warn!("JWT_SECRET not set, using development secret");
            defaults.jwt_secret.clone()
        });

        let device_tokens = std::env::var("DEVICE_TOKENS")
            .ok()
            .map(|raw| parse_device_tokens(&raw))
            .filter(|tokens| !tokens.is_empty())
            .unwrap_or(defaults.device_tokens);

        Ok(Self {
            listen_addr,
            jwt_secret,
            device_tokens,
            telemetry_capacity: parse_env("TELEMETRY_CAPACITY", defaults.telemetry_capacity),
            device_event_capacity: parse_env(
                "DEVICE_EVENT_CAPACITY",
                defaults.device_event_capacity,
            ),
            outbound_queue_capacity: parse_env(
                "OUTBOUND_QUEUE_CAPACITY",
                defaults.outbound_queue_capacity,
            ),
            handshake_timeout: Duration::from_secs(parse_env("HANDSHAKE_TIMEOUT_SECS", 10)),
            hub_idle_timeout: Duration::from_secs(parse_env("HUB_IDLE_TIMEOUT_SECS", 300)),
            log_json: log_json_from_env(),
        })
    }
}

/// Returns `true` when `LOG_FORMAT=json`.
///
/// The binary reads this before [`RelayConfig::from_env`] so that the
/// subscriber is installed when the rest of the configuration logs.
#[must_use]
pub fn log_json_from_env() -> bool {
    wants_json_logs(std::env::var("LOG_FORMAT").ok().as_deref())
}

fn wants_json_logs(format: Option<&str>) -> bool {
    format.is_some_and(|f| f.trim().eq_ignore_ascii_case("json"))
}

fn default_device_tokens() -> Vec<(String, String)> {
    vec![
        (
            "dev-token-rpi-bridge-01".to_string(),
            "rpi-bridge-01".to_string(),
        ),
        (
            "dev-token-rpi-bridge-02".to_string(),
            "rpi-bridge-02".to_string(),
        ),
    ]
}

/// Parses `token=hub,token=hub`. Malformed entries are skipped.
fn parse_device_tokens(raw: &str) -> Vec<(String, String)> {
    raw.split(',')
        .filter_map(|entry| {
            let (token, hub) = entry.split_once('=')?;
            let (token, hub) = (token.trim(), hub.trim());
            (!token.is_empty() && !hub.is_empty()).then(|| (token.to_string(), hub.to_string()))
        })
        .collect()
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_format_selects_json_case_insensitively() {
        assert!(wants_json_logs(Some("json")));
        assert!(wants_json_logs(Some(" JSON ")));
        assert!(!wants_json_logs(Some("text")));
        assert!(!wants_json_logs(None));
    }

    #[test]
    fn device_tokens_parse_and_skip_malformed() {
        let parsed = parse_device_tokens("a=H1, b = H2 ,broken,=H3,c=");
        assert_eq!(
            parsed,
            vec![
                ("a".to_string(), "H1".to_string()),
                ("b".to_string(), "H2".to_string())
            ]
        );
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = RelayConfig::default();
        assert_eq!(config.listen_addr.port(), 8080);
        assert_eq!(config.telemetry_capacity, 1000);
        assert_eq!(config.outbound_queue_capacity, 256);
        assert_eq!(config.handshake_timeout, Duration::from_secs(10));
        assert_eq!(config.device_tokens.len(), 2);
    }

    #[test]
    fn parse_env_falls_back_on_missing_key() {
        assert_eq!(parse_env("HUB_RELAY_TEST_SURELY_UNSET", 7_u64), 7);
    }
}
