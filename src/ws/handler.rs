//! Axum WebSocket upgrade handlers.

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::response::IntoResponse;
use serde::Deserialize;

use super::client_connection::run_client_connection;
use super::hub_connection::run_hub_connection;
use crate::app_state::AppState;
use crate::auth::{ClientTokenVerifier, Principal, bearer_token};

/// Query parameters accepted on the client socket.
#[derive(Debug, Default, Deserialize)]
pub struct ClientSocketQuery {
    /// Bearer token, for browsers that cannot set headers on a socket.
    #[serde(default)]
    pub token: Option<String>,
}

/// `GET /hub` — Upgrade a hub connection. Authentication happens in-band.
pub async fn hub_ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| run_hub_connection(socket, state))
}

/// `GET /ws/client` — Upgrade a browser client connection.
///
/// The token comes from the `token` query parameter or an
/// `Authorization: Bearer` header. An invalid token still upgrades, then
/// the socket is closed with 1008.
pub async fn client_ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<ClientSocketQuery>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let header = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(bearer_token);
    let principal = resolve_principal(
        state.client_tokens.as_ref(),
        query.token.as_deref(),
        header,
    );

    ws.on_upgrade(move |socket| run_client_connection(socket, state, principal))
}

/// Verifies the query token first and falls back to the header token, so
/// a stale `?token=` does not hide a valid header.
fn resolve_principal(
    verifier: &dyn ClientTokenVerifier,
    query_token: Option<&str>,
    header_token: Option<&str>,
) -> Option<Principal> {
    query_token
        .and_then(|t| verifier.verify_client_token(t))
        .or_else(|| header_token.and_then(|t| verifier.verify_client_token(t)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct OneToken;

    impl ClientTokenVerifier for OneToken {
        fn verify_client_token(&self, token: &str) -> Option<Principal> {
            (token == "good").then(|| Principal {
                name: "operator".to_string(),
            })
        }
    }

    #[test]
    fn valid_header_wins_over_stale_query_token() {
        let principal = resolve_principal(&OneToken, Some("stale"), Some("good"));
        assert_eq!(principal.map(|p| p.name), Some("operator".to_string()));
    }

    #[test]
    fn query_token_alone_is_enough() {
        assert!(resolve_principal(&OneToken, Some("good"), None).is_some());
        assert!(resolve_principal(&OneToken, None, Some("good")).is_some());
    }

    #[test]
    fn no_valid_token_yields_nothing() {
        assert!(resolve_principal(&OneToken, Some("stale"), Some("bad")).is_none());
        assert!(resolve_principal(&OneToken, None, None).is_none());
    }
}
