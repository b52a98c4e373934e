//! Bearer-token extractor for REST handlers.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use crate::app_state::AppState;
use crate::auth::{Principal, bearer_token};
use crate::error::RelayError;

/// An authenticated REST caller. Rejects with 401 when the
/// `Authorization: Bearer` header is missing or invalid.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub Principal);

impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = RelayError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| RelayError::Unauthorized("missing bearer token".to_string()))?;
        let token = bearer_token(header)
            .ok_or_else(|| RelayError::Unauthorized("malformed authorization header".to_string()))?;
        state
            .client_tokens
            .verify_client_token(token)
            .map(Self)
            .ok_or_else(|| RelayError::Unauthorized("invalid or expired token".to_string()))
    }
}
