//! Credential verification collaborators.
//!
//! The relay never issues tokens or checks passwords. It only asks two
//! questions, expressed as traits so tests and deployments can plug in
//! their own answers:
//!
//! - [`DeviceCredentials`]: which hub is this device token bound to?
//! - [`ClientTokenVerifier`]: which principal does this bearer token name?
//!
//! [`StaticDeviceTokens`] and [`JwtVerifier`] are the default
//! implementations wired up by the binary.

use std::collections::HashMap;
use std::fmt;

use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::Deserialize;

use crate::domain::HubId;

/// Resolves a hub device token to the hub id it is bound to.
pub trait DeviceCredentials: Send + Sync + fmt::Debug {
    /// Returns the bound hub id, or `None` for an unknown token.
    fn verify_device_token(&self, token: &str) -> Option<HubId>;
}

/// Resolves a client bearer token to an authenticated principal.
pub trait ClientTokenVerifier: Send + Sync + fmt::Debug {
    /// Returns the principal, or `None` for an invalid or expired token.
    fn verify_client_token(&self, token: &str) -> Option<Principal>;
}

/// An authenticated client identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    /// Principal name (the token subject).
    pub name: String,
}

/// Device tokens held in memory, loaded from configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticDeviceTokens {
    tokens: HashMap<String, HubId>,
}

impl StaticDeviceTokens {
    /// Creates a token map from `(token, hub_id)` pairs.
    #[must_use]
    pub fn new<I, T, H>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (T, H)>,
        T: Into<String>,
        H: Into<HubId>,
    {
        Self {
            tokens: pairs
                .into_iter()
                .map(|(t, h)| (t.into(), h.into()))
                .collect(),
        }
    }

    /// Returns the number of known tokens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Returns `true` if no tokens are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl DeviceCredentials for StaticDeviceTokens {
    fn verify_device_token(&self, token: &str) -> Option<HubId> {
        let hub_id = self.tokens.get(token).cloned();
        if hub_id.is_none() {
            tracing::debug!("device token not recognized");
        }
        hub_id
    }
}

#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
}

/// HS256 JWT verifier. Requires `sub` and an unexpired `exp` claim.
#[derive(Clone)]
pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    /// Creates a verifier for tokens signed with the given shared secret.
    #[must_use]
    pub fn hs256(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub"]);
        Self {
            key: DecodingKey::from_secret(secret),
            validation,
        }
    }
}

impl fmt::Debug for JwtVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtVerifier")
            .field("algorithms", &self.validation.algorithms)
            .finish_non_exhaustive()
    }
}

impl ClientTokenVerifier for JwtVerifier {
    fn verify_client_token(&self, token: &str) -> Option<Principal> {
        match jsonwebtoken::decode::<Claims>(token, &self.key, &self.validation) {
            Ok(data) if !data.claims.sub.is_empty() => Some(Principal {
                name: data.claims.sub,
            }),
            Ok(_) => None,
            Err(e) => {
                tracing::debug!(error = %e, "bearer token rejected");
                None
            }
        }
    }
}

/// Extracts the token from an `Authorization: Bearer <token>` header value.
#[must_use]
pub fn bearer_token(header_value: &str) -> Option<&str> {
    let (scheme, token) = header_value.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use jsonwebtoken::{EncodingKey, Header};
    use serde::Serialize;

    use super::*;

    #[derive(Serialize)]
    struct TestClaims<'a> {
        sub: &'a str,
        exp: i64,
    }

    fn sign(secret: &[u8], sub: &str, exp: i64) -> String {
        jsonwebtoken::encode(
            &Header::default(),
            &TestClaims { sub, exp },
            &EncodingKey::from_secret(secret),
        )
        .unwrap_or_default()
    }

    #[test]
    fn static_tokens_resolve_bound_hub() {
        let tokens = StaticDeviceTokens::new([("tok-1", "H1"), ("tok-2", "H2")]);
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens.verify_device_token("tok-2"), Some(HubId::new("H2")));
        assert_eq!(tokens.verify_device_token("tok-9"), None);
    }

    #[test]
    fn valid_jwt_yields_principal() {
        let verifier = JwtVerifier::hs256(b"secret");
        let exp = chrono::Utc::now().timestamp() + 600;
        let token = sign(b"secret", "admin", exp);
        assert_eq!(
            verifier.verify_client_token(&token),
            Some(Principal {
                name: "admin".to_string()
            })
        );
    }

    #[test]
    fn expired_or_foreign_jwt_is_rejected() {
        let verifier = JwtVerifier::hs256(b"secret");
        let expired = sign(b"secret", "admin", chrono::Utc::now().timestamp() - 3600);
        assert!(verifier.verify_client_token(&expired).is_none());

        let foreign = sign(b"other", "admin", chrono::Utc::now().timestamp() + 600);
        assert!(verifier.verify_client_token(&foreign).is_none());

        assert!(verifier.verify_client_token("not-a-jwt").is_none());
    }

    #[test]
    fn bearer_header_parsing() {
        assert_eq!(bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(bearer_token("bearer   abc "), Some("abc"));
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token("Bearer"), None);
    }

    #[test]
    fn verifier_debug_hides_key() {
        let rendered = format!("{:?}", JwtVerifier::hs256(b"super-secret"));
        assert!(!rendered.contains("super-secret"));
    }
}
