use std::convert::Infallible;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{StatusCode, header, request::Parts},
};
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

use crate::{guard::RouteGuard, models::User};

/// Name of the cookie carrying the bearer token for browser navigations.
pub const SESSION_COOKIE: &str = "hc_session";

/// BackendClaims
///
/// The payload the backend signs into its access tokens (HS256). Only `exp` is
/// required; the identity fields are informational, the user is always resolved
/// through the session cache or `/auth/me`.
#[derive(Debug, Serialize, Deserialize)]
pub struct BackendClaims {
    /// Expiration Time (exp): tokens past this instant are refused without a backend call.
    pub exp: usize,
    #[serde(default)]
    pub iat: Option<usize>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

/// TokenVerifier
///
/// Local pre-check of a bearer token. With the backend secret configured, a token whose
/// signature or expiry does not validate is treated as "no session" straight away.
/// Without it, any non-blank token is accepted and the backend is the only judge.
#[derive(Clone)]
pub struct TokenVerifier {
    key: Option<DecodingKey>,
}

impl TokenVerifier {
    pub fn new(secret: Option<&str>) -> Self {
        Self {
            key: secret.map(|secret| DecodingKey::from_secret(secret.as_bytes())),
        }
    }

    /// No secret: presence is all that is checked.
    pub fn presence_only() -> Self {
        Self { key: None }
    }

    pub fn accepts(&self, token: &str) -> bool {
        if token.trim().is_empty() {
            return false;
        }

        match &self.key {
            Some(key) => Self::claims(key, token).is_some(),
            None => true,
        }
    }

    /// The `exp` of a locally validated token. `None` without a secret or for a token
    /// that does not validate.
    pub fn expiry(&self, token: &str) -> Option<DateTime<Utc>> {
        let claims = Self::claims(self.key.as_ref()?, token)?;
        DateTime::from_timestamp(i64::try_from(claims.exp).ok()?, 0)
    }

    fn claims(key: &DecodingKey, token: &str) -> Option<BackendClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        match decode::<BackendClaims>(token, key, &validation) {
            Ok(data) => Some(data.claims),
            Err(e) => {
                tracing::debug!(error = %e, "Bearer token refused by local validation");
                None
            }
        }
    }
}

/// SessionToken Extractor Result
///
/// The bearer token presented by the client, if any. Never rejects: a missing token is
/// a legitimate input to the route guard (it yields a login redirect).
///
/// Lookup order: the `Authorization: Bearer` header (API clients), then the
/// `hc_session` cookie (browser navigations).
#[derive(Debug, Clone, Default)]
pub struct SessionToken(pub Option<String>);

impl SessionToken {
    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

impl<S> FromRequestParts<S> for SessionToken
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let bearer = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty());

        if let Some(token) = bearer {
            return Ok(SessionToken(Some(token.to_string())));
        }

        let cookie = parts
            .headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find_map(|cookies| cookie_value(cookies, SESSION_COOKIE));

        Ok(SessionToken(cookie))
    }
}

/// Picks one cookie out of a `Cookie` header value.
fn cookie_value(cookies: &str, name: &str) -> Option<String> {
    cookies.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == name && !value.is_empty()).then(|| value.to_string())
    })
}

/// `Set-Cookie` value establishing the browser session.
pub fn session_cookie(token: &str) -> String {
    format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax")
}

/// `Set-Cookie` value removing the browser session.
pub fn expired_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

/// AuthUser Extractor Result
///
/// The resolved principal of an API request. Used by the JSON endpoints (`/api/me`,
/// `/api/menu`) that answer 401 instead of redirecting.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

/// AuthUser Extractor Implementation
///
/// 1. Token extraction (`SessionToken`).
/// 2. Local token validation (`TokenVerifier`). A refused token's session is dropped.
/// 3. Principal resolution through the route guard: session cache first, backend
///    `/auth/me` on a miss or an expired session. A failed lookup drops the session.
///
/// Rejection: StatusCode::UNAUTHORIZED (401) on any failure.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RouteGuard: FromRef<S>,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let guard = RouteGuard::from_ref(state);

        let SessionToken(token) = SessionToken::from_request_parts(parts, state)
            .await
            .unwrap_or_default();

        let token = guard
            .accept_token(token.as_deref())
            .await
            .ok_or(StatusCode::UNAUTHORIZED)?;

        guard
            .resolve_principal(token)
            .await
            .map(AuthUser)
            .ok_or(StatusCode::UNAUTHORIZED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_value_finds_the_session_cookie() {
        let header = "theme=dark; hc_session=abc.def.ghi; lang=pt-BR";
        assert_eq!(
            cookie_value(header, SESSION_COOKIE).as_deref(),
            Some("abc.def.ghi")
        );
        assert_eq!(cookie_value("theme=dark", SESSION_COOKIE), None);
        assert_eq!(cookie_value("hc_session=", SESSION_COOKIE), None);
    }

    #[test]
    fn presence_only_verifier_rejects_blank_tokens() {
        let verifier = TokenVerifier::presence_only();
        assert!(verifier.accepts("opaque-token"));
        assert!(!verifier.accepts("   "));
    }
}
