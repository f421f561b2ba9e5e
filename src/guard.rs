use std::time::Duration;

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;

use crate::{
    auth::TokenVerifier,
    auth_api::AuthApiState,
    models::User,
    policy::{self, RouteRule},
    session::{Session, SessionState},
};

/// GuardOutcome
///
/// The single terminal decision for one navigation attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(tag = "outcome", rename_all = "snake_case")]
#[ts(export)]
pub enum GuardOutcome {
    /// Render the page for this user.
    Allowed { user: User },
    /// Not authenticated. `return_to` is the path originally requested, so login can
    /// send the user back there. `session_expired` is set when a session existed but its
    /// principal could not be resolved (the client shows the "session expired" notice).
    RedirectToLogin {
        return_to: String,
        session_expired: bool,
    },
    /// Authenticated but not authorized: go to the role's landing page.
    RedirectToDefault { target: String },
}

/// RouteGuard
///
/// Gate invoked per navigation attempt. Reads the session cache, falls back to the
/// backend for an unknown token, and asks the access policy.
///
/// Rules are evaluated in order and the first one that fires wins:
/// 1. no valid session token → `RedirectToLogin` (a cached session for a refused token
///    is dropped);
/// 2. token present but the user cannot be resolved → `RedirectToLogin` (session cleared);
/// 3. the policy refuses the route → `RedirectToDefault`;
/// 4. otherwise → `Allowed`.
#[derive(Clone)]
pub struct RouteGuard {
    sessions: SessionState,
    auth_api: AuthApiState,
    tokens: TokenVerifier,
    lookup_timeout: Duration,
    session_ttl: Duration,
}

impl RouteGuard {
    pub fn new(
        sessions: SessionState,
        auth_api: AuthApiState,
        tokens: TokenVerifier,
        lookup_timeout: Duration,
        session_ttl: Duration,
    ) -> Self {
        Self {
            sessions,
            auth_api,
            tokens,
            lookup_timeout,
            session_ttl,
        }
    }

    /// new_session
    ///
    /// A session for a freshly confirmed token. The expiry is, in order of preference:
    /// the lifetime reported by the backend, the token's own `exp`, the configured TTL.
    pub fn new_session(&self, token: &str, user: User, lifetime: Option<Duration>) -> Session {
        let session = Session::new(token, user);
        match (lifetime, self.tokens.expiry(token)) {
            (Some(lifetime), _) => session.with_lifetime(lifetime),
            (None, Some(expires_at)) => session.with_expires_at(expires_at),
            (None, None) => session.with_lifetime(self.session_ttl),
        }
    }

    /// accept_token
    ///
    /// Local validation of the presented token. A refused token's session is removed
    /// from the store.
    pub async fn accept_token<'t>(&self, token: Option<&'t str>) -> Option<&'t str> {
        let token = token.filter(|token| !token.trim().is_empty())?;
        if self.tokens.accepts(token) {
            return Some(token);
        }

        self.forget(token).await;
        None
    }

    /// decide
    ///
    /// The pure decision core over an explicit snapshot of the session. No I/O.
    ///
    /// * `session_valid`: a usable bearer token was presented.
    /// * `user`: the principal resolved for it, `None` when resolution failed.
    pub fn decide(
        session_valid: bool,
        user: Option<&User>,
        rule: &RouteRule<'_>,
        requested_path: &str,
    ) -> GuardOutcome {
        if !session_valid {
            return GuardOutcome::RedirectToLogin {
                return_to: requested_path.to_string(),
                session_expired: false,
            };
        }

        let Some(user) = user else {
            return GuardOutcome::RedirectToLogin {
                return_to: requested_path.to_string(),
                session_expired: true,
            };
        };

        if !policy::can_access(Some(user), rule) {
            return GuardOutcome::RedirectToDefault {
                target: policy::default_landing_path(&user.role).to_string(),
            };
        }

        GuardOutcome::Allowed { user: user.clone() }
    }

    /// check
    ///
    /// Full evaluation of one navigation attempt. Every failure of the backend lookup
    /// (error, 401, timeout) resolves to `RedirectToLogin`; nothing escapes to the caller.
    pub async fn check(
        &self,
        token: Option<&str>,
        rule: &RouteRule<'_>,
        requested_path: &str,
    ) -> GuardOutcome {
        let token = self.accept_token(token).await;

        let outcome = match token {
            None => Self::decide(false, None, rule, requested_path),
            Some(token) => {
                let user = self.resolve_principal(token).await;
                Self::decide(true, user.as_ref(), rule, requested_path)
            }
        };

        tracing::debug!(path = %requested_path, outcome = outcome_label(&outcome), "Route guard decision");
        outcome
    }

    /// resolve_principal
    ///
    /// Session cache hit → cached user. Miss or expired session → `/auth/me`, bounded
    /// by the lookup timeout. A confirmed user is cached; a failed lookup clears the
    /// session so the client is signed out rather than left half-initialised.
    pub async fn resolve_principal(&self, token: &str) -> Option<User> {
        match self.sessions.get(token).await {
            Ok(Some(session)) if !session.is_expired() => return Some(session.user),
            Ok(Some(_)) => {
                tracing::debug!("Cached session expired; revalidating with the backend");
                self.forget(token).await;
            }
            Ok(None) => {}
            Err(e) => tracing::error!(error = %e, "Session store read failed; asking the backend"),
        }

        let lookup = tokio::time::timeout(self.lookup_timeout, self.auth_api.me(token)).await;

        match lookup {
            Ok(Ok(user)) => {
                let session = self.new_session(token, user.clone(), None);
                if let Err(e) = self.sessions.put(session).await {
                    tracing::error!(error = %e, "Failed to cache resolved principal");
                }
                Some(user)
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Principal lookup failed; signing the session out");
                self.forget(token).await;
                None
            }
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.lookup_timeout.as_millis() as u64,
                    "Principal lookup timed out; signing the session out"
                );
                self.forget(token).await;
                None
            }
        }
    }

    async fn forget(&self, token: &str) {
        if let Err(e) = self.sessions.remove(token).await {
            tracing::error!(error = %e, "Failed to clear rejected session");
        }
    }
}

fn outcome_label(outcome: &GuardOutcome) -> &'static str {
    match outcome {
        GuardOutcome::Allowed { .. } => "allowed",
        GuardOutcome::RedirectToLogin { .. } => "redirect_to_login",
        GuardOutcome::RedirectToDefault { .. } => "redirect_to_default",
    }
}
