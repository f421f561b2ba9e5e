use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints reachable without a session.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for load balancers.
        .route("/health", get(|| async { "ok" }))
        // GET /auth/login?redirect=...&expired=true
        // Login page state after a guard redirect (return path + session-expired notice).
        // POST /auth/login
        // Signs in through the backend, opens the session and sets the `hc_session` cookie.
        .route(
            "/auth/login",
            get(handlers::login_prompt).post(handlers::login),
        )
        // POST /auth/signup
        // Registration, proxied to the backend.
        .route("/auth/signup", post(handlers::signup))
        // POST /auth/logout
        .route("/auth/logout", post(handlers::logout))
        // GET /api/navigation?path=/vendas
        // The route guard decision as JSON. Public on purpose: "not signed in" is one of
        // the answers.
        .route("/api/navigation", get(handlers::resolve_navigation))
}
