use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Authenticated API Router Module
///
/// JSON endpoints for a signed-in console. Every handler here relies on the `AuthUser`
/// middleware layered above this router, which resolves the session (cache first,
/// backend `/auth/me` on a miss) and rejects with 401 otherwise.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // GET /api/me
        // The current user as cached in the session.
        .route("/api/me", get(handlers::get_me))
        // GET /api/menu
        // Side-menu entries visible to the current user, in menu order.
        .route("/api/menu", get(handlers::get_menu))
}
