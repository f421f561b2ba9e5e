use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Console Router Module
///
/// The navigable console pages. The whole router is wrapped in the console guard
/// middleware, which looks the path up in the route table and answers:
/// - 404 for a path outside the table;
/// - 303 to `/auth/login?redirect=...` when there is no usable session;
/// - 303 to the role's landing page when the user may not open the page;
/// - otherwise the page envelope rendered by `console_page`.
pub fn console_routes() -> Router<AppState> {
    Router::new()
        // GET /console
        // Console home; the dashboard variant follows the user's role.
        .route("/console", get(handlers::console_page))
        // GET /console/{*path}
        // Any page of the route table, e.g. /console/vendas/registro.
        .route("/console/{*path}", get(handlers::console_page))
}
