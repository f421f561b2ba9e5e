use axum::{
    Router,
    extract::{FromRef, Request, State},
    http::{HeaderName, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Redirect, Response},
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Access vocabulary, compiled-in tables and the pure policy.
pub mod catalog;
pub mod models;
pub mod policy;

// Session handling, the backend client and the route guard built on them.
pub mod auth;
pub mod auth_api;
pub mod config;
pub mod error;
pub mod guard;
pub mod handlers;
pub mod session;

// Module for routing segregation (Public, Api, Console).
pub mod routes;
use auth::{AuthUser, SessionToken};
use guard::{GuardOutcome, RouteGuard};
use handlers::ConsolePage;
use routes::{api, console, public};

// --- Public Re-exports ---

pub use auth_api::{AuthApiState, HttpAuthApi, MockAuthApi};
pub use config::AppConfig;
pub use session::{FileSessionStore, MemorySessionStore, SessionState};

/// ApiDoc
///
/// Aggregates every documented path and schema into the OpenAPI document served at
/// `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::login_prompt, handlers::login, handlers::signup, handlers::logout,
        handlers::get_me, handlers::get_menu, handlers::resolve_navigation,
        handlers::console_page
    ),
    components(
        schemas(
            models::User, models::Permissions, models::Module, models::MenuEntry,
            models::PageView, models::DashboardVariant, models::SignInRequest,
            models::SignUpRequest, models::SignUpResponse, models::LoginResponse,
            guard::GuardOutcome, handlers::LoginPrompt,
        )
    ),
    tags(
        (name = "hubcontrol-gateway", description = "HubControl console access gateway")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single, cloneable container of the gateway's services and configuration,
/// shared across all requests.
#[derive(Clone)]
pub struct AppState {
    /// Session cache keyed by bearer token.
    pub sessions: SessionState,
    /// Client of the backend authentication API.
    pub auth_api: AuthApiState,
    /// Navigation gate over the two above.
    pub guard: RouteGuard,
    /// The loaded, immutable configuration.
    pub config: AppConfig,
}

impl AppState {
    /// Wires the route guard from the session store, the backend client and the config.
    pub fn new(sessions: SessionState, auth_api: AuthApiState, config: AppConfig) -> Self {
        let guard = RouteGuard::new(
            sessions.clone(),
            auth_api.clone(),
            auth::TokenVerifier::new(config.backend_jwt_secret.as_deref()),
            config.principal_lookup_timeout,
            config.session_ttl,
        );

        Self {
            sessions,
            auth_api,
            guard,
            config,
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for SessionState {
    fn from_ref(app_state: &AppState) -> SessionState {
        app_state.sessions.clone()
    }
}

impl FromRef<AppState> for RouteGuard {
    fn from_ref(app_state: &AppState) -> RouteGuard {
        app_state.guard.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Enforces a resolved session for the `/api` routes. `AuthUser` rejects with 401
/// before the handler runs when no principal can be resolved.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// console_guard
///
/// Runs the route guard for every console navigation and turns its outcome into a
/// response. Allowed navigations continue to the handler with a `ConsolePage`
/// extension; the two redirect outcomes answer 303 immediately. A forced sign-out
/// (session expired) also clears the session cookie.
async fn console_guard(
    State(guard): State<RouteGuard>,
    SessionToken(token): SessionToken,
    mut request: Request,
    next: Next,
) -> Response {
    let path = console_path(request.uri().path());

    let Some(rule) = catalog::route_for(&path) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    // The login page returns the user to the page as requested, query included.
    let return_to = match request.uri().query() {
        Some(query) => format!("{path}?{query}"),
        None => path.clone(),
    };

    match guard.check(token.as_deref(), rule, &return_to).await {
        GuardOutcome::Allowed { user } => {
            request.extensions_mut().insert(ConsolePage { path, user });
            next.run(request).await
        }
        GuardOutcome::RedirectToLogin {
            return_to,
            session_expired,
        } => {
            let redirect = Redirect::to(&login_redirect_url(&return_to, session_expired));
            if session_expired {
                tracing::warn!(path = %return_to, "Session expired during navigation");
                return (
                    [(header::SET_COOKIE, auth::expired_session_cookie())],
                    redirect,
                )
                    .into_response();
            }
            redirect.into_response()
        }
        GuardOutcome::RedirectToDefault { target } => {
            Redirect::to(&format!("/console{}", target)).into_response()
        }
    }
}

/// Maps a gateway URI path onto the console path it renders (`/console/vendas` →
/// `/vendas`, `/console` → `/`).
pub fn console_path(uri_path: &str) -> String {
    let rest = uri_path.strip_prefix("/console").unwrap_or(uri_path);
    catalog::normalize_path(rest).to_string()
}

/// The login page URL carrying the path to return to after sign-in.
pub fn login_redirect_url(return_to: &str, session_expired: bool) -> String {
    let mut query = url::form_urlencoded::Serializer::new(String::new());
    query.append_pair("redirect", return_to);
    if session_expired {
        query.append_pair("expired", "true");
    }
    format!("/auth/login?{}", query.finish())
}

/// create_router
///
/// Assembles the routing structure, applies global and scoped middleware and registers
/// the application state.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for Request Correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Base Router Assembly
    let base_router = Router::new()
        // Documentation: Serve the auto-generated Swagger UI.
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Public Routes: No middleware applied.
        .merge(public::public_routes())
        // API Routes: Protected by the `auth_middleware` (401 without a session).
        .merge(
            api::api_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        // Console Routes: Protected by the route guard (redirects, never 401).
        .merge(
            console::console_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                console_guard,
            )),
        )
        // Apply the Unified State to all routes.
        .with_state(state);

    // 3. Observability and Correlation Layers
    base_router
        .layer(
            ServiceBuilder::new()
                // 3a. Request ID Generation.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // 3b. Request Tracing, correlated by the generated request ID.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // 3c. Request ID Propagation back to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 4. CORS Layer
        .layer(cors)
}

/// trace_span_logger
///
/// Builds the per-request tracing span: HTTP method, URI and the `x-request-id`.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn console_path_strips_the_mount_point() {
        assert_eq!(console_path("/console"), "/");
        assert_eq!(console_path("/console/"), "/");
        assert_eq!(console_path("/console/vendas/registro"), "/vendas/registro");
    }

    #[test]
    fn login_redirect_url_encodes_the_return_path() {
        assert_eq!(
            login_redirect_url("/ml/churn", false),
            "/auth/login?redirect=%2Fml%2Fchurn"
        );
        assert_eq!(
            login_redirect_url("/usuarios", true),
            "/auth/login?redirect=%2Fusuarios&expired=true"
        );
        assert_eq!(
            login_redirect_url("/vendas?tab=registro", false),
            "/auth/login?redirect=%2Fvendas%3Ftab%3Dregistro"
        );
    }
}
