use axum::{
    Extension, Json,
    extract::{Query, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use utoipa::{IntoParams, ToSchema};

use crate::{
    AppState,
    auth::{AuthUser, SessionToken, expired_session_cookie, session_cookie},
    catalog,
    error::ApiError,
    guard::GuardOutcome,
    models::{LoginResponse, MenuEntry, PageView, SignInRequest, SignUpRequest, SignUpResponse, User},
    policy,
};

/// Notice shown on the login page after a forced sign-out.
pub const SESSION_EXPIRED_NOTICE: &str = "Sessão expirada, faça login novamente.";

// --- Query Structs ---

/// LoginQuery
///
/// Parameters the route guard appends when it sends a browser to the login page.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct LoginQuery {
    /// Console path originally requested; login returns the user there when allowed.
    pub redirect: Option<String>,
    /// Present when the previous session was dropped by the gateway.
    pub expired: Option<bool>,
}

/// NavigationQuery
///
/// The console path a single-page client is about to open.
#[derive(Debug, Deserialize, IntoParams)]
pub struct NavigationQuery {
    pub path: String,
}

/// LoginPrompt
///
/// State of the login page: where to go afterwards and which notice to show.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginPrompt {
    pub redirect: Option<String>,
    pub notice: Option<String>,
}

/// ConsolePage
///
/// Inserted into the request extensions by the console guard for allowed navigations.
#[derive(Debug, Clone)]
pub struct ConsolePage {
    pub path: String,
    pub user: User,
}

// --- Handlers ---

/// login_prompt
///
/// [Public Route] Describes the login page state after a guard redirect.
#[utoipa::path(
    get,
    path = "/auth/login",
    params(LoginQuery),
    responses((status = 200, description = "Login page state", body = LoginPrompt))
)]
pub async fn login_prompt(Query(query): Query<LoginQuery>) -> Json<LoginPrompt> {
    Json(LoginPrompt {
        redirect: query.redirect,
        notice: query
            .expired
            .unwrap_or(false)
            .then(|| SESSION_EXPIRED_NOTICE.to_string()),
    })
}

/// login
///
/// [Public Route] Signs in through the backend and opens a session.
///
/// The session is cached under the backend access token, which is returned in the body
/// (for API clients) and set as the `hc_session` cookie (for browser navigations).
/// `landing_path` honours `?redirect=` only when it names a console route the user may
/// open; anything else falls back to the role's landing page.
#[utoipa::path(
    post,
    path = "/auth/login",
    params(LoginQuery),
    request_body = SignInRequest,
    responses(
        (status = 200, description = "Signed in", body = LoginResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 502, description = "Backend unavailable")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Query(query): Query<LoginQuery>,
    Json(payload): Json<SignInRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let auth = state.auth_api.sign_in(&payload).await?;

    let lifetime = (auth.expires_in > 0).then(|| Duration::from_secs(auth.expires_in));
    state
        .sessions
        .put(state.guard.new_session(&auth.access_token, auth.user.clone(), lifetime))
        .await?;

    tracing::info!(user_id = %auth.user.id, role = %auth.user.role, "User signed in");

    let landing_path = post_login_path(&auth.user, query.redirect.as_deref());
    let cookie = session_cookie(&auth.access_token);

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(LoginResponse {
            access_token: auth.access_token,
            user: auth.user,
            landing_path,
        }),
    ))
}

/// Where to go after login: the requested path (query kept) when it is a known console
/// route the user may open, otherwise the role's landing page.
pub fn post_login_path(user: &User, requested: Option<&str>) -> String {
    requested
        .filter(|requested| requested.starts_with('/'))
        .filter(|requested| {
            catalog::route_for(requested).is_some_and(|rule| policy::can_access(Some(user), rule))
        })
        .map(str::to_string)
        .unwrap_or_else(|| policy::default_landing_path(&user.role).to_string())
}

/// signup
///
/// [Public Route] Registers a new account through the backend. Does not sign in.
#[utoipa::path(
    post,
    path = "/auth/signup",
    request_body = SignUpRequest,
    responses(
        (status = 201, description = "Registered", body = SignUpResponse),
        (status = 400, description = "Rejected by the backend")
    )
)]
pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignUpRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let created = state.auth_api.sign_up(&payload).await?;
    tracing::info!(email = %created.user.email, role = %created.user.role, "Account registered");
    Ok((StatusCode::CREATED, Json(created)))
}

/// logout
///
/// [Public Route] Destroys the session (if any) and clears the cookie. Idempotent.
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses((status = 204, description = "Signed out"))
)]
pub async fn logout(
    State(state): State<AppState>,
    SessionToken(token): SessionToken,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(token) = token {
        if state.sessions.remove(&token).await? {
            tracing::info!("User signed out");
        }
    }

    Ok((
        StatusCode::NO_CONTENT,
        [(header::SET_COOKIE, expired_session_cookie())],
    ))
}

/// get_me
///
/// [Authenticated Route] The user resolved for the presented session.
#[utoipa::path(
    get,
    path = "/api/me",
    responses(
        (status = 200, description = "Current user", body = User),
        (status = 401, description = "No session")
    )
)]
pub async fn get_me(AuthUser(user): AuthUser) -> Json<User> {
    Json(user)
}

/// get_menu
///
/// [Authenticated Route] The side-menu entries visible to the current user, in menu order.
#[utoipa::path(
    get,
    path = "/api/menu",
    responses(
        (status = 200, description = "Visible menu", body = [MenuEntry]),
        (status = 401, description = "No session")
    )
)]
pub async fn get_menu(AuthUser(user): AuthUser) -> Json<Vec<MenuEntry>> {
    Json(policy::visible_menu_entries(Some(&user), catalog::MENU))
}

/// resolve_navigation
///
/// [Public Route] Runs the route guard for a console path and returns the decision
/// instead of redirecting. Lets a single-page client route on the same rules.
#[utoipa::path(
    get,
    path = "/api/navigation",
    params(NavigationQuery),
    responses(
        (status = 200, description = "Guard decision", body = GuardOutcome),
        (status = 404, description = "Unknown console path")
    )
)]
pub async fn resolve_navigation(
    State(state): State<AppState>,
    SessionToken(token): SessionToken,
    Query(query): Query<NavigationQuery>,
) -> Result<Json<GuardOutcome>, ApiError> {
    let rule = catalog::route_for(&query.path).ok_or(ApiError::NotFound)?;
    let outcome = state.guard.check(token.as_deref(), rule, &query.path).await;
    Ok(Json(outcome))
}

/// console_page
///
/// [Guarded Route] Page envelope for an allowed console navigation: user, visible menu,
/// title and, on the console home, the dashboard variant for the user's role.
#[utoipa::path(
    get,
    path = "/console/{path}",
    params(("path" = String, Path, description = "Console path, e.g. `vendas/registro`")),
    responses(
        (status = 200, description = "Page envelope", body = PageView),
        (status = 303, description = "Redirect to login or to the role's landing page"),
        (status = 404, description = "Unknown console path")
    )
)]
pub async fn console_page(Extension(page): Extension<ConsolePage>) -> Json<PageView> {
    let path = catalog::normalize_path(&page.path).to_string();
    let dashboard = matches!(path.as_str(), "/" | "/dashboard")
        .then(|| policy::dashboard_variant(&page.user.role));

    Json(PageView {
        title: catalog::page_title(&path).to_string(),
        role_name: page.user.role.display_name().to_string(),
        console_title: page.user.role.console_title().to_string(),
        menu: policy::visible_menu_entries(Some(&page.user), catalog::MENU),
        dashboard,
        user: page.user,
        path,
    })
}
