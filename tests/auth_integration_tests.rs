use axum::{
    extract::FromRequestParts,
    http::{Method, Request, StatusCode, Uri, header, request::Parts},
};
use hubcontrol_gateway::{
    AppConfig, AppState, AuthApiState, MemorySessionStore, MockAuthApi, SessionState,
    auth::{AuthUser, BackendClaims, SessionToken},
    models::{Permissions, Role, User},
    session::Session,
};
use jsonwebtoken::{EncodingKey, Header, encode};
use std::{sync::Arc, time::SystemTime};

// --- Helper Functions ---

const TEST_JWT_SECRET: &str = "test-secret-value-1234567890";

fn create_token(exp_offset: i64) -> String {
    let now = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64;

    let claims = BackendClaims {
        exp: (now + exp_offset) as usize,
        iat: Some(now as usize),
        user_id: Some("1".to_string()),
        email: Some("diretoria@hubcontrol.com".to_string()),
        role: Some("diretoria".to_string()),
    };

    let key = EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes());
    encode(&Header::default(), &claims, &key).unwrap()
}

fn diretoria_user() -> User {
    User {
        id: "1".to_string(),
        email: "diretoria@hubcontrol.com".to_string(),
        full_name: "Diretoria".to_string(),
        role: Role::Diretoria,
        permissions: Permissions::default(),
    }
}

fn create_app_state(auth_api: MockAuthApi, jwt_secret: Option<&str>) -> AppState {
    // 1. Start with a safe default config
    let mut config = AppConfig::default();

    // 2. Override the secret to match the test constant
    config.backend_jwt_secret = jwt_secret.map(str::to_string);

    AppState::new(
        Arc::new(MemorySessionStore::new()) as SessionState,
        Arc::new(auth_api) as AuthApiState,
        config,
    )
}

/// Helper to get the mutable Parts struct from a generated Request
fn get_request_parts(method: Method, uri: Uri) -> Parts {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap();
    let (parts, _) = request.into_parts();
    parts
}

fn with_bearer(parts: &mut Parts, token: &str) {
    parts.headers.insert(
        header::AUTHORIZATION,
        header::HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
    );
}

// --- SessionToken ---

#[tokio::test]
async fn test_session_token_prefers_bearer_header() {
    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    with_bearer(&mut parts, "from-header");
    parts.headers.insert(
        header::COOKIE,
        header::HeaderValue::from_static("hc_session=from-cookie"),
    );

    let SessionToken(token) = SessionToken::from_request_parts(&mut parts, &()).await.unwrap();
    assert_eq!(token.as_deref(), Some("from-header"));
}

#[tokio::test]
async fn test_session_token_falls_back_to_cookie() {
    let mut parts = get_request_parts(Method::GET, "/console/clientes".parse().unwrap());
    parts.headers.insert(
        header::COOKIE,
        header::HeaderValue::from_static("theme=dark; hc_session=from-cookie"),
    );

    let SessionToken(token) = SessionToken::from_request_parts(&mut parts, &()).await.unwrap();
    assert_eq!(token.as_deref(), Some("from-cookie"));
}

#[tokio::test]
async fn test_session_token_absent() {
    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    parts.headers.insert(
        header::AUTHORIZATION,
        header::HeaderValue::from_static("Basic dXNlcjpwYXNz"),
    );

    let SessionToken(token) = SessionToken::from_request_parts(&mut parts, &()).await.unwrap();
    assert!(token.is_none());
}

// --- AuthUser ---

#[tokio::test]
async fn test_auth_success_with_cached_session() {
    let token = create_token(3600);
    let app_state = create_app_state(MockAuthApi::new_failing(), Some(TEST_JWT_SECRET));
    app_state
        .sessions
        .put(Session::new(&token, diretoria_user()))
        .await
        .unwrap();

    let mut parts = get_request_parts(Method::GET, "/api/me".parse().unwrap());
    with_bearer(&mut parts, &token);

    let AuthUser(user) = AuthUser::from_request_parts(&mut parts, &app_state)
        .await
        .expect("cached session resolves");
    assert_eq!(user, diretoria_user());
}

#[tokio::test]
async fn test_auth_success_through_backend_lookup() {
    let token = create_token(3600);
    let backend = MockAuthApi::new().with_token(&token, diretoria_user());
    let app_state = create_app_state(backend, Some(TEST_JWT_SECRET));

    let mut parts = get_request_parts(Method::GET, "/api/me".parse().unwrap());
    with_bearer(&mut parts, &token);

    let auth_user = AuthUser::from_request_parts(&mut parts, &app_state).await;

    assert!(auth_user.is_ok());
    assert_eq!(auth_user.unwrap().0.role, Role::Diretoria);
    assert!(app_state.sessions.get(&token).await.unwrap().is_some());
}

#[tokio::test]
async fn test_auth_failure_with_missing_header() {
    let app_state = create_app_state(MockAuthApi::new(), Some(TEST_JWT_SECRET));

    let mut parts = get_request_parts(Method::GET, "/api/me".parse().unwrap());

    let auth_user = AuthUser::from_request_parts(&mut parts, &app_state).await;

    assert!(auth_user.is_err());
    assert_eq!(auth_user.unwrap_err(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_failure_with_expired_jwt() {
    let token = create_token(-3600);
    let backend = MockAuthApi::new().with_token(&token, diretoria_user());
    let app_state = create_app_state(backend, Some(TEST_JWT_SECRET));
    app_state
        .sessions
        .put(Session::new(&token, diretoria_user()))
        .await
        .unwrap();

    let mut parts = get_request_parts(Method::GET, "/api/me".parse().unwrap());
    with_bearer(&mut parts, &token);

    let auth_user = AuthUser::from_request_parts(&mut parts, &app_state).await;

    assert_eq!(auth_user.unwrap_err(), StatusCode::UNAUTHORIZED);
    assert!(app_state.sessions.get(&token).await.unwrap().is_none());
}

#[tokio::test]
async fn test_opaque_token_accepted_without_secret() {
    let backend = MockAuthApi::new().with_token("opaque", diretoria_user());
    let app_state = create_app_state(backend, None);

    let mut parts = get_request_parts(Method::GET, "/api/menu".parse().unwrap());
    with_bearer(&mut parts, "opaque");

    let auth_user = AuthUser::from_request_parts(&mut parts, &app_state).await;
    assert!(auth_user.is_ok());
}

#[tokio::test]
async fn test_auth_failure_drops_rejected_session() {
    let app_state = create_app_state(MockAuthApi::new(), None);

    let mut parts = get_request_parts(Method::GET, "/api/me".parse().unwrap());
    with_bearer(&mut parts, "revoked");

    let auth_user = AuthUser::from_request_parts(&mut parts, &app_state).await;

    assert_eq!(auth_user.unwrap_err(), StatusCode::UNAUTHORIZED);
    assert!(app_state.sessions.get("revoked").await.unwrap().is_none());
}
