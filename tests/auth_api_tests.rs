use axum::{
    Json, Router,
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};
use hubcontrol_gateway::{
    HttpAuthApi,
    auth_api::{AuthApi, AuthApiError},
    models::{Module, Role, SignInRequest, SignUpRequest},
};
use serde_json::{Value, json};
use std::time::Duration;
use tokio::net::TcpListener;

// --- Stub Backend ---

const STUB_TOKEN: &str = "stub-access-token";

fn stub_user() -> Value {
    json!({
        "id": "7",
        "email": "vendas@hubcontrol.com",
        "full_name": "Vendedor",
        "role": "vendas",
        "permissions": {
            "modules": ["dashboard", "vendas", "ml_churn", "module_from_the_future"],
            "actions": ["export"],
            "data_access": "sales_data"
        }
    })
}

async fn signin(Json(body): Json<Value>) -> impl IntoResponse {
    if body["password"] == "senha123" {
        (
            StatusCode::OK,
            Json(json!({
                "access_token": STUB_TOKEN,
                "token_type": "bearer",
                "expires_in": 86400,
                "user": stub_user()
            })),
        )
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "detail": "Email ou senha incorretos" })),
        )
    }
}

async fn signup(Json(body): Json<Value>) -> impl IntoResponse {
    if body["email"] == "vendas@hubcontrol.com" {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "detail": "Email já cadastrado" })),
        );
    }

    (
        StatusCode::OK,
        Json(json!({
            "message": "Usuário criado com sucesso",
            "user": {
                "id": "8",
                "email": body["email"],
                "full_name": body["full_name"],
                "role": "cs_cx"
            }
        })),
    )
}

async fn me(headers: HeaderMap) -> impl IntoResponse {
    let expected = format!("Bearer {STUB_TOKEN}");
    let authorized = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        == Some(expected.as_str());

    if authorized {
        (StatusCode::OK, Json(json!({ "user": stub_user() })))
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "detail": "Not authenticated" })),
        )
    }
}

/// Serves a FastAPI-shaped backend on a random port and returns its API base URL.
async fn spawn_backend() -> String {
    let router = Router::new()
        .route("/api/v1/auth/signin", post(signin))
        .route("/api/v1/auth/signup", post(signup))
        .route("/api/v1/auth/me", get(me))
        .route(
            "/api/v1/broken/auth/me",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        )
        .route(
            "/api/v1/slow/auth/me",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(2)).await;
                Json(json!({ "user": stub_user() }))
            }),
        );

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    format!("http://127.0.0.1:{}/api/v1", port)
}

fn client(base_url: &str) -> HttpAuthApi {
    HttpAuthApi::new(base_url, Duration::from_secs(1)).unwrap()
}

// --- Tests ---

#[tokio::test]
async fn test_sign_in_decodes_the_backend_user() {
    let api = client(&spawn_backend().await);

    let auth = api
        .sign_in(&SignInRequest {
            email: "vendas@hubcontrol.com".to_string(),
            password: "senha123".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(auth.access_token, STUB_TOKEN);
    assert_eq!(auth.user.role, Role::Vendas);
    assert!(auth.user.has_module(Module::MlChurn));
    assert!(auth.user.has_action("export"));
    // Modules the gateway does not know are dropped, not rejected.
    assert_eq!(auth.user.permissions.modules.len(), 3);
}

#[tokio::test]
async fn test_sign_in_with_wrong_password_is_unauthorized() {
    let api = client(&spawn_backend().await);

    let result = api
        .sign_in(&SignInRequest {
            email: "vendas@hubcontrol.com".to_string(),
            password: "wrong".to_string(),
        })
        .await;

    assert!(matches!(result, Err(AuthApiError::Unauthorized)));
}

#[tokio::test]
async fn test_sign_up_passes_the_backend_detail_through() {
    let api = client(&spawn_backend().await);

    let result = api
        .sign_up(&SignUpRequest {
            email: "vendas@hubcontrol.com".to_string(),
            password: "senha123".to_string(),
            full_name: "Duplicado".to_string(),
            role: None,
        })
        .await;

    match result {
        Err(AuthApiError::Rejected { status, detail }) => {
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(detail, "Email já cadastrado");
        }
        other => panic!("expected a rejection, got {:?}", other.map(|r| r.message)),
    }
}

#[tokio::test]
async fn test_sign_up_creates_an_account() {
    let api = client(&spawn_backend().await);

    let created = api
        .sign_up(&SignUpRequest {
            email: "novo@hubcontrol.com".to_string(),
            password: "senha123".to_string(),
            full_name: "Novo Usuário".to_string(),
            role: Some("cs_cx".to_string()),
        })
        .await
        .unwrap();

    assert_eq!(created.user.email, "novo@hubcontrol.com");
    assert_eq!(created.user.role, Role::CsCx);
    assert!(created.user.permissions.modules.is_empty());
}

#[tokio::test]
async fn test_me_with_bearer_token() {
    let api = client(&spawn_backend().await);

    let user = api.me(STUB_TOKEN).await.unwrap();
    assert_eq!(user.id, "7");

    assert!(matches!(
        api.me("someone-elses-token").await,
        Err(AuthApiError::Unauthorized)
    ));
}

#[tokio::test]
async fn test_me_server_error_without_detail() {
    let base = spawn_backend().await;
    let api = client(&format!("{base}/broken"));

    match api.me(STUB_TOKEN).await {
        Err(AuthApiError::Rejected { status, detail }) => {
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(detail, "Internal Server Error");
        }
        other => panic!("expected a rejection, got {:?}", other.map(|u| u.id)),
    }
}

#[tokio::test]
async fn test_me_times_out() {
    let base = spawn_backend().await;
    let api = HttpAuthApi::new(&format!("{base}/slow"), Duration::from_millis(200)).unwrap();

    assert!(matches!(api.me(STUB_TOKEN).await, Err(AuthApiError::Timeout)));
}

#[tokio::test]
async fn test_unreachable_backend_is_a_transport_error() {
    // Bind and drop a listener to get a port nobody is serving on.
    let port = TcpListener::bind("127.0.0.1:0")
        .await
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let api = client(&format!("http://127.0.0.1:{port}/api/v1"));

    assert!(matches!(
        api.me(STUB_TOKEN).await,
        Err(AuthApiError::Transport(_))
    ));
}
