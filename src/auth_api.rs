use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, de::DeserializeOwned};
use thiserror::Error;

use crate::models::{
    BackendAuthResponse, MeResponse, SignInRequest, SignUpRequest, SignUpResponse, User,
};

/// AuthApiError
///
/// Failures talking to the external authentication backend. The route guard treats all
/// of them as "principal unresolvable"; the login handlers map them to HTTP statuses.
#[derive(Debug, Error)]
pub enum AuthApiError {
    /// The backend refused the credentials or the bearer token (HTTP 401).
    #[error("backend rejected the credentials or token")]
    Unauthorized,
    /// Any other non-success answer, with the backend's `detail` message when present.
    #[error("backend answered {status}: {detail}")]
    Rejected { status: StatusCode, detail: String },
    #[error("backend unreachable: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("backend sent an unreadable body: {0}")]
    Decode(#[source] reqwest::Error),
    #[error("backend did not answer in time")]
    Timeout,
}

/// FastAPI-style error body: `{"detail": "..."}`.
#[derive(Deserialize)]
struct BackendErrorBody {
    detail: Option<String>,
}

// 1. AuthApi Contract
/// AuthApi
///
/// The slice of the backend authentication API the gateway consumes. Swappable so the
/// guard and handlers can be exercised without a running backend.
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// `POST /auth/signin`
    async fn sign_in(&self, credentials: &SignInRequest) -> Result<BackendAuthResponse, AuthApiError>;

    /// `POST /auth/signup`
    async fn sign_up(&self, registration: &SignUpRequest) -> Result<SignUpResponse, AuthApiError>;

    /// `GET /auth/me` with the given bearer token.
    async fn me(&self, token: &str) -> Result<User, AuthApiError>;
}

/// AuthApiState
///
/// The concrete type used to share the backend client across the application state.
pub type AuthApiState = Arc<dyn AuthApi>;

// 2. The Real Implementation (HTTP)
/// HttpAuthApi
///
/// Talks to the backend over HTTP with a shared `reqwest::Client`. `base_url` already
/// contains the API prefix (e.g. `http://localhost:8005/api/v1`).
#[derive(Clone)]
pub struct HttpAuthApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAuthApi {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, AuthApiError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(AuthApiError::Transport)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Turns a backend response into the decoded body or the matching `AuthApiError`.
    async fn read<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, AuthApiError> {
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            return Err(AuthApiError::Unauthorized);
        }

        if !status.is_success() {
            let detail = response
                .json::<BackendErrorBody>()
                .await
                .ok()
                .and_then(|body| body.detail)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("error").to_string());
            return Err(AuthApiError::Rejected { status, detail });
        }

        response.json::<T>().await.map_err(AuthApiError::Decode)
    }
}

fn transport_error(e: reqwest::Error) -> AuthApiError {
    if e.is_timeout() {
        AuthApiError::Timeout
    } else {
        AuthApiError::Transport(e)
    }
}

#[async_trait]
impl AuthApi for HttpAuthApi {
    async fn sign_in(&self, credentials: &SignInRequest) -> Result<BackendAuthResponse, AuthApiError> {
        let response = self
            .client
            .post(self.url("/auth/signin"))
            .json(credentials)
            .send()
            .await
            .map_err(transport_error)?;

        Self::read(response).await
    }

    async fn sign_up(&self, registration: &SignUpRequest) -> Result<SignUpResponse, AuthApiError> {
        let response = self
            .client
            .post(self.url("/auth/signup"))
            .json(registration)
            .send()
            .await
            .map_err(transport_error)?;

        Self::read(response).await
    }

    async fn me(&self, token: &str) -> Result<User, AuthApiError> {
        let response = self
            .client
            .get(self.url("/auth/me"))
            .bearer_auth(token)
            .send()
            .await
            .map_err(transport_error)?;

        Self::read::<MeResponse>(response).await.map(|me| me.user)
    }
}

// 3. The Mock Implementation (For Tests)
/// MockAuthApi
///
/// An in-memory backend: a fixed set of accounts and of tokens it recognises.
/// Sign-in hands out `token-<email>` tokens for known accounts.
#[derive(Clone, Default)]
pub struct MockAuthApi {
    /// email → (password, user)
    pub accounts: HashMap<String, (String, User)>,
    /// token → user answered by `me`
    pub tokens: HashMap<String, User>,
    /// When true, `me` fails as if the backend were unreachable.
    pub should_fail: bool,
    /// Delay applied before `me` answers.
    pub me_delay: Option<Duration>,
}

impl MockAuthApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    pub fn with_account(mut self, password: &str, user: User) -> Self {
        self.accounts
            .insert(user.email.clone(), (password.to_string(), user));
        self
    }

    pub fn with_token(mut self, token: &str, user: User) -> Self {
        self.tokens.insert(token.to_string(), user);
        self
    }

    pub fn token_for(email: &str) -> String {
        format!("token-{}", email)
    }
}

#[async_trait]
impl AuthApi for MockAuthApi {
    async fn sign_in(&self, credentials: &SignInRequest) -> Result<BackendAuthResponse, AuthApiError> {
        match self.accounts.get(&credentials.email) {
            Some((password, user)) if *password == credentials.password => Ok(BackendAuthResponse {
                access_token: Self::token_for(&user.email),
                token_type: "bearer".to_string(),
                expires_in: 86_400,
                user: user.clone(),
            }),
            _ => Err(AuthApiError::Unauthorized),
        }
    }

    async fn sign_up(&self, registration: &SignUpRequest) -> Result<SignUpResponse, AuthApiError> {
        if self.accounts.contains_key(&registration.email) {
            return Err(AuthApiError::Rejected {
                status: StatusCode::BAD_REQUEST,
                detail: "Email já cadastrado".to_string(),
            });
        }

        Ok(SignUpResponse {
            message: "Usuário criado com sucesso".to_string(),
            user: User {
                id: format!("mock-{}", registration.email),
                email: registration.email.clone(),
                full_name: registration.full_name.clone(),
                role: registration.role.clone().unwrap_or_else(|| "cs_cx".to_string()).into(),
                permissions: Default::default(),
            },
        })
    }

    async fn me(&self, token: &str) -> Result<User, AuthApiError> {
        if let Some(delay) = self.me_delay {
            tokio::time::sleep(delay).await;
        }

        if self.should_fail {
            return Err(AuthApiError::Rejected {
                status: StatusCode::BAD_GATEWAY,
                detail: "Mock AuthApi Error: Simulation requested".to_string(),
            });
        }

        self.tokens
            .get(token)
            .cloned()
            .ok_or(AuthApiError::Unauthorized)
    }
}
