use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::{auth_api::AuthApiError, session::SessionStoreError};

/// ApiError
///
/// Failures of the gateway's own JSON endpoints (login, signup, logout). Navigation
/// never produces one of these: the route guard turns every failure into a redirect.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("E-mail ou senha inválidos")]
    InvalidCredentials,

    #[error("{0}")]
    BackendRejected(String),

    #[error("Serviço de autenticação indisponível")]
    BackendUnavailable(#[source] AuthApiError),

    #[error("Falha ao gravar a sessão")]
    SessionStore(#[from] SessionStoreError),

    #[error("Página não encontrada")]
    NotFound,
}

impl From<AuthApiError> for ApiError {
    fn from(e: AuthApiError) -> Self {
        match e {
            AuthApiError::Unauthorized => ApiError::InvalidCredentials,
            AuthApiError::Rejected { status, detail } if status.is_client_error() => {
                ApiError::BackendRejected(detail)
            }
            other => ApiError::BackendUnavailable(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::BackendRejected(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::BackendUnavailable(e) => {
                tracing::error!(error = %e, "Authentication backend call failed");
                StatusCode::BAD_GATEWAY
            }
            ApiError::SessionStore(e) => {
                tracing::error!(error = %e, "Session store failure");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_client_errors_keep_their_detail() {
        let err = ApiError::from(AuthApiError::Rejected {
            status: StatusCode::BAD_REQUEST,
            detail: "Papel inválido".to_string(),
        });
        assert!(matches!(&err, ApiError::BackendRejected(detail) if detail == "Papel inválido"));
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn backend_server_errors_become_bad_gateway() {
        let err = ApiError::from(AuthApiError::Rejected {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            detail: "boom".to_string(),
        });
        assert_eq!(err.into_response().status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn unauthorized_is_invalid_credentials() {
        let err = ApiError::from(AuthApiError::Unauthorized);
        assert_eq!(err.into_response().status(), StatusCode::UNAUTHORIZED);
    }
}
