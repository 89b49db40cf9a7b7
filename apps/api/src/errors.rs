use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use serde_json::json;
use thiserror::Error;

/// Relay error type.
/// Implements `IntoResponse` so handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Method not allowed")]
    MethodNotAllowed,

    /// Provider answered with a non-success status; relayed as-is.
    #[error("Upstream error (status {status})")]
    Upstream { status: StatusCode, body: Bytes },

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        AppError::Internal(e.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({ "error": { "message": msg } })),
            AppError::MethodNotAllowed => (
                StatusCode::METHOD_NOT_ALLOWED,
                json!({ "error": { "message": "Method not allowed" } }),
            ),
            AppError::Upstream { status, body } => {
                tracing::warn!("Provider returned {status}");
                return (status, [(header::CONTENT_TYPE, "application/json")], body).into_response();
            }
            AppError::Internal(e) => {
                tracing::error!("Relay error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({
                        "error": {
                            "message": "Internal Server Error",
                            "details": e.to_string()
                        }
                    }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
