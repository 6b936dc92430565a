//! HTTP-facing error type.
//!
//! `ServiceError` values are mapped onto a small set of status codes with a
//! JSON error body. Internal causes are logged, never echoed to clients.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::services::ServiceError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("bad request: {0}")]
    BadRequest(anyhow::Error),

    #[error("unauthorized: {0}")]
    Unauthorized(anyhow::Error),

    #[error("not found: {0}")]
    NotFound(anyhow::Error),

    #[error("conflict: {0}")]
    Conflict(anyhow::Error),

    #[error("configuration error: {0}")]
    Config(anyhow::Error),

    #[error("internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Unauthenticated => {
                AppError::Unauthorized(anyhow::anyhow!("unauthenticated"))
            }
            ServiceError::NotFound(what) => AppError::NotFound(anyhow::anyhow!("{what} not found")),
            ServiceError::AlreadyExists(what) => {
                AppError::Conflict(anyhow::anyhow!("{what} already exists"))
            }
            ServiceError::Database(e) => AppError::Internal(e),
            ServiceError::Email(e) => AppError::Internal(anyhow::anyhow!(e)),
            ServiceError::Internal(e) => AppError::Internal(e),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: String,
        }

        let (status, message) = match self {
            AppError::BadRequest(e) => (StatusCode::BAD_REQUEST, e.to_string()),
            AppError::Unauthorized(e) => (StatusCode::UNAUTHORIZED, e.to_string()),
            AppError::NotFound(e) => (StatusCode::NOT_FOUND, e.to_string()),
            AppError::Conflict(e) => (StatusCode::CONFLICT, e.to_string()),
            AppError::Config(e) | AppError::Internal(e) => {
                tracing::error!(error = %e, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
