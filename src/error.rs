//! Typed errors and HTTP mapping.

use crate::message;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing setting: {0}")]
    Missing(&'static str),
    #[error("invalid setting {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Errors surfaced by every service operation.
///
/// `NotFound`, `Forbidden` and `BadRequest` carry message keys (see [`crate::message`]).
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("not found: {0}")]
    NotFound(&'static str),
    #[error("forbidden: {0}")]
    Forbidden(&'static str),
    #[error("bad request: {0}")]
    BadRequest(&'static str),
    #[error("validation: {0}")]
    Validation(String),
    #[error("unauthenticated: {0}")]
    Unauthenticated(&'static str),
    #[error("connection to tenant database '{database}' failed")]
    ConnectionFailed {
        database: String,
        #[source]
        source: sqlx::Error,
    },
    #[error("unavailable: {0}")]
    Unavailable(String),
    #[error("storage error during {operation} in {method}")]
    Storage {
        operation: &'static str,
        method: &'static str,
        #[source]
        source: sqlx::Error,
    },
    #[error("rollback failed in {method}")]
    Rollback {
        method: &'static str,
        #[source]
        source: sqlx::Error,
    },
}

impl AppError {
    /// Short machine-readable code used in the response envelope.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Config(_) => "config_error",
            AppError::NotFound(_) => "not_found",
            AppError::Forbidden(_) => "forbidden",
            AppError::BadRequest(_) => "bad_request",
            AppError::Validation(_) => "validation_error",
            AppError::Unauthenticated(_) => "unauthenticated",
            AppError::ConnectionFailed { .. } => "connection_failed",
            AppError::Unavailable(_) => "unavailable",
            AppError::Storage { .. } | AppError::Rollback { .. } => "internal_error",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AppError::ConnectionFailed { .. } => StatusCode::BAD_GATEWAY,
            AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Config(_) | AppError::Storage { .. } | AppError::Rollback { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Text safe to show to callers. Driver errors never leak past this point.
    pub fn public_message(&self) -> String {
        match self {
            AppError::NotFound(key)
            | AppError::Forbidden(key)
            | AppError::BadRequest(key)
            | AppError::Unauthenticated(key) => message::lookup(key).to_string(),
            AppError::Validation(msg) | AppError::Unavailable(msg) => msg.clone(),
            AppError::ConnectionFailed { .. } => message::lookup("connection.error.failed").to_string(),
            AppError::Config(_) | AppError::Storage { .. } | AppError::Rollback { .. } => {
                message::lookup("general.error.internal").to_string()
            }
        }
    }
}

/// Build a `map_err` adapter that tags a driver error with the failing operation and method.
pub fn storage(operation: &'static str, method: &'static str) -> impl FnOnce(sqlx::Error) -> AppError {
    move |source| AppError::Storage {
        operation,
        method,
        source,
    }
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, source = ?std::error::Error::source(&self), "request failed");
        }
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code().to_string(),
                message: self.public_message(),
                details: None,
            },
        };
        (status, Json(body)).into_response()
    }
}
