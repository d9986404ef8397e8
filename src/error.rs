//! Typed errors and HTTP mapping.

use crate::store::StoreError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("duplicate path segment: {0}")]
    DuplicatePathSegment(String),
    #[error("resource {resource}: duplicate field '{field}'")]
    DuplicateField { resource: String, field: String },
    #[error("resource {resource}: field name '{field}' is reserved")]
    ReservedField { resource: String, field: String },
    #[error("resource {resource}: relation '{relation}' targets unknown resource '{target}'")]
    UnknownRelationTarget {
        resource: String,
        relation: String,
        target: String,
    },
    #[error("resource {resource}: relation '{relation}' key '{field}' is not a declared field")]
    UnknownRelationKey {
        resource: String,
        relation: String,
        field: String,
    },
    #[error("config load: {0}")]
    Load(String),
    #[error("config validation: {0}")]
    Validation(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("validation failed: {}", reasons.join("; "))]
    Validation { reasons: Vec<String> },
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("internal: {0}")]
    Internal(String),
    #[error(transparent)]
    Store(#[from] StoreError),
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

/// 4xx responses carry the error message; 5xx responses carry a generic
/// message and the cause is logged server-side only.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match &self {
            AppError::Validation { reasons } => (
                StatusCode::BAD_REQUEST,
                "validation_error",
                self.to_string(),
                Some(serde_json::json!(reasons)),
            ),
            AppError::BadRequest(_) => (
                StatusCode::BAD_REQUEST,
                "bad_request",
                self.to_string(),
                None,
            ),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found", self.to_string(), None),
            AppError::Unauthorized(_) => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                self.to_string(),
                None,
            ),
            AppError::Conflict(_) | AppError::Store(StoreError::Conflict(_)) => {
                (StatusCode::CONFLICT, "conflict", self.to_string(), None)
            }
            AppError::Config(cause) => {
                tracing::error!(error = %cause, "config error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "internal server error".to_string(),
                    None,
                )
            }
            AppError::Internal(cause) => {
                tracing::error!(error = %cause, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "internal server error".to_string(),
                    None,
                )
            }
            AppError::Store(cause) => {
                tracing::error!(error = %cause, "store error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "internal server error".to_string(),
                    None,
                )
            }
        };
        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details,
            },
        };
        (status, Json(body)).into_response()
    }
}
