// src/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

use crate::services::RecordsError;

/// Global Application Error Enum.
/// Centralizes error handling and mapping to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    // 500 Internal Server Error
    InternalServerError(String),

    // 400 Bad Request
    BadRequest(String),

    // 401 Unauthorized
    AuthError(String),

    // 403 Forbidden (not the class admin / not the assigned teacher)
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict (e.g., duplicate subject code)
    Conflict(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for AppError {}

/// Implements `IntoResponse` for `AppError`.
/// Converts the error into a JSON response with appropriate HTTP status code.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::AuthError(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
        };
        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Maps engine errors onto HTTP semantics.
impl From<RecordsError> for AppError {
    fn from(err: RecordsError) -> Self {
        let msg = err.to_string();
        match err {
            RecordsError::NotFound { .. }
            | RecordsError::StudentNotInClass { .. }
            | RecordsError::ExamNotInClass { .. } => AppError::NotFound(msg),
            RecordsError::NotClassAdmin { .. }
            | RecordsError::SubjectNotAssignedToCaller { .. }
            | RecordsError::ReadNotPermitted { .. } => AppError::Forbidden(msg),
            RecordsError::Validation(_) | RecordsError::MarksOutOfRange { .. } => {
                AppError::BadRequest(msg)
            }
            RecordsError::Duplicate(_) => AppError::Conflict(msg),
            RecordsError::PropagationFailure(_) | RecordsError::Store(_) => {
                AppError::InternalServerError(msg)
            }
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(err.to_string())
    }
}
