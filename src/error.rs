// src/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// Errors produced by the exam lifecycle engine.
///
/// Each variant carries the message shown to the caller; `kind()` is the
/// stable identity of the error and never changes with the wording.
#[derive(Debug, thiserror::Error)]
pub enum ExamError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    InvalidState(String),

    #[error("{0}")]
    Window(String),

    #[error("{0}")]
    DuplicateAttempt(String),

    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),
}

impl ExamError {
    pub fn kind(&self) -> &'static str {
        match self {
            ExamError::Validation(_) => "validation_error",
            ExamError::NotFound(_) => "not_found",
            ExamError::InvalidState(_) => "invalid_state",
            ExamError::Window(_) => "window_error",
            ExamError::DuplicateAttempt(_) => "duplicate_attempt",
            ExamError::Store(_) => "store_error",
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        ExamError::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        ExamError::NotFound(msg.into())
    }
}

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

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict (e.g., duplicate username)
    Conflict(String),

    /// Core errors keep their kind code in the response body.
    Exam(ExamError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for AppError {}

fn exam_status(err: &ExamError) -> StatusCode {
    match err {
        ExamError::Validation(_) => StatusCode::BAD_REQUEST,
        ExamError::NotFound(_) => StatusCode::NOT_FOUND,
        ExamError::Window(_) => StatusCode::FORBIDDEN,
        ExamError::DuplicateAttempt(_) => StatusCode::CONFLICT,
        ExamError::InvalidState(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ExamError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Converts the error into a JSON response with appropriate HTTP status code.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message, code) = match self {
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                    "internal_error",
                )
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, "bad_request"),
            AppError::AuthError(msg) => (StatusCode::UNAUTHORIZED, msg, "unauthorized"),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg, "forbidden"),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, "not_found"),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg, "conflict"),
            AppError::Exam(err) => {
                let status = exam_status(&err);
                let message = match &err {
                    ExamError::Store(e) => {
                        tracing::error!(error = ?e, "store failure");
                        "Internal Server Error".to_string()
                    }
                    other => other.to_string(),
                };
                (status, message, err.kind())
            }
        };
        let body = Json(json!({
            "error": error_message,
            "code": code,
        }));

        (status, body).into_response()
    }
}

impl From<ExamError> for AppError {
    fn from(err: ExamError) -> Self {
        AppError::Exam(err)
    }
}

/// Converts `sqlx::Error` into `AppError::InternalServerError`.
/// Allows using `?` operator on database queries.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::InternalServerError(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::BadRequest(err.to_string())
    }
}
