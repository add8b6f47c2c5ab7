use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;

use crate::models::session::SessionStatus;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    Unauthorized(String),
    Forbidden(String),
    Conflict(String),
    BadRequest(String),
    /// The scanned session does not exist.
    SessionNotFound,
    /// The session exists but is not currently ongoing; carries the derived
    /// status so callers can tell "class hasn't started" from "class ended".
    SessionNotActive(SessionStatus),
    /// The submitted secret does not match the session's active token.
    InvalidToken,
    /// The secret matched a token whose TTL has elapsed.
    TokenExpired,
    /// The student is not enrolled in the session's unit.
    NotEnrolled,
    InternalServerError(anyhow::Error),
    Validation(Vec<String>),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message, code, details) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, "NOT_FOUND".to_string(), None),
            AppError::Unauthorized(msg) => (
                StatusCode::UNAUTHORIZED,
                msg,
                "UNAUTHORIZED".to_string(),
                None,
            ),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg, "FORBIDDEN".to_string(), None),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg, "CONFLICT".to_string(), None),
            AppError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                msg,
                "BAD_REQUEST".to_string(),
                None,
            ),
            AppError::SessionNotFound => (
                StatusCode::NOT_FOUND,
                "Session not found".to_string(),
                "SESSION_NOT_FOUND".to_string(),
                None,
            ),
            AppError::SessionNotActive(current) => (
                StatusCode::CONFLICT,
                match current {
                    SessionStatus::Upcoming => "Class has not started yet".to_string(),
                    SessionStatus::Ended => "Class has already ended".to_string(),
                    SessionStatus::Ongoing => "Session is not active".to_string(),
                },
                "SESSION_NOT_ACTIVE".to_string(),
                Some(serde_json::json!({ "current_status": current })),
            ),
            AppError::InvalidToken => (
                StatusCode::BAD_REQUEST,
                "Attendance code is not valid for this session".to_string(),
                "INVALID_TOKEN".to_string(),
                None,
            ),
            AppError::TokenExpired => (
                StatusCode::BAD_REQUEST,
                "Attendance code has expired; ask for a fresh one".to_string(),
                "TOKEN_EXPIRED".to_string(),
                None,
            ),
            AppError::NotEnrolled => (
                StatusCode::FORBIDDEN,
                "You are not enrolled in this unit".to_string(),
                "NOT_ENROLLED".to_string(),
                None,
            ),
            AppError::InternalServerError(err) => {
                tracing::error!("Internal server error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    "INTERNAL_SERVER_ERROR".to_string(),
                    None,
                )
            }
            AppError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                "Validation failed".to_string(),
                "VALIDATION_ERROR".to_string(),
                Some(serde_json::json!({ "errors": errors })),
            ),
        };

        let body = Json(ErrorResponse {
            error: error_message,
            code,
            details,
        });

        (status, body).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalServerError(err)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AppError::NotFound("Resource not found".to_string()),
            _ => AppError::InternalServerError(err.into()),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let messages: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| {
                    let code = e.code.as_ref();
                    format!("{}: {}", field, code)
                })
            })
            .collect();
        AppError::Validation(messages)
    }
}
