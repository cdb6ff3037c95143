#![allow(dead_code)]

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::engine::EngineError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub code: String,
}

#[derive(Debug, Clone)]
pub struct AppError {
    status: StatusCode,
    code: String,
    message: String,
    is_operational: bool,
}

impl AppError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::operational(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::operational(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::operational(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message)
    }

    pub fn profile_not_found(message: impl Into<String>) -> Self {
        Self::operational(StatusCode::NOT_FOUND, "PROFILE_NOT_FOUND", message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::operational(
            StatusCode::SERVICE_UNAVAILABLE,
            "SERVICE_UNAVAILABLE",
            message,
        )
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "INTERNAL_ERROR".to_string(),
            message: message.into(),
            is_operational: false,
        }
    }

    fn operational(
        status: StatusCode,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
            is_operational: true,
        }
    }
}

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Validation(msg) => Self::validation(msg),
            EngineError::ProfileNotFound(user_id) => {
                Self::profile_not_found(format!("no behavior profile for user {user_id}"))
            }
            EngineError::Generation(msg) => Self::operational(
                StatusCode::BAD_GATEWAY,
                "GENERATION_ERROR",
                msg,
            ),
            EngineError::Persistence(msg) => Self::internal(msg),
            EngineError::Aggregation(msg) => Self::internal(msg),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = if self.is_operational {
            self.message
        } else {
            "internal server error".to_string()
        };

        let body = ErrorResponse {
            success: false,
            error: message,
            code: self.code,
        };

        (self.status, Json(body)).into_response()
    }
}

pub fn json_error(
    status: StatusCode,
    code: impl Into<String>,
    message: impl Into<String>,
) -> AppError {
    AppError {
        status,
        code: code.into(),
        message: message.into(),
        is_operational: true,
    }
}
