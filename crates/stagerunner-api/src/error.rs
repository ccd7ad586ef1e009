//! API error handling.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use stagerunner_scheduler::{QueueError, SchedulerError};

/// API error type.
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Unauthorized(String),
    Conflict(String),
    TooManyRequests(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::TooManyRequests(msg) => (StatusCode::TOO_MANY_REQUESTS, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

impl From<stagerunner_core::Error> for ApiError {
    fn from(err: stagerunner_core::Error) -> Self {
        match err {
            stagerunner_core::Error::NotFound(msg) => ApiError::NotFound(msg),
            stagerunner_core::Error::InvalidInput(msg) => ApiError::BadRequest(msg),
            stagerunner_core::Error::Validation(msg) => ApiError::BadRequest(msg),
            stagerunner_core::Error::Conflict(msg) => ApiError::Conflict(msg),
            _ => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<stagerunner_db::DbError> for ApiError {
    fn from(err: stagerunner_db::DbError) -> Self {
        match err {
            stagerunner_db::DbError::NotFound(msg) => ApiError::NotFound(format!("{} not found", msg)),
            stagerunner_db::DbError::Duplicate(msg) => ApiError::Conflict(msg),
            _ => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<SchedulerError> for ApiError {
    fn from(err: SchedulerError) -> Self {
        match err {
            SchedulerError::Queue(
                e @ (QueueError::Full { .. } | QueueError::PipelineQuotaExceeded { .. }),
            ) => ApiError::TooManyRequests(e.to_string()),
            SchedulerError::Store(e) => e.into(),
            _ => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(format!("invalid request payload: {}", rejection.body_text()))
    }
}
