//! Authorization header check.
//!
//! Every `/api/v1` request must carry a non-empty `Authorization` header.
//! The value itself is not verified.

use axum::extract::Request;
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::error::ApiError;

pub async fn require_authorization(request: Request, next: Next) -> Response {
    let authorized = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .is_some_and(|value| !value.trim().is_empty());

    if authorized {
        next.run(request).await
    } else {
        ApiError::Unauthorized("missing authorization token".to_string()).into_response()
    }
}
