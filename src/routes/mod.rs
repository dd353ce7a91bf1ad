/**
 * Routes Module
 * API route handlers
 */
use axum::{http::StatusCode, response::IntoResponse, response::Response, Json};
use serde::Serialize;

pub mod auth;
pub mod blogs;
pub mod health;
pub mod testing;
pub mod users;

/// Error response body shared by all routes
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// 503 response used by every handler when the pool was never initialized
pub fn database_unavailable() -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(ErrorResponse {
            error: "Database not available".to_string(),
            message: None,
        }),
    )
        .into_response()
}
