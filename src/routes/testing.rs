/**
 * Testing Routes
 * Store reset for end-to-end test runs. The router only mounts this module
 * when the app is created with testing routes enabled; production routing
 * never reaches it.
 */
use axum::{http::StatusCode, response::IntoResponse, Json};

use crate::db;
use crate::routes::{database_unavailable, ErrorResponse};

/// POST /api/testing/reset - Delete every blog and user
pub async fn reset() -> impl IntoResponse {
    let pool = match db::get_pool() {
        Some(p) => p,
        None => return database_unavailable(),
    };

    match db::reset_all(pool.as_ref()).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => {
            tracing::error!("Database error during test reset: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to reset database".to_string(),
                    message: None,
                }),
            )
                .into_response()
        }
    }
}
