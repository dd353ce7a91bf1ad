/**
 * User Routes
 * Registration with bcrypt-hashed credentials, and a users listing with
 * each user's blogs populated. The stored hash never leaves the database
 * layer in any response.
 */
use axum::{http::StatusCode, response::IntoResponse, Json};
use bcrypt::{hash, DEFAULT_COST};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::db::{self, models::Blog};
use crate::routes::{database_unavailable, ErrorResponse};

/// Minimum length for both usernames and passwords
const MIN_CREDENTIAL_LEN: usize = 3;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for POST /api/users (register)
#[derive(Debug, Deserialize, Serialize)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub name: Option<String>,
    pub password: Option<String>,
}

/// Created user, without the credential hash
#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub name: Option<String>,
}

/// Blog as embedded in the users listing
#[derive(Debug, Serialize, Deserialize)]
pub struct UserBlog {
    pub id: Uuid,
    pub title: String,
    pub author: Option<String>,
    pub url: String,
    pub likes: i32,
}

/// User with owned blogs populated
#[derive(Debug, Serialize, Deserialize)]
pub struct UserWithBlogs {
    pub id: Uuid,
    pub username: String,
    pub name: Option<String>,
    pub blogs: Vec<UserBlog>,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/users - Register a new user
pub async fn create_user(Json(payload): Json<RegisterRequest>) -> impl IntoResponse {
    let username = payload
        .username
        .map(|u| u.trim().to_string())
        .unwrap_or_default();

    if username.len() < MIN_CREDENTIAL_LEN {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: format!(
                    "username must be at least {} characters long",
                    MIN_CREDENTIAL_LEN
                ),
                message: None,
            }),
        )
            .into_response();
    }

    let password = payload.password.unwrap_or_default();
    if password.len() < MIN_CREDENTIAL_LEN {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: format!(
                    "password must be at least {} characters long",
                    MIN_CREDENTIAL_LEN
                ),
                message: None,
            }),
        )
            .into_response();
    }

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return database_unavailable(),
    };

    // Hash password — bcrypt is intentionally CPU-intensive; run it outside
    // the async executor so it doesn't block other in-flight tasks.
    let password_hash = match tokio::task::spawn_blocking(move || hash(&password, DEFAULT_COST))
        .await
    {
        Ok(Ok(h)) => h,
        Ok(Err(e)) => {
            tracing::error!("Failed to hash password: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to process password".to_string(),
                    message: None,
                }),
            )
                .into_response();
        }
        Err(e) => {
            tracing::error!("spawn_blocking panic during hash: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to process password".to_string(),
                    message: None,
                }),
            )
                .into_response();
        }
    };

    match sqlx::query_as::<_, (Uuid, String, Option<String>)>(
        r#"
        INSERT INTO users (username, name, password_hash)
        VALUES ($1, $2, $3)
        RETURNING id, username, name
        "#,
    )
    .bind(&username)
    .bind(&payload.name)
    .bind(&password_hash)
    .fetch_one(pool.as_ref())
    .await
    {
        Ok((id, username, name)) => {
            tracing::info!("User registered: {}", username);
            (
                StatusCode::CREATED,
                Json(UserResponse { id, username, name }),
            )
                .into_response()
        }
        Err(e) => {
            // Unique constraint violation means the username is taken
            if e.to_string().contains("duplicate key") || e.to_string().contains("unique") {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(ErrorResponse {
                        error: "username must be unique".to_string(),
                        message: None,
                    }),
                )
                    .into_response();
            }

            tracing::error!("Failed to create user: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to create user".to_string(),
                    message: None,
                }),
            )
                .into_response()
        }
    }
}

/// GET /api/users - List users with their blogs populated
pub async fn list_users() -> impl IntoResponse {
    let pool = match db::get_pool() {
        Some(p) => p,
        None => return database_unavailable(),
    };

    let users = match sqlx::query_as::<_, (Uuid, String, Option<String>)>(
        "SELECT id, username, name FROM users ORDER BY username",
    )
    .fetch_all(pool.as_ref())
    .await
    {
        Ok(users) => users,
        Err(e) => {
            tracing::error!("Database error listing users: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Database error".to_string(),
                    message: None,
                }),
            )
                .into_response();
        }
    };

    let blogs = match sqlx::query_as::<_, Blog>(
        "SELECT id, title, author, url, likes, user_id, created_at FROM blogs",
    )
    .fetch_all(pool.as_ref())
    .await
    {
        Ok(blogs) => blogs,
        Err(e) => {
            tracing::error!("Database error listing blogs for users: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Database error".to_string(),
                    message: None,
                }),
            )
                .into_response();
        }
    };

    let mut by_owner: HashMap<Uuid, Vec<UserBlog>> = HashMap::new();
    for blog in blogs {
        if let Some(owner) = blog.user_id {
            by_owner.entry(owner).or_default().push(UserBlog {
                id: blog.id,
                title: blog.title,
                author: blog.author,
                url: blog.url,
                likes: blog.likes,
            });
        }
    }

    let response: Vec<UserWithBlogs> = users
        .into_iter()
        .map(|(id, username, name)| UserWithBlogs {
            id,
            username,
            name,
            blogs: by_owner.remove(&id).unwrap_or_default(),
        })
        .collect();

    (StatusCode::OK, Json(response)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;

    fn user_router() -> Router {
        Router::new().route("/api/users", get(list_users).post(create_user))
    }

    async fn post_json(
        app: Router,
        uri: &str,
        json: &impl serde::Serialize,
    ) -> (StatusCode, axum::body::Bytes) {
        let body = Body::from(serde_json::to_vec(json).unwrap());
        let req = Request::post(uri)
            .header("content-type", "application/json")
            .body(body)
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, bytes)
    }

    #[tokio::test]
    async fn test_register_short_username_returns_bad_request() {
        let (status, bytes) = post_json(
            user_router(),
            "/api/users",
            &RegisterRequest {
                username: Some("ab".to_string()),
                name: Some("Short".to_string()),
                password: Some("password111".to_string()),
            },
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(body["error"].as_str().unwrap().contains("username"));
    }

    #[tokio::test]
    async fn test_register_missing_username_returns_bad_request() {
        let (status, _) = post_json(
            user_router(),
            "/api/users",
            &RegisterRequest {
                username: None,
                name: None,
                password: Some("password111".to_string()),
            },
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_register_short_password_returns_bad_request() {
        let (status, bytes) = post_json(
            user_router(),
            "/api/users",
            &RegisterRequest {
                username: Some("root".to_string()),
                name: None,
                password: Some("12".to_string()),
            },
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(body["error"].as_str().unwrap().contains("password"));
    }

    #[tokio::test]
    async fn test_register_without_database_degrades_to_unavailable() {
        let (status, _) = post_json(
            user_router(),
            "/api/users",
            &RegisterRequest {
                username: Some("root".to_string()),
                name: Some("Superuser".to_string()),
                password: Some("password111".to_string()),
            },
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }
}
