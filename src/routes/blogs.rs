/**
 * Blog Routes
 * CRUD API endpoints for blogs: listing with the owner populated,
 * token-guarded creation, ownerless partial update, owner-only deletion.
 */
use axum::{
    extract::Path,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{
    self,
    models::{Blog, BlogWithUser},
};
use crate::routes::auth::{extract_bearer_token, verify_token, Claims};
use crate::routes::{database_unavailable, ErrorResponse};

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for POST /api/blogs (create)
#[derive(Debug, Deserialize, Serialize)]
pub struct CreateBlogRequest {
    pub title: Option<String>,
    pub author: Option<String>,
    pub url: Option<String>,
    pub likes: Option<i32>,
}

/// Request body for PUT /api/blogs/:id (partial update, commonly just likes)
#[derive(Debug, Deserialize, Serialize)]
pub struct UpdateBlogRequest {
    pub title: Option<String>,
    pub author: Option<String>,
    pub url: Option<String>,
    pub likes: Option<i32>,
}

/// Owning user as embedded in blog responses
#[derive(Debug, Serialize, Deserialize)]
pub struct BlogUser {
    pub id: Uuid,
    pub username: String,
    pub name: Option<String>,
}

/// Blog response with the owning user populated
#[derive(Debug, Serialize, Deserialize)]
pub struct BlogResponse {
    pub id: Uuid,
    pub title: String,
    pub author: Option<String>,
    pub url: String,
    pub likes: i32,
    pub user: Option<BlogUser>,
}

impl From<BlogWithUser> for BlogResponse {
    fn from(row: BlogWithUser) -> Self {
        let user = row.user_id.map(|id| BlogUser {
            id,
            username: row.username.unwrap_or_default(),
            name: row.name,
        });
        BlogResponse {
            id: row.id,
            title: row.title,
            author: row.author,
            url: row.url,
            likes: row.likes,
            user,
        }
    }
}

// ============================================================================
// Helper: Extract and verify the caller's identity
// ============================================================================

fn authorize(headers: &HeaderMap) -> Result<Claims, (StatusCode, Json<ErrorResponse>)> {
    let token = match extract_bearer_token(headers) {
        Some(t) => t,
        None => {
            return Err((
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse {
                    error: "token missing".to_string(),
                    message: None,
                }),
            ));
        }
    };

    verify_token(&token).map_err(|_| {
        (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse {
                error: "token invalid".to_string(),
                message: None,
            }),
        )
    })
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/blogs - List all blogs with the owning user populated
pub async fn list_blogs() -> impl IntoResponse {
    let pool = match db::get_pool() {
        Some(p) => p,
        None => return database_unavailable(),
    };

    match sqlx::query_as::<_, BlogWithUser>(
        r#"
        SELECT b.id, b.title, b.author, b.url, b.likes, b.user_id, u.username, u.name
        FROM blogs b
        LEFT JOIN users u ON u.id = b.user_id
        ORDER BY b.created_at
        "#,
    )
    .fetch_all(pool.as_ref())
    .await
    {
        Ok(rows) => {
            let blogs: Vec<BlogResponse> = rows.into_iter().map(BlogResponse::from).collect();
            (StatusCode::OK, Json(blogs)).into_response()
        }
        Err(e) => {
            tracing::error!("Database error listing blogs: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Database error".to_string(),
                    message: None,
                }),
            )
                .into_response()
        }
    }
}

/// POST /api/blogs - Create a new blog (auth required, owner set from token)
pub async fn create_blog(
    headers: HeaderMap,
    Json(payload): Json<CreateBlogRequest>,
) -> impl IntoResponse {
    let claims = match authorize(&headers) {
        Ok(claims) => claims,
        Err(err_response) => return err_response.into_response(),
    };

    // Validate required fields
    let title = match payload.title {
        Some(t) if !t.trim().is_empty() => t,
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: "title is required".to_string(),
                    message: None,
                }),
            )
                .into_response();
        }
    };

    let url = match payload.url {
        Some(u) if !u.trim().is_empty() => u,
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: "url is required".to_string(),
                    message: None,
                }),
            )
                .into_response();
        }
    };

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return database_unavailable(),
    };

    let likes = payload.likes.unwrap_or(0);

    match sqlx::query_as::<_, BlogWithUser>(
        r#"
        WITH inserted AS (
            INSERT INTO blogs (title, author, url, likes, user_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, title, author, url, likes, user_id
        )
        SELECT i.id, i.title, i.author, i.url, i.likes, i.user_id, u.username, u.name
        FROM inserted i
        LEFT JOIN users u ON u.id = i.user_id
        "#,
    )
    .bind(&title)
    .bind(&payload.author)
    .bind(&url)
    .bind(likes)
    .bind(claims.id)
    .fetch_one(pool.as_ref())
    .await
    {
        Ok(row) => {
            tracing::info!("Blog created by {}: {}", claims.username, title);
            (StatusCode::CREATED, Json(BlogResponse::from(row))).into_response()
        }
        Err(e) => {
            // Token identity must reference an existing user
            if e.to_string().contains("foreign key") {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(ErrorResponse {
                        error: "user not found".to_string(),
                        message: None,
                    }),
                )
                    .into_response();
            }

            tracing::error!("Database error creating blog: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to create blog".to_string(),
                    message: None,
                }),
            )
                .into_response()
        }
    }
}

/// PUT /api/blogs/:id - Partial update of a blog. No ownership check: any
/// caller may update, which keeps the like button usable without a login.
pub async fn update_blog(
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateBlogRequest>,
) -> impl IntoResponse {
    let pool = match db::get_pool() {
        Some(p) => p,
        None => return database_unavailable(),
    };

    let existing = match sqlx::query_as::<_, Blog>(
        "SELECT id, title, author, url, likes, user_id, created_at FROM blogs WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool.as_ref())
    .await
    {
        Ok(Some(blog)) => blog,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse {
                    error: "blog not found".to_string(),
                    message: None,
                }),
            )
                .into_response();
        }
        Err(e) => {
            tracing::error!("Database error fetching blog: {}", e);
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

    // Apply the partial update over the stored record
    let title = payload.title.unwrap_or(existing.title);
    let author = payload.author.or(existing.author);
    let url = payload.url.unwrap_or(existing.url);
    let likes = payload.likes.unwrap_or(existing.likes);

    match sqlx::query_as::<_, BlogWithUser>(
        r#"
        WITH updated AS (
            UPDATE blogs
            SET title = $1, author = $2, url = $3, likes = $4
            WHERE id = $5
            RETURNING id, title, author, url, likes, user_id
        )
        SELECT u2.id, u2.title, u2.author, u2.url, u2.likes, u2.user_id, u.username, u.name
        FROM updated u2
        LEFT JOIN users u ON u.id = u2.user_id
        "#,
    )
    .bind(&title)
    .bind(&author)
    .bind(&url)
    .bind(likes)
    .bind(id)
    .fetch_one(pool.as_ref())
    .await
    {
        Ok(row) => (StatusCode::OK, Json(BlogResponse::from(row))).into_response(),
        Err(e) => {
            tracing::error!("Database error updating blog: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to update blog".to_string(),
                    message: None,
                }),
            )
                .into_response()
        }
    }
}

/// DELETE /api/blogs/:id - Delete a blog (only its creator may delete it)
pub async fn delete_blog(headers: HeaderMap, Path(id): Path<Uuid>) -> impl IntoResponse {
    let claims = match authorize(&headers) {
        Ok(claims) => claims,
        Err(err_response) => return err_response.into_response(),
    };

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return database_unavailable(),
    };

    let owner: Option<Uuid> = match sqlx::query_as::<_, (Option<Uuid>,)>(
        "SELECT user_id FROM blogs WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool.as_ref())
    .await
    {
        Ok(Some((owner,))) => owner,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse {
                    error: "blog not found".to_string(),
                    message: None,
                }),
            )
                .into_response();
        }
        Err(e) => {
            tracing::error!("Database error fetching blog: {}", e);
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

    if owner != Some(claims.id) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse {
                error: "only the creator of a blog may delete it".to_string(),
                message: None,
            }),
        )
            .into_response();
    }

    match sqlx::query("DELETE FROM blogs WHERE id = $1")
        .bind(id)
        .execute(pool.as_ref())
        .await
    {
        Ok(_) => {
            tracing::info!("Blog {} deleted by {}", id, claims.username);
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => {
            tracing::error!("Database error deleting blog: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to delete blog".to_string(),
                    message: None,
                }),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::auth::create_token;
    use axum::body::Body;
    use axum::http::Request;
    use axum::routing::{get, put};
    use axum::Router;
    use tower::ServiceExt;

    fn blog_router() -> Router {
        Router::new()
            .route("/api/blogs", get(list_blogs).post(create_blog))
            .route("/api/blogs/{id}", put(update_blog).delete(delete_blog))
    }

    async fn send(
        app: Router,
        method: &str,
        uri: &str,
        bearer: Option<&str>,
        json: Option<&impl serde::Serialize>,
    ) -> (StatusCode, axum::body::Bytes) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = bearer {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        let body = match json {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(serde_json::to_vec(json).unwrap())
            }
            None => Body::empty(),
        };
        let res = app.oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, bytes)
    }

    fn new_blog() -> CreateBlogRequest {
        CreateBlogRequest {
            title: Some("a blog".to_string()),
            author: Some("the author".to_string()),
            url: Some("https://www.example.com".to_string()),
            likes: Some(10),
        }
    }

    #[tokio::test]
    async fn test_create_without_token_returns_unauthorized() {
        let (status, bytes) = send(blog_router(), "POST", "/api/blogs", None, Some(&new_blog())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "token missing");
    }

    #[tokio::test]
    async fn test_create_with_garbage_token_returns_unauthorized() {
        let (status, bytes) = send(
            blog_router(),
            "POST",
            "/api/blogs",
            Some("not.a.token"),
            Some(&new_blog()),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "token invalid");
    }

    #[tokio::test]
    async fn test_create_missing_title_returns_bad_request() {
        let token = create_token("root", Uuid::new_v4()).unwrap();
        let payload = CreateBlogRequest {
            title: None,
            ..new_blog()
        };
        let (status, _) = send(
            blog_router(),
            "POST",
            "/api/blogs",
            Some(&token),
            Some(&payload),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_create_blank_url_returns_bad_request() {
        let token = create_token("root", Uuid::new_v4()).unwrap();
        let payload = CreateBlogRequest {
            url: Some("   ".to_string()),
            ..new_blog()
        };
        let (status, _) = send(
            blog_router(),
            "POST",
            "/api/blogs",
            Some(&token),
            Some(&payload),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_delete_without_token_returns_unauthorized() {
        let uri = format!("/api/blogs/{}", Uuid::new_v4());
        let (status, _) = send(blog_router(), "DELETE", &uri, None, None::<&()>).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_delete_with_invalid_token_returns_unauthorized() {
        let uri = format!("/api/blogs/{}", Uuid::new_v4());
        let (status, _) = send(blog_router(), "DELETE", &uri, Some("bogus"), None::<&()>).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_update_malformed_id_returns_bad_request() {
        let payload = UpdateBlogRequest {
            title: None,
            author: None,
            url: None,
            likes: Some(10),
        };
        let (status, _) = send(
            blog_router(),
            "PUT",
            "/api/blogs/not-a-uuid",
            None,
            Some(&payload),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_list_without_database_degrades_to_unavailable() {
        let (status, _) = send(blog_router(), "GET", "/api/blogs", None, None::<&()>).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }
}
