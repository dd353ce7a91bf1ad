/**
 * Authentication Routes
 * JWT-based login: credential check against stored bcrypt hashes, signed
 * identity tokens carrying the username and user id.
 */
use axum::{
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use bcrypt::verify;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{self, models::User};
use crate::routes::{database_unavailable, ErrorResponse};

// ============================================================================
// Configuration
// ============================================================================

lazy_static::lazy_static! {
    /// JWT secret key from environment
    pub static ref JWT_SECRET: String = std::env::var("JWT_SECRET")
        .unwrap_or_else(|_| "default-jwt-secret-change-in-production".to_string());
}

// ============================================================================
// Types
// ============================================================================

/// JWT Claims structure: the identity embedded in every issued token.
///
/// Tokens are issued without an expiry claim and verification does not
/// require one, so a token stays valid until the signing secret changes.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub username: String,
    pub id: Uuid,
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize, Serialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub username: String,
    pub name: Option<String>,
}

// ============================================================================
// Token Helpers
// ============================================================================

/// Sign a token embedding the given identity
pub fn create_token(username: &str, id: Uuid) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = Claims {
        username: username.to_string(),
        id,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
}

/// Verify a token's signature and decode the identity it carries
pub fn verify_token(token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    // Issued tokens have no `exp` claim; verification must not demand one.
    let mut validation = Validation::default();
    validation.validate_exp = false;
    validation.required_spec_claims.clear();

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(JWT_SECRET.as_bytes()),
        &validation,
    )?;
    Ok(token_data.claims)
}

/// Extract bearer token from Authorization header
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|s| s.to_string())
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/login
/// Authenticate a user and return a signed token
pub async fn login(Json(payload): Json<LoginRequest>) -> impl IntoResponse {
    let username = payload.username.unwrap_or_default();
    let password = payload.password.unwrap_or_default();

    if username.is_empty() || password.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "username and password are required".to_string(),
                message: None,
            }),
        )
            .into_response();
    }

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return database_unavailable(),
    };

    let user = match sqlx::query_as::<_, User>(
        "SELECT id, username, name, password_hash, created_at FROM users WHERE username = $1",
    )
    .bind(&username)
    .fetch_optional(pool.as_ref())
    .await
    {
        Ok(Some(user)) => user,
        Ok(None) => {
            tracing::warn!("Login attempt for unknown user: {}", username);
            return (
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse {
                    error: "invalid username or password".to_string(),
                    message: None,
                }),
            )
                .into_response();
        }
        Err(e) => {
            tracing::error!("Database error during login: {}", e);
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

    // Verify password — bcrypt is CPU-bound; keep the async executor free.
    let hash = user.password_hash.clone();
    let password_ok = tokio::task::spawn_blocking(move || verify(&password, &hash).unwrap_or(false))
        .await
        .unwrap_or(false);

    if !password_ok {
        tracing::warn!("Failed login attempt for: {}", user.username);
        return (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse {
                error: "invalid username or password".to_string(),
                message: None,
            }),
        )
            .into_response();
    }

    let token = match create_token(&user.username, user.id) {
        Ok(token) => token,
        Err(e) => {
            tracing::error!("Failed to create token: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to create token".to_string(),
                    message: None,
                }),
            )
                .into_response();
        }
    };

    tracing::info!("Successful login for user: {}", user.username);

    (
        StatusCode::OK,
        Json(LoginResponse {
            token,
            username: user.username,
            name: user.name,
        }),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use axum::routing::post;
    use axum::Router;
    use tower::ServiceExt;

    fn auth_router() -> Router {
        Router::new().route("/api/login", post(login))
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

    #[test]
    fn test_token_roundtrip_preserves_identity() {
        let id = Uuid::new_v4();
        let token = create_token("root", id).unwrap();
        let claims = verify_token(&token).unwrap();
        assert_eq!(claims.username, "root");
        assert_eq!(claims.id, id);
    }

    #[test]
    fn test_verify_token_invalid_returns_err() {
        let result = verify_token("invalid.jwt.token");
        assert!(result.is_err());
    }

    #[test]
    fn test_verify_token_rejects_tampered_signature() {
        let token = create_token("root", Uuid::new_v4()).unwrap();
        let mut tampered = token[..token.len() - 2].to_string();
        tampered.push_str("xx");
        assert!(verify_token(&tampered).is_err());
    }

    #[tokio::test]
    async fn test_login_empty_username_returns_bad_request() {
        let (status, _) = post_json(
            auth_router(),
            "/api/login",
            &LoginRequest {
                username: Some("".to_string()),
                password: Some("secret".to_string()),
            },
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_login_missing_password_returns_bad_request() {
        let (status, _) = post_json(
            auth_router(),
            "/api/login",
            &LoginRequest {
                username: Some("root".to_string()),
                password: None,
            },
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_login_without_database_degrades_to_unavailable() {
        let (status, _) = post_json(
            auth_router(),
            "/api/login",
            &LoginRequest {
                username: Some("root".to_string()),
                password: Some("secret".to_string()),
            },
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }
}
