//! Database Models - structs representing database rows (used by sqlx/serde).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// User row
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub name: Option<String>,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Blog row
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Blog {
    pub id: Uuid,
    pub title: String,
    pub author: Option<String>,
    pub url: String,
    pub likes: i32,
    pub user_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Blog row joined with its owner's username/name, for populated responses
#[derive(Debug, Clone, FromRow)]
pub struct BlogWithUser {
    pub id: Uuid,
    pub title: String,
    pub author: Option<String>,
    pub url: String,
    pub likes: i32,
    pub user_id: Option<Uuid>,
    pub username: Option<String>,
    pub name: Option<String>,
}
