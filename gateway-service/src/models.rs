//! Data models shared across repositories and handlers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// User model - core identity entity
///
/// `refresh_token` holds the single active renewal credential. Login
/// overwrites it, so only the most recent session can renew its access.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub refresh_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Latest relayed query per (user, conversation)
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ConversationCheckpoint {
    pub user_id: i64,
    pub conversation_id: String,
    pub title: String,
    pub sampled_at: DateTime<Utc>,
}
