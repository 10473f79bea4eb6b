/// User database operations for the gateway service
use crate::error::{GatewayError, Result};
use crate::models::User;
use async_trait::async_trait;
use sqlx::PgPool;

/// Storage of users and their renewal credentials
///
/// The gRPC handlers only see this trait, so tests can swap in an
/// in-memory implementation without a running Postgres.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new user. Fails with `AlreadyExists` on a duplicate
    /// username or email.
    async fn create_user(&self, username: &str, email: &str, password_hash: &str) -> Result<User>;

    /// Find user by username
    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Overwrite the user's stored refresh token
    ///
    /// Only one refresh token is stored per user; whichever session wrote
    /// last is the only one that can renew.
    async fn set_refresh_token(&self, user_id: i64, refresh_token: &str) -> Result<()>;

    /// Fetch the user's stored refresh token, if any
    async fn get_refresh_token(&self, user_id: i64) -> Result<Option<String>>;
}

/// Postgres-backed `UserStore`
#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn create_user(&self, username: &str, email: &str, password_hash: &str) -> Result<User> {
        let result = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(user) => Ok(user),
            Err(e) => {
                let unique_violation = e
                    .as_database_error()
                    .map(|db| db.is_unique_violation())
                    .unwrap_or(false);
                if unique_violation {
                    Err(GatewayError::AlreadyExists)
                } else {
                    Err(e.into())
                }
            }
        }
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    async fn set_refresh_token(&self, user_id: i64, refresh_token: &str) -> Result<()> {
        sqlx::query("UPDATE users SET refresh_token = $2, updated_at = NOW() WHERE id = $1")
            .bind(user_id)
            .bind(refresh_token)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn get_refresh_token(&self, user_id: i64) -> Result<Option<String>> {
        let token: Option<Option<String>> =
            sqlx::query_scalar("SELECT refresh_token FROM users WHERE id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(token.flatten())
    }
}
