/// Conversation checkpoint operations for the gateway service
use crate::error::Result;
use async_trait::async_trait;
use sqlx::PgPool;

/// Storage of per-conversation checkpoints
///
/// A checkpoint records the most recent query a user relayed in a
/// conversation. One row per (user, conversation), overwritten on every
/// relayed query.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Insert or update the checkpoint for (user, conversation)
    async fn upsert(&self, user_id: i64, conversation_id: &str, title: &str) -> Result<()>;
}

/// Postgres-backed `CheckpointStore`
#[derive(Clone)]
pub struct PgCheckpointStore {
    pool: PgPool,
}

impl PgCheckpointStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CheckpointStore for PgCheckpointStore {
    async fn upsert(&self, user_id: i64, conversation_id: &str, title: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO conversation_checkpoints (user_id, conversation_id, title, sampled_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (user_id, conversation_id)
            DO UPDATE SET title = EXCLUDED.title, sampled_at = NOW()
            "#,
        )
        .bind(user_id)
        .bind(conversation_id)
        .bind(title)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
