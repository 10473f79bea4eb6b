/// Database operations for the gateway service
pub mod checkpoints;
pub mod users;

use crate::config::DatabaseSettings;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Create the Postgres connection pool from settings
pub async fn create_pool(settings: &DatabaseSettings) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .acquire_timeout(Duration::from_secs(settings.acquire_timeout))
        .connect(&settings.url)
        .await
}

// Re-export store traits and their Postgres implementations
pub use checkpoints::{CheckpointStore, PgCheckpointStore};
pub use users::{PgUserStore, UserStore};
