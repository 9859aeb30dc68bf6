//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! shop-chat migrate
//! ```
//!
//! # Environment Variables
//!
//! - `CHAT_DATABASE_URL` - `PostgreSQL` connection string
//! - `DATABASE_URL` - Fallback when `CHAT_DATABASE_URL` is unset
//!
//! Migrations live in `crates/server/migrations/`.

use sqlx::PgPool;
use thiserror::Error;

/// Migration failures.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Run the chat server's migrations.
pub async fn run() -> Result<(), MigrationError> {
    let _ = dotenvy::dotenv();

    let database_url = std::env::var("CHAT_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map_err(|_| MigrationError::MissingEnvVar("CHAT_DATABASE_URL"))?;

    tracing::info!("Connecting to chat database...");
    let pool = PgPool::connect(&database_url).await?;

    tracing::info!("Running chat migrations...");
    sqlx::migrate!("../server/migrations").run(&pool).await?;

    tracing::info!("Chat migrations complete!");
    Ok(())
}
