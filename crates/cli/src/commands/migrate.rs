//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! keyhole-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `KEYHOLE_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string
//!
//! # Migration Files
//!
//! User table migrations live in `crates/web/migrations/` and are embedded at
//! compile time. The session table belongs to `tower-sessions-sqlx-store`,
//! which creates it in its own `tower_sessions` schema.

use thiserror::Error;
use tower_sessions_sqlx_store::PostgresStore;

use super::{CommandError, database_url};

/// Errors that can occur while migrating.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// Connection or configuration failure.
    #[error(transparent)]
    Command(#[from] CommandError),

    /// Connection pool error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A user table migration failed.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Run the user table migrations, then create the session table.
///
/// # Errors
///
/// Returns `MigrationError` if the database is unreachable or a migration
/// fails.
pub async fn run() -> Result<(), MigrationError> {
    let database_url = database_url()?;

    tracing::info!("Connecting to database...");
    let pool = keyhole_web::db::create_pool(&database_url).await?;

    tracing::info!("Running user migrations...");
    sqlx::migrate!("../web/migrations").run(&pool).await?;

    tracing::info!("Creating session table...");
    PostgresStore::new(pool).migrate().await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
