//! User repository interface and its adapters.
//!
//! The authentication core only talks to [`UserRepository`]. Two adapters
//! implement it:
//!
//! - [`postgres::PgUserRepository`] - `keyhole.users` table in `PostgreSQL`
//! - [`memory::MemoryUserRepository`] - process-local map for development
//!   and tests
//!
//! # Migrations
//!
//! Migrations are stored in `crates/web/migrations/` and run via:
//! ```bash
//! cargo run -p keyhole-cli -- migrate
//! ```

pub mod memory;
pub mod postgres;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use keyhole_core::{Email, UserId};

use crate::models::{NewUser, UserRecord};

pub use memory::MemoryUserRepository;
pub use postgres::PgUserRepository;

/// Errors returned by user repositories.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The backing store cannot be reached.
    #[error("repository unavailable: {0}")]
    Unavailable(String),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Whether this is a duplicate-key conflict rather than an infrastructure failure.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

/// Persistent store for user records.
///
/// Implementations must allow concurrent reads and must enforce email
/// uniqueness themselves: a second `create` for an existing email returns
/// [`RepositoryError::Conflict`] and leaves the stored record untouched.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Look up a user by exact email.
    async fn find_by_email(&self, email: &Email) -> Result<Option<UserRecord>, RepositoryError>;

    /// Look up a user by ID.
    async fn find_by_id(&self, id: UserId) -> Result<Option<UserRecord>, RepositoryError>;

    /// Persist a new user and return the stored record.
    async fn create(&self, user: NewUser) -> Result<UserRecord, RepositoryError>;

    /// Check that the backing store is reachable.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
