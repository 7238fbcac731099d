//! Account management commands.
//!
//! # Usage
//!
//! ```bash
//! echo 'secret1' | keyhole-cli user create -e ann@example.com -n "Ann"
//! ```
//!
//! Accounts go through the same validation and hashing as web registration.
//! The hashing work factor follows `KEYHOLE_HASH_*` when set.

use std::io::BufRead;
use std::sync::Arc;

use secrecy::SecretString;
use thiserror::Error;

use keyhole_web::config::{ConfigError, hash_params_from_env};
use keyhole_web::db::PgUserRepository;
use keyhole_web::services::auth::{
    AuthService, CredentialHasher, HashError, Registration, RegistrationError,
};

use super::{CommandError, database_url};

/// Errors that can occur during account operations.
#[derive(Debug, Error)]
pub enum UserError {
    /// Connection or configuration failure.
    #[error(transparent)]
    Command(#[from] CommandError),

    /// Connection pool error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Work factor rejected.
    #[error("Invalid hashing parameters: {0}")]
    Hash(#[from] HashError),

    /// The account could not be created.
    #[error("{0}")]
    Registration(#[from] RegistrationError),

    /// Reading the password failed.
    #[error("Could not read password from stdin: {0}")]
    Stdin(#[from] std::io::Error),

    /// A `KEYHOLE_HASH_*` variable is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Read a password from the first line of stdin.
///
/// # Errors
///
/// Returns `UserError::Stdin` if stdin cannot be read.
pub fn read_password() -> Result<SecretString, UserError> {
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    let password = line.trim_end_matches(['\r', '\n']).to_owned();
    Ok(SecretString::from(password))
}

/// Create a new account.
///
/// # Arguments
///
/// * `email` - Login email address
/// * `name` - Display name
/// * `password` - Plaintext password (hashed before storage)
///
/// # Returns
///
/// The ID of the created user.
///
/// # Errors
///
/// Returns `UserError::Registration` for invalid input or a taken email.
pub async fn create(email: &str, name: &str, password: SecretString) -> Result<i32, UserError> {
    let database_url = database_url()?;

    tracing::info!("Connecting to database...");
    let pool = keyhole_web::db::create_pool(&database_url).await?;

    let hasher = CredentialHasher::new(hash_params_from_env()?)?;
    let auth = AuthService::new(Arc::new(PgUserRepository::new(pool)), hasher);

    tracing::info!("Creating user: {}", email);
    let user = auth
        .register(Registration {
            name: name.to_owned(),
            email: email.to_owned(),
            password,
        })
        .await?;

    tracing::info!("User created successfully! ID: {}, Email: {}", user.id, user.email);
    Ok(user.id.as_i32())
}
