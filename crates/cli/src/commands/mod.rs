//! CLI command implementations.

pub mod migrate;
pub mod user;

use secrecy::SecretString;

/// Errors shared by the CLI commands.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// Neither database variable is set.
    #[error("Missing environment variable: KEYHOLE_DATABASE_URL (or DATABASE_URL)")]
    MissingDatabaseUrl,
}

/// Database URL from `KEYHOLE_DATABASE_URL`, falling back to `DATABASE_URL`.
pub fn database_url() -> Result<SecretString, CommandError> {
    dotenvy::dotenv().ok();

    std::env::var("KEYHOLE_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()
        .filter(|url| !url.trim().is_empty())
        .map(SecretString::from)
        .ok_or(CommandError::MissingDatabaseUrl)
}
