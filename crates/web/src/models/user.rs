//! User domain types.
//!
//! These types represent validated domain objects separate from database row types.

use chrono::{DateTime, Utc};

use keyhole_core::{DisplayName, Email, UserId};

/// A registered account (domain type).
///
/// Owned by the user repository. `password_hash` is the PHC string produced by
/// the credential hasher; the plaintext password never reaches this type.
#[derive(Clone)]
pub struct UserRecord {
    /// Unique user ID.
    pub id: UserId,
    /// Login email address (unique).
    pub email: Email,
    /// Name shown once signed in.
    pub name: DisplayName,
    /// Argon2 PHC hash string.
    pub password_hash: String,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
}

impl std::fmt::Debug for UserRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserRecord")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("name", &self.name)
            .field("password_hash", &"[REDACTED]")
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Candidate account passed to the repository for insertion.
#[derive(Clone)]
pub struct NewUser {
    /// Login email address.
    pub email: Email,
    /// Display name.
    pub name: DisplayName,
    /// Argon2 PHC hash string.
    pub password_hash: String,
}

impl std::fmt::Debug for NewUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewUser")
            .field("email", &self.email)
            .field("name", &self.name)
            .field("password_hash", &"[REDACTED]")
            .finish()
    }
}
