//! Session-related types.
//!
//! Types carried in or derived from the session for authentication state.

use serde::{Deserialize, Serialize};

use keyhole_core::{DisplayName, UserId};

use super::user::UserRecord;

/// The principal carried forward after authentication.
///
/// Derived from a [`UserRecord`] without its password hash. It is rebuilt from
/// the repository on every request; only the `id` is kept in the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedIdentity {
    /// User's database ID.
    pub id: UserId,
    /// User's display name.
    pub name: DisplayName,
}

impl From<&UserRecord> for AuthenticatedIdentity {
    fn from(record: &UserRecord) -> Self {
        Self {
            id: record.id,
            name: record.name.clone(),
        }
    }
}

impl From<UserRecord> for AuthenticatedIdentity {
    fn from(record: UserRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
        }
    }
}

/// Session keys for authentication data.
pub mod keys {
    /// Key for the authenticated user's ID.
    pub const USER_ID: &str = "auth.user_id";
}
