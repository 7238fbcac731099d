//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors from the credential hasher.
#[derive(Debug, Error)]
pub enum HashError {
    /// Work factor rejected by Argon2.
    #[error("invalid hash parameters: {0}")]
    InvalidParams(String),

    /// Hashing itself failed.
    #[error("password hashing error: {0}")]
    Hash(String),
}

/// Errors that can occur while registering an account.
#[derive(Debug, Error)]
pub enum RegistrationError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] keyhole_core::EmailError),

    /// Invalid display name.
    #[error("invalid name: {0}")]
    InvalidName(#[from] keyhole_core::DisplayNameError),

    /// Password too weak or too long.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// An account with this email already exists.
    #[error("email already registered")]
    EmailTaken,

    /// Password hashing failed.
    #[error(transparent)]
    Hash(#[from] HashError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(RepositoryError),
}

impl From<RepositoryError> for RegistrationError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::Conflict(_) => Self::EmailTaken,
            other => Self::Repository(other),
        }
    }
}

impl RegistrationError {
    /// Whether the failure is an infrastructure fault rather than bad input.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Hash(_) | Self::Repository(_))
    }

    /// Message shown on the registration form.
    ///
    /// Internal failures share one generic message.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidEmail(_) => "Please enter a valid email address".to_string(),
            Self::InvalidName(e) => format!("Invalid name: {e}"),
            Self::WeakPassword(msg) => msg.clone(),
            Self::EmailTaken => "Email already registered".to_string(),
            Self::Hash(_) | Self::Repository(_) => "Registration failed".to_string(),
        }
    }
}

/// Errors binding or reading authentication state in the session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The session store rejected the operation.
    #[error("session store error: {0}")]
    Store(#[from] tower_sessions::session::Error),

    /// The request did not pass through the session layer.
    #[error("no session attached to request")]
    MissingLayer,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_maps_to_email_taken() {
        let err = RegistrationError::from(RepositoryError::Conflict("dup".to_string()));
        assert!(matches!(err, RegistrationError::EmailTaken));
        assert!(!err.is_internal());
        assert_eq!(err.user_message(), "Email already registered");
    }

    #[test]
    fn test_internal_errors_hide_detail() {
        let err = RegistrationError::from(RepositoryError::Unavailable(
            "connection refused to 10.0.0.5".to_string(),
        ));
        assert!(err.is_internal());
        assert_eq!(err.user_message(), "Registration failed");

        let err = RegistrationError::from(HashError::Hash("out of memory".to_string()));
        assert!(err.is_internal());
        assert_eq!(err.user_message(), "Registration failed");
    }
}
