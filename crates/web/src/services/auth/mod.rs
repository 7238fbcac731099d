//! Authentication service.
//!
//! Provides email/password registration and login against a
//! [`UserRepository`].

mod error;
mod hasher;

pub use error::{HashError, RegistrationError, SessionError};
pub use hasher::{CredentialHasher, HashParams};

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};

use keyhole_core::{DisplayName, Email};

use crate::db::UserRepository;
use crate::models::{AuthenticatedIdentity, NewUser, UserRecord};

/// Minimum password length in characters.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Maximum password length in bytes, bounding hashing cost per request.
pub const MAX_PASSWORD_BYTES: usize = 1024;

/// Why a login attempt did not produce an identity.
///
/// Each reason renders its own message, so a visitor can tell an unknown email
/// from a wrong password.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    /// No account has this email.
    EmailNotFound,
    /// The account exists but the password does not match.
    PasswordMismatch,
    /// Credentials were valid but the session could not be bound.
    LoginRejected,
    /// The user repository failed during lookup.
    LookupError,
}

impl AuthFailure {
    /// Message shown on the login form.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::EmailNotFound => "Email not registered",
            Self::PasswordMismatch => "Incorrect password",
            Self::LoginRejected => "Login failed",
            Self::LookupError => "Something went wrong, please try again",
        }
    }
}

/// Result of checking an email/password pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    /// The pair matched a stored account.
    Success(AuthenticatedIdentity),
    /// The pair was rejected.
    Failure(AuthFailure),
}

/// Input for account registration.
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: SecretString,
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("name", &self.name)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Authentication service.
///
/// Cheap to clone; holds the injected repository and the hasher.
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    hasher: CredentialHasher,
}

impl AuthService {
    /// Create a new authentication service.
    #[must_use]
    pub fn new(users: Arc<dyn UserRepository>, hasher: CredentialHasher) -> Self {
        Self { users, hasher }
    }

    /// The user repository this service authenticates against.
    #[must_use]
    pub fn users(&self) -> &Arc<dyn UserRepository> {
        &self.users
    }

    /// Check an email/password pair.
    ///
    /// Lookup and verification are separate steps: an unknown email returns
    /// before any hashing happens. Repository failures become
    /// [`AuthFailure::LookupError`], never `EmailNotFound`.
    pub async fn authenticate(&self, email: &str, password: &SecretString) -> AuthOutcome {
        // An address that cannot be parsed cannot belong to any account
        let Ok(email) = Email::parse(email) else {
            return AuthOutcome::Failure(AuthFailure::EmailNotFound);
        };

        let record = match self.users.find_by_email(&email).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                tracing::debug!("login for unknown email");
                return AuthOutcome::Failure(AuthFailure::EmailNotFound);
            }
            Err(e) => {
                tracing::error!(error = %e, "user lookup failed during login");
                return AuthOutcome::Failure(AuthFailure::LookupError);
            }
        };

        let verified = self
            .hasher
            .verify_blocking(password.clone(), record.password_hash.clone())
            .await;
        if !verified {
            tracing::debug!(user_id = %record.id, "password mismatch");
            return AuthOutcome::Failure(AuthFailure::PasswordMismatch);
        }

        AuthOutcome::Success(AuthenticatedIdentity::from(record))
    }

    /// Register a new account.
    ///
    /// # Errors
    ///
    /// Returns `RegistrationError::InvalidEmail`/`InvalidName`/`WeakPassword`
    /// for bad input, `RegistrationError::EmailTaken` if the email is already
    /// registered (including a concurrent registration winning the race), and
    /// `Hash`/`Repository` for internal failures.
    pub async fn register(&self, registration: Registration) -> Result<UserRecord, RegistrationError> {
        let email = Email::parse(&registration.email)?;
        let name = DisplayName::parse(&registration.name)?;
        validate_password(registration.password.expose_secret())?;

        // Cheap early exit before paying for a hash; the repository's
        // uniqueness check still decides races.
        if self.users.find_by_email(&email).await?.is_some() {
            return Err(RegistrationError::EmailTaken);
        }

        let password_hash = self.hasher.hash_blocking(registration.password).await?;

        let user = self
            .users
            .create(NewUser {
                email,
                name,
                password_hash,
            })
            .await?;

        tracing::info!(user_id = %user.id, "user registered");
        Ok(user)
    }
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), RegistrationError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(RegistrationError::WeakPassword(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    if password.len() > MAX_PASSWORD_BYTES {
        return Err(RegistrationError::WeakPassword(format!(
            "Password must be at most {MAX_PASSWORD_BYTES} bytes"
        )));
    }

    Ok(())
}
