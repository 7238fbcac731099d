//! Session middleware configuration and per-request session access.
//!
//! The session layer is generic over the store so the binary can pick
//! `PostgresStore` or `MemoryStore` at startup. Handlers reach the
//! authentication binding through [`AuthSession`].

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use secrecy::ExposeSecret;
use sha2::{Digest, Sha512};
use tower_sessions::cookie::{Key, SameSite};
use tower_sessions::service::SignedCookie;
use tower_sessions::{Expiry, Session, SessionManagerLayer, SessionStore};

use keyhole_core::UserId;

use crate::config::KeyholeConfig;
use crate::db::UserRepository;
use crate::models::{AuthenticatedIdentity, session_keys};
use crate::services::auth::SessionError;
use crate::state::AppState;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "keyhole_session";

/// Create the session layer over the given store.
///
/// # Arguments
///
/// * `store` - Session store (`PostgresStore` in production, `MemoryStore` otherwise)
/// * `config` - Keyhole configuration (for session secret, expiry and cookie security)
#[must_use]
pub fn create_session_layer<S>(
    store: S,
    config: &KeyholeConfig,
) -> SessionManagerLayer<S, SignedCookie>
where
    S: SessionStore + Clone,
{
    let expiry_seconds = i64::try_from(config.session_ttl.as_secs()).unwrap_or(i64::MAX);

    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(expiry_seconds),
        ))
        .with_secure(config.is_secure())
        .with_same_site(SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
        .with_signed(signing_key(config.session_secret.expose_secret()))
}

/// Derive the cookie signing key from the configured secret.
fn signing_key(secret: &str) -> Key {
    // SHA-512 output is exactly the 64 bytes `Key::from` requires
    let digest = Sha512::digest(secret.as_bytes());
    Key::from(digest.as_slice())
}

/// Authentication view of the current request's session.
///
/// Only the user ID is stored in the session. The identity is rebuilt from the
/// repository on every [`resolve`](Self::resolve), so a deleted account stops
/// authenticating immediately.
#[derive(Clone)]
pub struct AuthSession {
    session: Option<Session>,
    users: Arc<dyn UserRepository>,
    lookup_timeout: Duration,
}

impl AuthSession {
    /// Wrap a session handle.
    ///
    /// `session` is `None` when the request bypassed the session layer; such a
    /// request is always anonymous.
    #[must_use]
    pub fn new(
        session: Option<Session>,
        users: Arc<dyn UserRepository>,
        lookup_timeout: Duration,
    ) -> Self {
        Self {
            session,
            users,
            lookup_timeout,
        }
    }

    /// Build from request parts and application state.
    #[must_use]
    pub fn from_parts(parts: &Parts, state: &AppState) -> Self {
        Self::new(
            parts.extensions.get::<Session>().cloned(),
            Arc::clone(state.users()),
            state.config().lookup_timeout,
        )
    }

    /// Bind an authenticated identity to this session.
    ///
    /// The session ID is cycled first so a token planted before login cannot
    /// be reused afterwards.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::MissingLayer` if the request has no session, or
    /// `SessionError::Store` if the store rejects the write.
    pub async fn establish(&self, identity: &AuthenticatedIdentity) -> Result<(), SessionError> {
        let session = self.session.as_ref().ok_or(SessionError::MissingLayer)?;

        session.cycle_id().await?;
        session.insert(session_keys::USER_ID, identity.id).await?;

        tracing::debug!(user_id = %identity.id, "session established");
        Ok(())
    }

    /// Resolve the identity bound to this session, if any.
    ///
    /// Never fails open: an unreadable binding, a missing user, a repository
    /// error and a timeout all yield `None`. The timeout covers both the
    /// session store read and the user lookup.
    pub async fn resolve(&self) -> Option<AuthenticatedIdentity> {
        let session = self.session.as_ref()?;

        let lookup = async {
            let user_id = match session.get::<UserId>(session_keys::USER_ID).await {
                Ok(Some(id)) => id,
                Ok(None) => return None,
                Err(e) => {
                    tracing::debug!(error = %e, "unreadable session binding");
                    return None;
                }
            };

            match self.users.find_by_id(user_id).await {
                Ok(Some(record)) => Some(AuthenticatedIdentity::from(record)),
                Ok(None) => {
                    tracing::info!(user_id = %user_id, "session bound to missing user, clearing");
                    if let Err(e) = session.remove::<UserId>(session_keys::USER_ID).await {
                        tracing::warn!(error = %e, "failed to clear stale session binding");
                    }
                    None
                }
                Err(e) => {
                    tracing::warn!(user_id = %user_id, error = %e, "session user lookup failed");
                    None
                }
            }
        };

        tokio::time::timeout(self.lookup_timeout, lookup)
            .await
            .unwrap_or_else(|_| {
                tracing::warn!(
                    timeout_ms = self.lookup_timeout.as_millis(),
                    "session resolve timed out"
                );
                None
            })
    }

    /// Tear down the session.
    ///
    /// Deletes the stored record and expires the cookie. Destroying an empty
    /// or absent session succeeds.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Store` if the store cannot delete the record.
    pub async fn destroy(&self) -> Result<(), SessionError> {
        if let Some(session) = &self.session {
            session.flush().await?;
        }
        Ok(())
    }
}

impl<S> FromRequestParts<S> for AuthSession
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_parts(parts, &AppState::from_ref(state)))
    }
}
