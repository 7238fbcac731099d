//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::KeyholeConfig;
use crate::db::UserRepository;
use crate::services::auth::{AuthService, CredentialHasher, HashError};

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`. The user repository is injected so the same
/// router runs over `PostgreSQL` or the in-memory adapter.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: KeyholeConfig,
    auth: AuthService,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Keyhole configuration
    /// * `users` - User repository backing authentication
    ///
    /// # Errors
    ///
    /// Returns `HashError::InvalidParams` if the configured Argon2 work factor
    /// is out of range.
    pub fn new(config: KeyholeConfig, users: Arc<dyn UserRepository>) -> Result<Self, HashError> {
        let hasher = CredentialHasher::new(config.hash_params)?;
        let auth = AuthService::new(users, hasher);

        Ok(Self {
            inner: Arc::new(AppStateInner { config, auth }),
        })
    }

    /// Get a reference to the Keyhole configuration.
    #[must_use]
    pub fn config(&self) -> &KeyholeConfig {
        &self.inner.config
    }

    /// Get a reference to the authentication service.
    #[must_use]
    pub fn auth(&self) -> &AuthService {
        &self.inner.auth
    }

    /// Get a reference to the user repository.
    #[must_use]
    pub fn users(&self) -> &Arc<dyn UserRepository> {
        self.inner.auth.users()
    }
}
