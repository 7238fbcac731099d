//! In-memory user repository.
//!
//! Used when no database is configured and as the repository fake in tests.
//! Records are lost on restart.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use keyhole_core::{Email, UserId};

use super::{RepositoryError, UserRepository};
use crate::models::{NewUser, UserRecord};

#[derive(Default)]
struct Inner {
    next_id: i32,
    users: HashMap<UserId, UserRecord>,
    by_email: HashMap<Email, UserId>,
}

/// Process-local user repository.
///
/// Reads share the lock; `create` performs the uniqueness check and the
/// insert under a single write guard, so concurrent registrations of the same
/// email yield exactly one record and one `Conflict`.
#[derive(Clone, Default)]
pub struct MemoryUserRepository {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryUserRepository {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove a user, returning whether one was removed.
    ///
    /// Not part of [`UserRepository`]; exists for operators and tests that
    /// need an account to disappear underneath a live session.
    pub async fn remove(&self, id: UserId) -> bool {
        let mut inner = self.inner.write().await;
        match inner.users.remove(&id) {
            Some(record) => {
                inner.by_email.remove(&record.email);
                true
            }
            None => false,
        }
    }

    /// Number of stored users.
    pub async fn len(&self) -> usize {
        self.inner.read().await.users.len()
    }

    /// Whether the repository holds no users.
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.users.is_empty()
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn find_by_email(&self, email: &Email) -> Result<Option<UserRecord>, RepositoryError> {
        let inner = self.inner.read().await;
        Ok(inner
            .by_email
            .get(email)
            .and_then(|id| inner.users.get(id))
            .cloned())
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<UserRecord>, RepositoryError> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn create(&self, user: NewUser) -> Result<UserRecord, RepositoryError> {
        let mut inner = self.inner.write().await;
        if inner.by_email.contains_key(&user.email) {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }

        inner.next_id = inner
            .next_id
            .checked_add(1)
            .ok_or_else(|| RepositoryError::Unavailable("user id space exhausted".to_owned()))?;
        let id = UserId::new(inner.next_id);

        let record = UserRecord {
            id,
            email: user.email,
            name: user.name,
            password_hash: user.password_hash,
            created_at: Utc::now(),
        };
        inner.by_email.insert(record.email.clone(), id);
        inner.users.insert(id, record.clone());

        Ok(record)
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}
