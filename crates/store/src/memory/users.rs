use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use subtle::ConstantTimeEq;
use tokio::sync::RwLock;

use crate::{NewUser, Result, StoreError, UserId, UserPatch, UserRecord, UserStore};

/// In-memory user store.
///
/// Users are kept in creation order; every mutation of a user record,
/// including its token set, happens under the write lock.
#[derive(Debug, Clone, Default)]
pub struct InMemoryUserStore {
    users: Arc<RwLock<Vec<UserRecord>>>,
}

/// Compares session tokens without leaking the matching prefix length.
fn token_matches(stored: &str, presented: &str) -> bool {
    bool::from(stored.as_bytes().ct_eq(presented.as_bytes()))
}

impl InMemoryUserStore {
    /// Creates a new empty user store.
    pub fn new() -> Self {
        Self::default()
    }

    async fn modify<F>(&self, id: UserId, f: F) -> Result<bool>
    where
        F: FnOnce(&mut UserRecord) + Send,
    {
        let mut users = self.users.write().await;
        match users.iter_mut().find(|u| u.id == id) {
            Some(user) => {
                f(user);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn insert(&self, user: NewUser) -> Result<UserRecord> {
        let mut users = self.users.write().await;

        if users.iter().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict(format!(
                "email already registered: {}",
                user.email
            )));
        }

        let record = UserRecord {
            id: UserId::new(),
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            roles: user.roles,
            tokens: Vec::new(),
            created_at: Utc::now(),
        };
        users.push(record.clone());
        Ok(record)
    }

    async fn get(&self, id: UserId) -> Result<Option<UserRecord>> {
        Ok(self.users.read().await.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        Ok(self
            .users
            .read()
            .await
            .iter()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<UserRecord>> {
        Ok(self
            .users
            .read()
            .await
            .iter()
            .find(|u| u.tokens.iter().any(|t| token_matches(t, token)))
            .cloned())
    }

    async fn list(&self) -> Result<Vec<UserRecord>> {
        Ok(self.users.read().await.clone())
    }

    async fn update(&self, id: UserId, patch: UserPatch) -> Result<Option<UserRecord>> {
        let mut users = self.users.write().await;
        Ok(users.iter_mut().find(|u| u.id == id).map(|user| {
            if let Some(name) = patch.name {
                user.name = name;
            }
            if let Some(hash) = patch.password_hash {
                user.password_hash = hash;
            }
            user.clone()
        }))
    }

    async fn delete(&self, id: UserId) -> Result<Option<UserRecord>> {
        let mut users = self.users.write().await;
        Ok(users
            .iter()
            .position(|u| u.id == id)
            .map(|index| users.remove(index)))
    }

    async fn add_token(&self, id: UserId, token: String) -> Result<bool> {
        self.modify(id, |user| user.tokens.push(token)).await
    }

    async fn remove_token(&self, id: UserId, token: &str) -> Result<bool> {
        self.modify(id, |user| user.tokens.retain(|t| !token_matches(t, token)))
            .await
    }

    async fn clear_tokens(&self, id: UserId) -> Result<bool> {
        self.modify(id, |user| user.tokens.clear()).await
    }
}
