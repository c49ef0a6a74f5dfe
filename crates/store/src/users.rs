use async_trait::async_trait;

use crate::{NewUser, Result, UserId, UserPatch, UserRecord};

/// Storage for user accounts and their session tokens.
///
/// Token mutations are single atomic updates of one user record.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Inserts a user. Fails with `Conflict` if the email is already taken.
    async fn insert(&self, user: NewUser) -> Result<UserRecord>;

    async fn get(&self, id: UserId) -> Result<Option<UserRecord>>;

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>>;

    /// Finds the user holding `token` among its active sessions.
    async fn find_by_token(&self, token: &str) -> Result<Option<UserRecord>>;

    /// Lists all users in creation order.
    async fn list(&self) -> Result<Vec<UserRecord>>;

    async fn update(&self, id: UserId, patch: UserPatch) -> Result<Option<UserRecord>>;

    async fn delete(&self, id: UserId) -> Result<Option<UserRecord>>;

    /// Adds a session token. Returns false if the user doesn't exist.
    async fn add_token(&self, id: UserId, token: String) -> Result<bool>;

    /// Removes one session token. Returns false if the user doesn't exist.
    async fn remove_token(&self, id: UserId, token: &str) -> Result<bool>;

    /// Removes every session token. Returns false if the user doesn't exist.
    async fn clear_tokens(&self, id: UserId) -> Result<bool>;
}
