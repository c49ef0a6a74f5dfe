//! Account service: signup, login, sessions and profile management.

use std::collections::HashSet;

use store::{NewUser, Role, StoreError, UserId, UserPatch, UserStore};

use super::password::{hash_password, new_session_token, verify_password};
use super::{ProfileUpdate, Session, Signup, User};
use crate::error::DomainError;

const MIN_PASSWORD_LEN: usize = 6;

/// Service for managing user accounts.
///
/// Every operation takes the acting user's id explicitly; there is no
/// ambient "current user".
pub struct AccountService<U: UserStore> {
    store: U,
    admin_emails: HashSet<String>,
}

impl<U: UserStore> AccountService<U> {
    /// Creates a new account service with the given user store.
    pub fn new(store: U) -> Self {
        Self {
            store,
            admin_emails: HashSet::new(),
        }
    }

    /// Grants the `Admin` role to accounts created with any of these emails.
    pub fn with_admin_emails<I, S>(mut self, emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.admin_emails = emails
            .into_iter()
            .map(|e| normalize_email(e.as_ref()))
            .collect();
        self
    }

    /// Creates an account and opens its first session.
    #[tracing::instrument(skip(self, signup), fields(email = %signup.email))]
    pub async fn signup(&self, signup: Signup) -> Result<Session, DomainError> {
        let name = signup.name.trim().to_string();
        let email = normalize_email(&signup.email);

        if name.is_empty() {
            return Err(DomainError::Validation("name is required".to_string()));
        }
        if !email.contains('@') {
            return Err(DomainError::Validation(format!("invalid email: {email}")));
        }
        validate_password(&signup.password)?;

        let role = if self.admin_emails.contains(&email) {
            Role::Admin
        } else {
            Role::Customer
        };

        let record = self
            .store
            .insert(NewUser {
                name,
                email,
                password_hash: hash_password(&signup.password)?,
                roles: vec![role],
            })
            .await
            .map_err(|e| match e {
                StoreError::Conflict(_) => DomainError::EmailTaken,
                other => DomainError::Store(other),
            })?;

        metrics::counter!("accounts_signups_total").increment(1);
        tracing::info!(user_id = %record.id, %role, "account created");

        self.open_session(record.into()).await
    }

    /// Verifies credentials and opens a new session.
    ///
    /// An unknown email and a wrong password fail identically.
    #[tracing::instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, DomainError> {
        let record = self
            .store
            .find_by_email(&normalize_email(email))
            .await?
            .ok_or(DomainError::InvalidCredentials)?;

        if !verify_password(password, &record.password_hash) {
            return Err(DomainError::InvalidCredentials);
        }

        self.open_session(record.into()).await
    }

    /// Resolves a session token to its user.
    pub async fn authenticate(&self, token: &str) -> Result<User, DomainError> {
        self.store
            .find_by_token(token)
            .await?
            .map(User::from)
            .ok_or(DomainError::Unauthenticated)
    }

    /// Ends one session.
    #[tracing::instrument(skip(self, token))]
    pub async fn logout(&self, user_id: UserId, token: &str) -> Result<User, DomainError> {
        if !self.store.remove_token(user_id, token).await? {
            return Err(DomainError::UserNotFound(user_id.to_string()));
        }
        self.profile(user_id).await
    }

    /// Ends every session of the user.
    #[tracing::instrument(skip(self))]
    pub async fn logout_all(&self, user_id: UserId) -> Result<User, DomainError> {
        if !self.store.clear_tokens(user_id).await? {
            return Err(DomainError::UserNotFound(user_id.to_string()));
        }
        self.profile(user_id).await
    }

    /// Loads the user's own profile.
    pub async fn profile(&self, user_id: UserId) -> Result<User, DomainError> {
        self.store
            .get(user_id)
            .await?
            .map(User::from)
            .ok_or_else(|| DomainError::UserNotFound(user_id.to_string()))
    }

    /// Updates the user's name and/or password.
    #[tracing::instrument(skip(self, update))]
    pub async fn update_profile(
        &self,
        user_id: UserId,
        update: ProfileUpdate,
    ) -> Result<User, DomainError> {
        let name = match update.name {
            Some(name) if name.trim().is_empty() => {
                return Err(DomainError::Validation("name cannot be empty".to_string()));
            }
            Some(name) => Some(name.trim().to_string()),
            None => None,
        };
        let password_hash = match update.password {
            Some(password) => {
                validate_password(&password)?;
                Some(hash_password(&password)?)
            }
            None => None,
        };

        self.store
            .update(
                user_id,
                UserPatch {
                    name,
                    password_hash,
                },
            )
            .await?
            .map(User::from)
            .ok_or_else(|| DomainError::UserNotFound(user_id.to_string()))
    }

    /// Deletes the user's account.
    #[tracing::instrument(skip(self))]
    pub async fn delete_account(&self, user_id: UserId) -> Result<User, DomainError> {
        self.store
            .delete(user_id)
            .await?
            .map(User::from)
            .ok_or_else(|| DomainError::UserNotFound(user_id.to_string()))
    }

    /// Lists every account.
    pub async fn list_users(&self) -> Result<Vec<User>, DomainError> {
        Ok(self
            .store
            .list()
            .await?
            .into_iter()
            .map(User::from)
            .collect())
    }

    /// Loads any account by id.
    pub async fn get_user(&self, user_id: UserId) -> Result<User, DomainError> {
        self.profile(user_id).await
    }

    async fn open_session(&self, user: User) -> Result<Session, DomainError> {
        let token = new_session_token();
        if !self.store.add_token(user.id, token.clone()).await? {
            return Err(DomainError::UserNotFound(user.id.to_string()));
        }
        Ok(Session {
            user,
            access_token: token,
        })
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate_password(password: &str) -> Result<(), DomainError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(DomainError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use store::InMemoryUserStore;

    fn service() -> AccountService<InMemoryUserStore> {
        AccountService::new(InMemoryUserStore::new()).with_admin_emails(["boss@shop.test"])
    }

    fn signup(email: &str) -> Signup {
        Signup {
            name: "Ada".to_string(),
            email: email.to_string(),
            password: "hunter22".to_string(),
        }
    }

    #[tokio::test]
    async fn signup_normalizes_email_and_opens_session() {
        let service = service();
        let session = service.signup(signup("  Ada@Example.COM ")).await.unwrap();

        assert_eq!(session.user.email, "ada@example.com");
        assert_eq!(session.user.roles, vec![Role::Customer]);

        let user = service.authenticate(&session.access_token).await.unwrap();
        assert_eq!(user.id, session.user.id);
    }

    #[tokio::test]
    async fn admin_emails_get_admin_role() {
        let service = service();
        let session = service.signup(signup("Boss@shop.test")).await.unwrap();
        assert!(session.user.has_role(Role::Admin));
        assert!(session.user.require_role(Role::Admin).is_ok());
    }

    #[tokio::test]
    async fn signup_rejects_duplicate_email() {
        let service = service();
        service.signup(signup("ada@example.com")).await.unwrap();

        let result = service.signup(signup("ADA@example.com")).await;
        assert!(matches!(result, Err(DomainError::EmailTaken)));
    }

    #[tokio::test]
    async fn signup_validates_input() {
        let service = service();

        let mut bad = signup("ada@example.com");
        bad.password = "short".to_string();
        assert!(matches!(
            service.signup(bad).await,
            Err(DomainError::Validation(_))
        ));

        assert!(matches!(
            service.signup(signup("not-an-email")).await,
            Err(DomainError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn login_checks_credentials() {
        let service = service();
        service.signup(signup("ada@example.com")).await.unwrap();

        assert!(service.login("ada@example.com", "hunter22").await.is_ok());
        assert!(matches!(
            service.login("ada@example.com", "wrong-pass").await,
            Err(DomainError::InvalidCredentials)
        ));
        assert!(matches!(
            service.login("nobody@example.com", "hunter22").await,
            Err(DomainError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn logout_revokes_only_that_session() {
        let service = service();
        let first = service.signup(signup("ada@example.com")).await.unwrap();
        let second = service.login("ada@example.com", "hunter22").await.unwrap();

        service
            .logout(first.user.id, &first.access_token)
            .await
            .unwrap();

        assert!(matches!(
            service.authenticate(&first.access_token).await,
            Err(DomainError::Unauthenticated)
        ));
        assert!(service.authenticate(&second.access_token).await.is_ok());
    }

    #[tokio::test]
    async fn logout_all_revokes_every_session() {
        let service = service();
        let first = service.signup(signup("ada@example.com")).await.unwrap();
        let second = service.login("ada@example.com", "hunter22").await.unwrap();

        service.logout_all(first.user.id).await.unwrap();

        assert!(service.authenticate(&first.access_token).await.is_err());
        assert!(service.authenticate(&second.access_token).await.is_err());
    }

    #[tokio::test]
    async fn update_profile_rehashes_password() {
        let service = service();
        let session = service.signup(signup("ada@example.com")).await.unwrap();

        let update = ProfileUpdate {
            name: Some("Ada Lovelace".to_string()),
            password: Some("new-secret".to_string()),
        };
        let user = service
            .update_profile(session.user.id, update)
            .await
            .unwrap();
        assert_eq!(user.name, "Ada Lovelace");

        assert!(service.login("ada@example.com", "hunter22").await.is_err());
        assert!(service.login("ada@example.com", "new-secret").await.is_ok());
    }

    #[tokio::test]
    async fn delete_account_removes_user() {
        let service = service();
        let session = service.signup(signup("ada@example.com")).await.unwrap();

        service.delete_account(session.user.id).await.unwrap();

        assert!(matches!(
            service.profile(session.user.id).await,
            Err(DomainError::UserNotFound(_))
        ));
        assert!(service.list_users().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn sanitized_user_has_no_secrets() {
        let service = service();
        let session = service.signup(signup("ada@example.com")).await.unwrap();

        let json = serde_json::to_value(&session.user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert!(json.get("tokens").is_none());
    }
}
