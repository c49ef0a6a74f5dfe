//! User accounts and sessions.

mod password;
mod service;

pub use service::AccountService;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use store::{Role, UserId, UserRecord};

use crate::DomainError;

/// A user as exposed outside the domain: no password hash, no tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub roles: Vec<Role>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    /// Fails with `Forbidden` unless the user holds `role`.
    pub fn require_role(&self, role: Role) -> Result<(), DomainError> {
        if self.has_role(role) {
            Ok(())
        } else {
            Err(DomainError::Forbidden { required: role })
        }
    }
}

impl From<UserRecord> for User {
    fn from(record: UserRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            email: record.email,
            roles: record.roles,
            created_at: record.created_at,
        }
    }
}

/// Signup input.
#[derive(Debug, Clone, Deserialize)]
pub struct Signup {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Profile changes requested by the user.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub password: Option<String>,
}

/// An authenticated session: the user plus the token that identifies it.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub user: User,
    pub access_token: String,
}
