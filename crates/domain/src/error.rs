//! Domain error types.

use store::{Role, StoreError};
use thiserror::Error;

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An account with this email already exists.
    #[error("Email already exists")]
    EmailTaken,

    /// Email or password did not match.
    #[error("Incorrect email or password")]
    InvalidCredentials,

    /// The session token is missing, unknown or revoked.
    #[error("Authentication required")]
    Unauthenticated,

    /// The caller lacks the required role.
    #[error("Forbidden: requires {required} role")]
    Forbidden { required: Role },

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Input failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The password hasher failed; nothing was stored.
    #[error("Password hashing failed: {0}")]
    PasswordHash(String),

    /// An error occurred in the underlying store.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}
