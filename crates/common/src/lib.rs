//! Shared types for the storefront backend.

pub mod types;

pub use types::{OrderId, ProductId, UserId};
