//! Domain layer for the storefront backend.
//!
//! This crate provides the services around the order core:
//! - Account management: signup, login, session tokens, profiles and roles
//! - Catalog management: product CRUD and restocking

pub mod account;
pub mod error;
pub mod product;

pub use account::{AccountService, ProfileUpdate, Session, Signup, User};
pub use error::DomainError;
pub use product::ProductService;
pub use store::Role;
