//! Persistence layer for the storefront backend.
//!
//! Three stores, each behind an async trait with an in-memory and a
//! PostgreSQL implementation:
//! - [`CatalogStore`] owns products and their `quantity_on_hand`; stock only
//!   moves through its atomic conditional decrement and increment operations
//! - [`OrderStore`] holds every user's append-only order history
//! - [`UserStore`] holds accounts and their active session tokens

pub mod catalog;
pub mod error;
pub mod memory;
pub mod order;
pub mod orders;
pub mod page;
pub mod postgres;
pub mod product;
pub mod user;
pub mod users;

pub use catalog::{CatalogStore, CatalogStoreExt};
pub use common::{OrderId, ProductId, UserId};
pub use error::{Result, StoreError};
pub use memory::{InMemoryCatalogStore, InMemoryOrderStore, InMemoryUserStore};
pub use order::{CommittedLineItem, Order};
pub use orders::OrderStore;
pub use page::PageRequest;
pub use postgres::{PostgresCatalogStore, PostgresOrderStore, PostgresUserStore, run_migrations};
pub use product::{NewProduct, Product, ProductPatch};
pub use user::{NewUser, Role, UserPatch, UserRecord};
pub use users::UserStore;
