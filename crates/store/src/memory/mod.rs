//! In-memory store implementations.
//!
//! They provide the same interface and atomicity as the PostgreSQL
//! implementations and back the test suites and the database-less server mode.

mod catalog;
mod orders;
mod users;

pub use catalog::InMemoryCatalogStore;
pub use orders::InMemoryOrderStore;
pub use users::InMemoryUserStore;
