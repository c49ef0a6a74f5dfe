//! Catalog management.

mod service;

pub use service::ProductService;
pub use store::{NewProduct, Product, ProductPatch};
