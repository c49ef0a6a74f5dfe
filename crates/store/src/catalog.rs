use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::{NewProduct, PageRequest, Product, ProductId, ProductPatch, Result, StoreError};

/// Core trait for catalog store implementations.
///
/// The catalog is the single owner of `quantity_on_hand`. Implementations
/// must serialize [`conditional_decrement`](Self::conditional_decrement) calls
/// against the same product so that two concurrent decrements can never both
/// observe sufficient stock when only one should succeed.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Inserts a new product and returns it with its assigned id.
    async fn insert(&self, product: NewProduct) -> Result<Product>;

    /// Retrieves a product by id.
    async fn get(&self, id: ProductId) -> Result<Option<Product>>;

    /// Lists products ordered by name, then id.
    async fn list(&self, page: PageRequest) -> Result<Vec<Product>>;

    /// Applies a patch to a product's display fields.
    ///
    /// Returns None if the product doesn't exist.
    async fn update(&self, id: ProductId, patch: ProductPatch) -> Result<Option<Product>>;

    /// Deletes a product, returning the removed record.
    async fn delete(&self, id: ProductId) -> Result<Option<Product>>;

    /// Fetches every existing product among `ids` in one batch read.
    ///
    /// Missing ids are simply absent from the result.
    async fn fetch_by_ids(&self, ids: &BTreeSet<ProductId>) -> Result<Vec<Product>>;

    /// Atomically decrements stock by `amount` if at least `amount` is on hand.
    ///
    /// Returns false, leaving the product untouched, when stock is
    /// insufficient at the moment of the attempt or the product doesn't exist.
    async fn conditional_decrement(&self, id: ProductId, amount: u32) -> Result<bool>;

    /// Atomically increments stock by `amount`.
    ///
    /// Used to compensate a decrement and to restock.
    async fn increment_back(&self, id: ProductId, amount: u32) -> Result<()>;
}

/// Extension trait providing convenience methods for catalog stores.
#[async_trait]
pub trait CatalogStoreExt: CatalogStore {
    /// Retrieves a product, failing with `NotFound` if it doesn't exist.
    async fn require(&self, id: ProductId) -> Result<Product> {
        self.get(id).await?.ok_or_else(|| StoreError::NotFound {
            entity: "product",
            id: id.to_string(),
        })
    }
}

impl<T: CatalogStore + ?Sized> CatalogStoreExt for T {}
