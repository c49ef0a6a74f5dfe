//! Product service providing catalog CRUD.

use store::{CatalogStore, NewProduct, PageRequest, Product, ProductId, ProductPatch, StoreError};

use crate::error::DomainError;

/// Service for managing the product catalog.
///
/// Stock can be raised with [`restock`](Self::restock) but never overwritten;
/// decrements belong to order fulfillment alone.
pub struct ProductService<C: CatalogStore> {
    store: C,
}

impl<C: CatalogStore> ProductService<C> {
    /// Creates a new product service with the given catalog store.
    pub fn new(store: C) -> Self {
        Self { store }
    }

    /// Creates a product.
    #[tracing::instrument(skip(self))]
    pub async fn create(&self, product: NewProduct) -> Result<Product, DomainError> {
        if product.name.trim().is_empty() {
            return Err(DomainError::Validation("name is required".to_string()));
        }

        let product = self.store.insert(product).await?;
        tracing::info!(product_id = %product.id, "product created");
        Ok(product)
    }

    /// Lists one page of products.
    pub async fn list(&self, page: PageRequest) -> Result<Vec<Product>, DomainError> {
        Ok(self.store.list(page).await?)
    }

    /// Loads a product by id.
    pub async fn get(&self, id: ProductId) -> Result<Product, DomainError> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| DomainError::ProductNotFound(id.to_string()))
    }

    /// Updates a product's name and/or description.
    #[tracing::instrument(skip(self))]
    pub async fn update(&self, id: ProductId, patch: ProductPatch) -> Result<Product, DomainError> {
        if patch.is_empty() {
            return Err(DomainError::Validation("nothing to update".to_string()));
        }
        if patch.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(DomainError::Validation("name cannot be empty".to_string()));
        }

        self.store
            .update(id, patch)
            .await?
            .ok_or_else(|| DomainError::ProductNotFound(id.to_string()))
    }

    /// Deletes a product.
    ///
    /// Historical orders keep referencing the id; their read-time enrichment
    /// simply omits the display fields afterwards.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: ProductId) -> Result<Product, DomainError> {
        self.store
            .delete(id)
            .await?
            .ok_or_else(|| DomainError::ProductNotFound(id.to_string()))
    }

    /// Adds `amount` units to a product's stock.
    #[tracing::instrument(skip(self))]
    pub async fn restock(&self, id: ProductId, amount: u32) -> Result<Product, DomainError> {
        if amount == 0 {
            return Err(DomainError::Validation(
                "restock amount must be greater than 0".to_string(),
            ));
        }

        self.store
            .increment_back(id, amount)
            .await
            .map_err(|e| match e {
                StoreError::NotFound { .. } => DomainError::ProductNotFound(id.to_string()),
                other => DomainError::Store(other),
            })?;

        self.get(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use store::InMemoryCatalogStore;

    fn service() -> ProductService<InMemoryCatalogStore> {
        ProductService::new(InMemoryCatalogStore::new())
    }

    #[tokio::test]
    async fn create_and_get() {
        let service = service();
        let product = service
            .create(NewProduct::new("Widget", "A widget", 5))
            .await
            .unwrap();

        let loaded = service.get(product.id).await.unwrap();
        assert_eq!(loaded, product);
    }

    #[tokio::test]
    async fn create_requires_name() {
        let result = service().create(NewProduct::new("  ", "", 1)).await;
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn get_missing_product() {
        let result = service().get(ProductId::new()).await;
        assert!(matches!(result, Err(DomainError::ProductNotFound(_))));
    }

    #[tokio::test]
    async fn update_rejects_empty_patch() {
        let service = service();
        let product = service
            .create(NewProduct::new("Widget", "", 5))
            .await
            .unwrap();

        let result = service.update(product.id, ProductPatch::default()).await;
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn restock_increments_stock() {
        let service = service();
        let product = service
            .create(NewProduct::new("Widget", "", 5))
            .await
            .unwrap();

        let restocked = service.restock(product.id, 7).await.unwrap();
        assert_eq!(restocked.quantity_on_hand, 12);

        assert!(matches!(
            service.restock(product.id, 0).await,
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            service.restock(ProductId::new(), 1).await,
            Err(DomainError::ProductNotFound(_))
        ));
    }

    #[tokio::test]
    async fn delete_then_get_fails() {
        let service = service();
        let product = service
            .create(NewProduct::new("Widget", "", 5))
            .await
            .unwrap();

        service.delete(product.id).await.unwrap();
        assert!(service.get(product.id).await.is_err());
        assert!(service.delete(product.id).await.is_err());
    }
}
