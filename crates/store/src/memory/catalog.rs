use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::{
    CatalogStore, NewProduct, PageRequest, Product, ProductId, ProductPatch, Result, StoreError,
};

/// In-memory catalog store.
///
/// Every stock mutation runs under the write lock, so a conditional decrement
/// is a single indivisible check-and-subtract.
#[derive(Clone, Default)]
pub struct InMemoryCatalogStore {
    products: Arc<RwLock<HashMap<ProductId, Product>>>,
}

impl InMemoryCatalogStore {
    /// Creates a new empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current stock level of every product.
    pub async fn snapshot(&self) -> BTreeMap<ProductId, u32> {
        self.products
            .read()
            .await
            .values()
            .map(|p| (p.id, p.quantity_on_hand))
            .collect()
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalogStore {
    async fn insert(&self, product: NewProduct) -> Result<Product> {
        let now = Utc::now();
        let product = Product {
            id: ProductId::new(),
            name: product.name,
            description: product.description,
            quantity_on_hand: product.quantity_on_hand,
            created_at: now,
            updated_at: now,
        };
        self.products
            .write()
            .await
            .insert(product.id, product.clone());
        Ok(product)
    }

    async fn get(&self, id: ProductId) -> Result<Option<Product>> {
        Ok(self.products.read().await.get(&id).cloned())
    }

    async fn list(&self, page: PageRequest) -> Result<Vec<Product>> {
        let products = self.products.read().await;
        let mut all: Vec<_> = products.values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));

        Ok(all
            .into_iter()
            .skip(page.offset())
            .take(page.limit as usize)
            .collect())
    }

    async fn update(&self, id: ProductId, patch: ProductPatch) -> Result<Option<Product>> {
        let mut products = self.products.write().await;
        Ok(products.get_mut(&id).map(|product| {
            patch.apply_to(product);
            product.updated_at = Utc::now();
            product.clone()
        }))
    }

    async fn delete(&self, id: ProductId) -> Result<Option<Product>> {
        Ok(self.products.write().await.remove(&id))
    }

    async fn fetch_by_ids(&self, ids: &BTreeSet<ProductId>) -> Result<Vec<Product>> {
        let products = self.products.read().await;
        Ok(ids.iter().filter_map(|id| products.get(id).cloned()).collect())
    }

    async fn conditional_decrement(&self, id: ProductId, amount: u32) -> Result<bool> {
        let mut products = self.products.write().await;

        match products.get_mut(&id) {
            Some(product) if product.quantity_on_hand >= amount => {
                product.quantity_on_hand -= amount;
                product.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn increment_back(&self, id: ProductId, amount: u32) -> Result<()> {
        let mut products = self.products.write().await;
        let product = products.get_mut(&id).ok_or_else(|| StoreError::NotFound {
            entity: "product",
            id: id.to_string(),
        })?;

        product.quantity_on_hand = product
            .quantity_on_hand
            .checked_add(amount)
            .ok_or_else(|| StoreError::Conflict(format!("stock overflow for product {id}")))?;
        product.updated_at = Utc::now();
        Ok(())
    }
}
