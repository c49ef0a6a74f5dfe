//! All-or-nothing stock commit with compensation.

use store::{CatalogStore, CatalogStoreExt, CommittedLineItem, ProductId, StoreError};

use crate::error::{FulfillmentError, Result};
use crate::line_item::aggregate_demand;
use crate::retry::RetryPolicy;

/// Outcome of one decrement attempt against one product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attempt {
    Applied,
    Insufficient { available: u32 },
    /// The guard lost a race but the stock is still there. Safe to retry.
    TransientStoreConflict,
}

/// Applies an order's stock decrements atomically per product.
///
/// Demand is summed per product and applied in ascending product id order,
/// so two orders touching the same products always meet in the same order.
/// If any product fails, every decrement already applied by this commit is
/// reversed, newest first, and the catalog is left as it was found.
#[derive(Debug, Clone)]
pub struct InventoryCommitter<C> {
    catalog: C,
    retry: RetryPolicy,
}

impl<C: CatalogStore> InventoryCommitter<C> {
    pub fn new(catalog: C, retry: RetryPolicy) -> Self {
        Self { catalog, retry }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Decrements stock for every item, or for none of them.
    ///
    /// On success returns the per-product amounts that were applied, in the
    /// order they were applied.
    #[tracing::instrument(skip(self, items), fields(line_items = items.len()))]
    pub async fn commit(&self, items: &[CommittedLineItem]) -> Result<Vec<(ProductId, u32)>> {
        let demand = aggregate_demand(items);
        let mut applied: Vec<(ProductId, u32)> = Vec::with_capacity(demand.len());

        for (product_id, requested) in demand {
            match self.reserve(product_id, requested).await {
                Ok(amount) => applied.push((product_id, amount)),
                Err(err) => {
                    tracing::info!(
                        %product_id,
                        error = %err,
                        applied = applied.len(),
                        "commit failed, compensating"
                    );
                    self.compensate(&applied).await?;
                    return Err(err);
                }
            }
        }

        Ok(applied)
    }

    /// Decrements one product by `requested`, retrying lost races.
    async fn reserve(&self, product_id: ProductId, requested: u64) -> Result<u32> {
        let Ok(amount) = u32::try_from(requested) else {
            let available = self.available(product_id).await?;
            return Err(FulfillmentError::InsufficientStock {
                product_id,
                requested,
                available: u64::from(available),
            });
        };

        let mut attempt = 1;
        loop {
            match self.try_decrement(product_id, amount).await? {
                Attempt::Applied => return Ok(amount),
                Attempt::Insufficient { available } => {
                    return Err(FulfillmentError::InsufficientStock {
                        product_id,
                        requested,
                        available: u64::from(available),
                    });
                }
                Attempt::TransientStoreConflict if attempt >= self.retry.max_attempts => {
                    let available = self.available(product_id).await?;
                    tracing::warn!(%product_id, attempt, available, "commit retries exhausted");
                    return Err(FulfillmentError::InsufficientStock {
                        product_id,
                        requested,
                        available: u64::from(available),
                    });
                }
                Attempt::TransientStoreConflict => {
                    metrics::counter!("order_commit_retries_total").increment(1);
                    tracing::debug!(%product_id, attempt, "retrying conflicted decrement");
                    tokio::time::sleep(self.retry.delay_after(attempt)).await;
                    attempt += 1;
                }
            }
        }
    }

    async fn try_decrement(&self, product_id: ProductId, amount: u32) -> Result<Attempt> {
        match self.catalog.conditional_decrement(product_id, amount).await {
            Ok(true) => Ok(Attempt::Applied),
            Ok(false) => {
                // Refused: either the stock is really gone, or another writer
                // held it at the instant of the guard and has since released it.
                let available = self.available(product_id).await?;
                if available >= amount {
                    Ok(Attempt::TransientStoreConflict)
                } else {
                    Ok(Attempt::Insufficient { available })
                }
            }
            Err(err) if err.is_transient() => {
                tracing::debug!(%product_id, error = %err, "transient store conflict");
                Ok(Attempt::TransientStoreConflict)
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn available(&self, product_id: ProductId) -> Result<u32> {
        match self.catalog.require(product_id).await {
            Ok(product) => Ok(product.quantity_on_hand),
            Err(StoreError::NotFound { .. }) => Err(FulfillmentError::ProductNotFound(product_id)),
            Err(err) => Err(err.into()),
        }
    }

    /// Reverses `applied` newest first.
    ///
    /// Every entry is attempted even if an earlier one fails; the first
    /// failure is returned after all attempts.
    async fn compensate(&self, applied: &[(ProductId, u32)]) -> Result<()> {
        let mut first_failure = None;

        for &(product_id, amount) in applied.iter().rev() {
            metrics::counter!("order_compensations_total").increment(1);
            if let Err(err) = self.increment_back(product_id, amount).await {
                tracing::error!(
                    %product_id,
                    amount,
                    error = %err,
                    "compensation failed, stock needs reconciliation"
                );
                first_failure.get_or_insert(FulfillmentError::CompensationFailed {
                    product_id,
                    amount,
                    reason: err.to_string(),
                });
            }
        }

        match first_failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn increment_back(&self, product_id: ProductId, amount: u32) -> store::Result<()> {
        let mut attempt = 1;
        loop {
            match self.catalog.increment_back(product_id, amount).await {
                Ok(()) => return Ok(()),
                Err(err) if attempt < self.retry.max_attempts => {
                    tracing::warn!(%product_id, amount, attempt, error = %err, "retrying compensation");
                    tokio::time::sleep(self.retry.delay_after(attempt)).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;
    use store::{InMemoryCatalogStore, NewProduct, PageRequest, Product, ProductPatch};

    use super::*;

    /// Catalog that injects failures in front of an in-memory store.
    #[derive(Clone, Default)]
    struct FlakyCatalog {
        inner: InMemoryCatalogStore,
        conflicts_remaining: Arc<AtomicU32>,
        increment_failures_remaining: Arc<AtomicU32>,
    }

    impl FlakyCatalog {
        fn conflict_next(&self, times: u32) {
            self.conflicts_remaining.store(times, Ordering::SeqCst);
        }

        fn fail_increments(&self, times: u32) {
            self.increment_failures_remaining.store(times, Ordering::SeqCst);
        }

        fn take(counter: &AtomicU32) -> bool {
            counter
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
        }
    }

    #[async_trait]
    impl CatalogStore for FlakyCatalog {
        async fn insert(&self, product: NewProduct) -> store::Result<Product> {
            self.inner.insert(product).await
        }

        async fn get(&self, id: ProductId) -> store::Result<Option<Product>> {
            self.inner.get(id).await
        }

        async fn list(&self, page: PageRequest) -> store::Result<Vec<Product>> {
            self.inner.list(page).await
        }

        async fn update(&self, id: ProductId, patch: ProductPatch) -> store::Result<Option<Product>> {
            self.inner.update(id, patch).await
        }

        async fn delete(&self, id: ProductId) -> store::Result<Option<Product>> {
            self.inner.delete(id).await
        }

        async fn fetch_by_ids(&self, ids: &BTreeSet<ProductId>) -> store::Result<Vec<Product>> {
            self.inner.fetch_by_ids(ids).await
        }

        async fn conditional_decrement(&self, id: ProductId, amount: u32) -> store::Result<bool> {
            if Self::take(&self.conflicts_remaining) {
                return Err(StoreError::Conflict("serialization failure".to_string()));
            }
            self.inner.conditional_decrement(id, amount).await
        }

        async fn increment_back(&self, id: ProductId, amount: u32) -> store::Result<()> {
            if Self::take(&self.increment_failures_remaining) {
                return Err(StoreError::Unavailable("catalog offline".to_string()));
            }
            self.inner.increment_back(id, amount).await
        }
    }

    async fn product(catalog: &impl CatalogStore, qty: u32) -> ProductId {
        catalog
            .insert(NewProduct::new("Widget", "", qty))
            .await
            .unwrap()
            .id
    }

    fn fast_retry(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, std::time::Duration::from_millis(1))
    }

    #[tokio::test]
    async fn commits_summed_demand_per_product() {
        let catalog = InMemoryCatalogStore::new();
        let p = product(&catalog, 10).await;
        let committer = InventoryCommitter::new(catalog.clone(), fast_retry(3));

        let applied = committer
            .commit(&[CommittedLineItem::new(p, 3), CommittedLineItem::new(p, 4)])
            .await
            .unwrap();

        assert_eq!(applied, vec![(p, 7)]);
        assert_eq!(catalog.snapshot().await[&p], 3);
    }

    #[tokio::test]
    async fn applies_products_in_ascending_id_order() {
        let catalog = InMemoryCatalogStore::new();
        let a = product(&catalog, 5).await;
        let b = product(&catalog, 5).await;
        let committer = InventoryCommitter::new(catalog, fast_retry(3));

        let applied = committer
            .commit(&[CommittedLineItem::new(a, 1), CommittedLineItem::new(b, 1)])
            .await
            .unwrap();

        let mut expected = vec![(a, 1), (b, 1)];
        expected.sort();
        assert_eq!(applied, expected);
    }

    #[tokio::test]
    async fn insufficient_stock_leaves_catalog_untouched() {
        let catalog = InMemoryCatalogStore::new();
        let a = product(&catalog, 10).await;
        let b = product(&catalog, 10).await;
        let (first, second) = if a < b { (a, b) } else { (b, a) };
        // Drain the product committed second so the first one needs reversing.
        catalog.conditional_decrement(second, 9).await.unwrap();
        let before = catalog.snapshot().await;
        let committer = InventoryCommitter::new(catalog.clone(), fast_retry(3));

        let err = committer
            .commit(&[
                CommittedLineItem::new(first, 4),
                CommittedLineItem::new(second, 2),
            ])
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            FulfillmentError::InsufficientStock { product_id, requested: 2, available: 1 }
                if product_id == second
        ));
        assert_eq!(catalog.snapshot().await, before);
    }

    #[tokio::test]
    async fn retries_transient_conflicts() {
        let catalog = FlakyCatalog::default();
        let p = product(&catalog, 10).await;
        catalog.conflict_next(2);
        let committer = InventoryCommitter::new(catalog.clone(), fast_retry(3));

        committer.commit(&[CommittedLineItem::new(p, 4)]).await.unwrap();
        assert_eq!(catalog.inner.snapshot().await[&p], 6);
    }

    #[tokio::test]
    async fn exhausted_retries_surface_as_insufficient_stock() {
        let catalog = FlakyCatalog::default();
        let p = product(&catalog, 10).await;
        catalog.conflict_next(5);
        let committer = InventoryCommitter::new(catalog.clone(), fast_retry(2));

        let err = committer.commit(&[CommittedLineItem::new(p, 4)]).await.unwrap_err();
        assert!(matches!(
            err,
            FulfillmentError::InsufficientStock { requested: 4, available: 10, .. }
        ));
        assert_eq!(catalog.inner.snapshot().await[&p], 10);
    }

    #[tokio::test]
    async fn oversized_demand_is_rejected_without_decrementing() {
        let catalog = InMemoryCatalogStore::new();
        let p = product(&catalog, 10).await;
        let committer = InventoryCommitter::new(catalog.clone(), fast_retry(1));

        let err = committer
            .commit(&[
                CommittedLineItem::new(p, u32::MAX),
                CommittedLineItem::new(p, u32::MAX),
            ])
            .await
            .unwrap_err();

        assert!(matches!(err, FulfillmentError::InsufficientStock { available: 10, .. }));
        assert_eq!(catalog.snapshot().await[&p], 10);
    }

    #[tokio::test]
    async fn compensation_retries_before_giving_up() {
        let catalog = FlakyCatalog::default();
        let mut ids = vec![product(&catalog, 10).await, product(&catalog, 10).await];
        ids.sort();
        catalog.inner.conditional_decrement(ids[1], 10).await.unwrap();
        let committer = InventoryCommitter::new(catalog.clone(), fast_retry(3));
        catalog.fail_increments(2);

        let err = committer
            .commit(&[
                CommittedLineItem::new(ids[0], 4),
                CommittedLineItem::new(ids[1], 1),
            ])
            .await
            .unwrap_err();

        assert!(matches!(err, FulfillmentError::InsufficientStock { .. }));
        assert_eq!(catalog.inner.snapshot().await[&ids[0]], 10);
    }

    #[tokio::test]
    async fn failed_compensation_is_surfaced() {
        let catalog = FlakyCatalog::default();
        let mut ids = vec![product(&catalog, 10).await, product(&catalog, 10).await];
        ids.sort();
        catalog.inner.conditional_decrement(ids[1], 10).await.unwrap();
        let committer = InventoryCommitter::new(catalog.clone(), fast_retry(2));
        catalog.fail_increments(2);

        let err = committer
            .commit(&[
                CommittedLineItem::new(ids[0], 3),
                CommittedLineItem::new(ids[1], 1),
            ])
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            FulfillmentError::CompensationFailed { product_id, amount: 3, .. } if product_id == ids[0]
        ));
        assert!(err.needs_reconciliation());
    }
}
