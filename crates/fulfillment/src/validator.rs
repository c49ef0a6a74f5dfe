//! Feasibility check for a requested order.

use std::collections::{BTreeSet, HashMap};

use store::{CatalogStore, CommittedLineItem, ProductId};

use crate::error::{FulfillmentError, Result};
use crate::line_item::{LineItemRequest, aggregate_demand};

/// Decides whether an order can be satisfied from current stock.
///
/// Reads the catalog once and never mutates it. A passing result is advisory:
/// stock may change before the commit, which re-checks atomically.
#[derive(Debug, Clone)]
pub struct OrderValidator<C> {
    catalog: C,
}

impl<C: CatalogStore> OrderValidator<C> {
    pub fn new(catalog: C) -> Self {
        Self { catalog }
    }

    /// Validates `items` and returns them as committed line items.
    ///
    /// Demand is summed per product before comparing against stock, so two
    /// lines of 3 against a stock of 5 are rejected. The output preserves
    /// request order and keeps duplicate lines separate.
    ///
    /// Unknown products are reported before insufficient stock; among several
    /// failures of the same kind the lowest product id wins.
    #[tracing::instrument(skip(self, items), fields(line_items = items.len()))]
    pub async fn validate(&self, items: &[LineItemRequest]) -> Result<Vec<CommittedLineItem>> {
        if items.is_empty() {
            return Err(FulfillmentError::EmptyOrder);
        }

        if let Some(item) = items.iter().find(|item| item.requested_quantity == 0) {
            return Err(FulfillmentError::InvalidQuantity {
                product_id: item.product_id,
            });
        }

        let demand = aggregate_demand(items);
        let ids: BTreeSet<ProductId> = demand.keys().copied().collect();
        let stock: HashMap<ProductId, u32> = self
            .catalog
            .fetch_by_ids(&ids)
            .await?
            .into_iter()
            .map(|product| (product.id, product.quantity_on_hand))
            .collect();

        if let Some(missing) = ids.iter().find(|id| !stock.contains_key(id)) {
            return Err(FulfillmentError::ProductNotFound(*missing));
        }

        for (product_id, requested) in &demand {
            let available = stock.get(product_id).copied().unwrap_or_default();
            if *requested > u64::from(available) {
                tracing::debug!(%product_id, requested, available, "order exceeds stock");
                return Err(FulfillmentError::InsufficientStock {
                    product_id: *product_id,
                    requested: *requested,
                    available: u64::from(available),
                });
            }
        }

        Ok(items
            .iter()
            .map(|item| CommittedLineItem::new(item.product_id, item.requested_quantity))
            .collect())
    }
}
