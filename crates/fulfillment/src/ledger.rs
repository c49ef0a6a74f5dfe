//! Order history: recording committed orders and reading them back enriched.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde::Serialize;
use store::{CatalogStore, CommittedLineItem, Order, OrderId, OrderStore, ProductId, UserId};

use crate::error::Result;

/// Display fields resolved from the current catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductDisplay {
    pub name: String,
    pub description: String,
}

/// A committed line item with its product's current display fields.
///
/// `product` is None when the product has since been deleted or the catalog
/// could not be read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnrichedLineItem {
    pub product_id: ProductId,
    pub ordered_quantity: u32,
    pub product: Option<ProductDisplay>,
}

/// An order as returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnrichedOrder {
    pub id: OrderId,
    pub user_id: UserId,
    pub items: Vec<EnrichedLineItem>,
    pub created_at: DateTime<Utc>,
}

impl EnrichedOrder {
    fn from_order(order: &Order, display: &HashMap<ProductId, ProductDisplay>) -> Self {
        Self {
            id: order.id,
            user_id: order.user_id,
            items: order
                .items
                .iter()
                .map(|item| EnrichedLineItem {
                    product_id: item.product_id,
                    ordered_quantity: item.ordered_quantity,
                    product: display.get(&item.product_id).cloned(),
                })
                .collect(),
            created_at: order.created_at,
        }
    }
}

/// Appends committed orders and serves enriched order history.
///
/// Enrichment reads the catalog's current display fields, so a renamed
/// product shows its new name in old orders. Quantities always come from
/// the order itself.
#[derive(Debug, Clone)]
pub struct OrderLedger<C, O> {
    catalog: C,
    orders: O,
}

impl<C: CatalogStore, O: OrderStore> OrderLedger<C, O> {
    pub fn new(catalog: C, orders: O) -> Self {
        Self { catalog, orders }
    }

    /// Records a committed order in the user's history.
    pub async fn append(
        &self,
        user_id: UserId,
        items: Vec<CommittedLineItem>,
    ) -> store::Result<Order> {
        self.orders.append_order(user_id, items).await
    }

    /// Attaches current display fields to `order`.
    ///
    /// Never fails; products that can't be resolved are left bare.
    pub async fn enrich(&self, order: &Order) -> EnrichedOrder {
        let ids = order.items.iter().map(|item| item.product_id).collect();
        let display = self.display_fields(&ids).await;
        EnrichedOrder::from_order(order, &display)
    }

    /// Returns the user's orders oldest first, enriched in one catalog read.
    ///
    /// Read-only; calling it twice without intervening orders yields the
    /// same result.
    #[tracing::instrument(skip(self))]
    pub async fn history(&self, user_id: UserId) -> Result<Vec<EnrichedOrder>> {
        let orders = self.orders.list_orders(user_id).await?;
        let ids = orders
            .iter()
            .flat_map(|order| order.items.iter().map(|item| item.product_id))
            .collect();
        let display = self.display_fields(&ids).await;

        Ok(orders
            .iter()
            .map(|order| EnrichedOrder::from_order(order, &display))
            .collect())
    }

    async fn display_fields(&self, ids: &BTreeSet<ProductId>) -> HashMap<ProductId, ProductDisplay> {
        if ids.is_empty() {
            return HashMap::new();
        }

        match self.catalog.fetch_by_ids(ids).await {
            Ok(products) => products
                .into_iter()
                .map(|product| {
                    (
                        product.id,
                        ProductDisplay {
                            name: product.name,
                            description: product.description,
                        },
                    )
                })
                .collect(),
            Err(err) => {
                tracing::warn!(error = %err, "could not resolve product display fields");
                HashMap::new()
            }
        }
    }
}
