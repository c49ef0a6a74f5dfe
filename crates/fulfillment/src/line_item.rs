//! Requested line items.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use store::{CommittedLineItem, ProductId};

/// One requested (product, quantity) pair. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItemRequest {
    pub product_id: ProductId,
    #[serde(alias = "quantity")]
    pub requested_quantity: u32,
}

impl LineItemRequest {
    pub fn new(product_id: ProductId, requested_quantity: u32) -> Self {
        Self {
            product_id,
            requested_quantity,
        }
    }
}

/// Anything that demands a quantity of a product.
pub(crate) trait Demand {
    fn product_id(&self) -> ProductId;
    fn quantity(&self) -> u32;
}

impl Demand for LineItemRequest {
    fn product_id(&self) -> ProductId {
        self.product_id
    }

    fn quantity(&self) -> u32 {
        self.requested_quantity
    }
}

impl Demand for CommittedLineItem {
    fn product_id(&self) -> ProductId {
        self.product_id
    }

    fn quantity(&self) -> u32 {
        self.ordered_quantity
    }
}

/// Sums quantities per product, keyed in ascending product id order.
///
/// Duplicate entries for the same product add up rather than replace.
pub(crate) fn aggregate_demand<D: Demand>(items: &[D]) -> BTreeMap<ProductId, u64> {
    let mut demand = BTreeMap::new();
    for item in items {
        *demand.entry(item.product_id()).or_insert(0u64) += u64::from(item.quantity());
    }
    demand
}
