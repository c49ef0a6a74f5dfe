use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{OrderId, ProductId, UserId};

/// A line item whose quantity has been reserved against the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommittedLineItem {
    pub product_id: ProductId,
    pub ordered_quantity: u32,
}

impl CommittedLineItem {
    pub fn new(product_id: ProductId, ordered_quantity: u32) -> Self {
        Self {
            product_id,
            ordered_quantity,
        }
    }
}

/// An immutable entry in a user's order history.
///
/// `id` and `created_at` are assigned by the [`OrderStore`](crate::OrderStore)
/// when the order is appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub items: Vec<CommittedLineItem>,
    pub created_at: DateTime<Utc>,
}
