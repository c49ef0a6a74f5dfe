use async_trait::async_trait;

use crate::{CommittedLineItem, Order, Result, UserId};

/// Append-only per-user order history.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Appends a new order to the user's history.
    ///
    /// The store assigns the order id and creation timestamp.
    async fn append_order(&self, user_id: UserId, items: Vec<CommittedLineItem>)
    -> Result<Order>;

    /// Returns the user's orders in insertion order (oldest first).
    async fn list_orders(&self, user_id: UserId) -> Result<Vec<Order>>;
}
