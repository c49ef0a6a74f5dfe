use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::{CommittedLineItem, Order, OrderId, OrderStore, Result, StoreError, UserId};

#[derive(Debug, Default)]
struct OrderHistoryState {
    histories: HashMap<UserId, Vec<Order>>,
    fail_on_append: bool,
}

/// In-memory order history store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOrderStore {
    state: Arc<RwLock<OrderHistoryState>>,
}

impl InMemoryOrderStore {
    /// Creates a new empty order store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the store to fail every append until reset.
    pub async fn set_fail_on_append(&self, fail: bool) {
        self.state.write().await.fail_on_append = fail;
    }

    /// Returns the total number of orders across all users.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.histories.values().map(Vec::len).sum()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn append_order(
        &self,
        user_id: UserId,
        items: Vec<CommittedLineItem>,
    ) -> Result<Order> {
        let mut state = self.state.write().await;

        if state.fail_on_append {
            return Err(StoreError::Unavailable(
                "order history rejected the append".to_string(),
            ));
        }

        let order = Order {
            id: OrderId::new(),
            user_id,
            items,
            created_at: Utc::now(),
        };
        state
            .histories
            .entry(user_id)
            .or_default()
            .push(order.clone());

        Ok(order)
    }

    async fn list_orders(&self, user_id: UserId) -> Result<Vec<Order>> {
        Ok(self
            .state
            .read()
            .await
            .histories
            .get(&user_id)
            .cloned()
            .unwrap_or_default())
    }
}
