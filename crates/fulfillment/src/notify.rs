//! Order confirmation notifications.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use store::UserId;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::ledger::EnrichedOrder;

/// A notification could not be delivered.
#[derive(Debug, Error)]
#[error("notification failed: {0}")]
pub struct NotifyError(pub String);

/// Delivers an order confirmation to the user who placed it.
///
/// Called after the order is recorded, on a detached task. Failures are
/// logged and counted but never change the outcome of the order.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify_order_placed(
        &self,
        order: &EnrichedOrder,
        user_id: UserId,
    ) -> Result<(), NotifyError>;
}

/// Notifier that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify_order_placed(
        &self,
        _order: &EnrichedOrder,
        _user_id: UserId,
    ) -> Result<(), NotifyError> {
        Ok(())
    }
}

#[derive(Debug, Default)]
struct InMemoryNotifierState {
    delivered: Vec<(UserId, EnrichedOrder)>,
    attempts: usize,
    fail_on_notify: bool,
}

/// In-memory notifier for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNotifier {
    state: Arc<RwLock<InMemoryNotifierState>>,
}

impl InMemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the notifier to fail every delivery until reset.
    pub async fn set_fail_on_notify(&self, fail: bool) {
        self.state.write().await.fail_on_notify = fail;
    }

    /// Returns every successfully delivered notification.
    pub async fn delivered(&self) -> Vec<(UserId, EnrichedOrder)> {
        self.state.read().await.delivered.clone()
    }

    /// Returns the number of deliveries attempted, failed or not.
    pub async fn attempts(&self) -> usize {
        self.state.read().await.attempts
    }

    /// Waits until at least `count` deliveries were attempted.
    ///
    /// Returns false if `timeout` elapses first.
    pub async fn wait_for_attempts(&self, count: usize, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.attempts().await >= count {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

#[async_trait]
impl Notifier for InMemoryNotifier {
    async fn notify_order_placed(
        &self,
        order: &EnrichedOrder,
        user_id: UserId,
    ) -> Result<(), NotifyError> {
        let mut state = self.state.write().await;
        state.attempts += 1;

        if state.fail_on_notify {
            return Err(NotifyError("mail relay unavailable".to_string()));
        }

        state.delivered.push((user_id, order.clone()));
        Ok(())
    }
}
