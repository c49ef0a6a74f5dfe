//! Placing orders end to end.

use std::sync::Arc;
use std::time::Instant;

use store::{CatalogStore, CommittedLineItem, OrderStore, ProductId, UserId};

use crate::committer::InventoryCommitter;
use crate::error::{FulfillmentError, Result};
use crate::ledger::{EnrichedOrder, OrderLedger};
use crate::line_item::LineItemRequest;
use crate::notify::Notifier;
use crate::retry::RetryPolicy;
use crate::validator::OrderValidator;

struct Engine<C, O, N> {
    validator: OrderValidator<C>,
    committer: InventoryCommitter<C>,
    ledger: OrderLedger<C, O>,
    notifier: N,
}

/// Places and lists orders against a shared catalog.
///
/// Cheap to clone; clones share the same stores and notifier.
pub struct FulfillmentService<C, O, N> {
    engine: Arc<Engine<C, O, N>>,
}

impl<C, O, N> Clone for FulfillmentService<C, O, N> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
        }
    }
}

impl<C, O, N> FulfillmentService<C, O, N>
where
    C: CatalogStore + Clone + 'static,
    O: OrderStore + 'static,
    N: Notifier + 'static,
{
    pub fn new(catalog: C, orders: O, notifier: N, retry: RetryPolicy) -> Self {
        Self {
            engine: Arc::new(Engine {
                validator: OrderValidator::new(catalog.clone()),
                committer: InventoryCommitter::new(catalog.clone(), retry),
                ledger: OrderLedger::new(catalog, orders),
                notifier,
            }),
        }
    }

    /// Validates, commits, and records an order for `user_id`.
    ///
    /// Either every line's stock is decremented and the order is recorded, or
    /// stock is left unchanged and an error is returned. The one exception is
    /// [`FulfillmentError::FulfillmentFailed`]: stock was committed but the
    /// order could not be recorded.
    ///
    /// Once stock starts moving, the remaining steps run to completion on
    /// their own task even if the caller stops waiting.
    #[tracing::instrument(skip(self, items), fields(line_items = items.len()))]
    pub async fn place_order(
        &self,
        user_id: UserId,
        items: Vec<LineItemRequest>,
    ) -> Result<EnrichedOrder> {
        let start = Instant::now();
        let result = self.run(user_id, items).await;

        metrics::histogram!("place_order_duration_seconds").record(start.elapsed().as_secs_f64());
        match &result {
            Ok(order) => {
                metrics::counter!("orders_placed_total").increment(1);
                tracing::info!(order_id = %order.id, items = order.items.len(), "order placed");
            }
            Err(err) if err.is_rejection() => {
                metrics::counter!("orders_rejected_total", "reason" => err.kind()).increment(1);
                tracing::info!(error = %err, "order rejected");
            }
            Err(err) => {
                tracing::warn!(error = %err, "order not placed");
            }
        }

        result
    }

    async fn run(&self, user_id: UserId, items: Vec<LineItemRequest>) -> Result<EnrichedOrder> {
        let committed = self.engine.validator.validate(&items).await?;

        let engine = Arc::clone(&self.engine);
        let task = tokio::spawn(async move {
            let order = engine.commit_and_record(user_id, committed).await?;
            engine.dispatch_notification(order.clone(), user_id);
            Ok(order)
        });

        match task.await {
            Ok(result) => result,
            Err(join_err) => {
                // The task died mid-flight; whatever it committed is unknown.
                tracing::error!(%user_id, error = %join_err, "fulfillment task aborted");
                metrics::counter!("orders_fulfillment_failed_total").increment(1);
                Err(FulfillmentError::FulfillmentFailed {
                    user_id,
                    items: items
                        .iter()
                        .map(|item| CommittedLineItem::new(item.product_id, item.requested_quantity))
                        .collect(),
                    reason: format!("fulfillment task aborted: {join_err}"),
                })
            }
        }
    }

    /// Returns the user's orders, oldest first, with current display fields.
    pub async fn list_orders(&self, user_id: UserId) -> Result<Vec<EnrichedOrder>> {
        self.engine.ledger.history(user_id).await
    }
}

impl<C, O, N> Engine<C, O, N>
where
    C: CatalogStore + 'static,
    O: OrderStore + 'static,
    N: Notifier + 'static,
{
    async fn commit_and_record(
        &self,
        user_id: UserId,
        items: Vec<CommittedLineItem>,
    ) -> Result<EnrichedOrder> {
        let applied = self.committer.commit(&items).await?;

        let order = match self.ledger.append(user_id, items.clone()).await {
            Ok(order) => order,
            Err(err) => return Err(fulfillment_failed(user_id, items, &applied, err.to_string())),
        };

        Ok(self.ledger.enrich(&order).await)
    }

    fn dispatch_notification(self: &Arc<Self>, order: EnrichedOrder, user_id: UserId) {
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(err) = engine.notifier.notify_order_placed(&order, user_id).await {
                metrics::counter!("order_notifications_failed_total").increment(1);
                tracing::warn!(order_id = %order.id, %user_id, error = %err, "order notification failed");
            }
        });
    }
}

fn fulfillment_failed(
    user_id: UserId,
    items: Vec<CommittedLineItem>,
    applied: &[(ProductId, u32)],
    reason: String,
) -> FulfillmentError {
    metrics::counter!("orders_fulfillment_failed_total").increment(1);
    tracing::error!(
        %user_id,
        ?items,
        decremented = ?applied,
        reason = %reason,
        "stock committed but order not recorded, needs reconciliation"
    );
    FulfillmentError::FulfillmentFailed {
        user_id,
        items,
        reason,
    }
}
