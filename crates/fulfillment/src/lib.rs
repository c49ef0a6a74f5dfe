//! Order fulfillment against shared inventory.
//!
//! Placing an order runs four steps:
//! 1. Validate: one batch read, all-or-nothing feasibility check
//! 2. Commit: one atomic conditional decrement per product, in ascending
//!    product id order, compensated in reverse if any of them fails
//! 3. Record: append the order to the user's history
//! 4. Notify: fire-and-forget confirmation, never affects the result
//!
//! Only a failure in step 3 can leave stock decremented without an order;
//! it surfaces as [`FulfillmentError::FulfillmentFailed`] and is logged for
//! reconciliation.

pub mod committer;
pub mod error;
pub mod ledger;
pub mod line_item;
pub mod notify;
pub mod orchestrator;
pub mod retry;
pub mod validator;

pub use committer::InventoryCommitter;
pub use error::{FulfillmentError, Result};
pub use ledger::{EnrichedLineItem, EnrichedOrder, OrderLedger, ProductDisplay};
pub use line_item::LineItemRequest;
pub use notify::{InMemoryNotifier, NoopNotifier, Notifier, NotifyError};
pub use orchestrator::FulfillmentService;
pub use retry::RetryPolicy;
pub use validator::OrderValidator;
