//! Fulfillment error types.

use store::{CommittedLineItem, ProductId, StoreError, UserId};
use thiserror::Error;

/// Errors that can occur while placing or reading orders.
///
/// Validation and commit errors leave no partial effects. `FulfillmentFailed`
/// and `CompensationFailed` are the two kinds that mean inventory and order
/// history may disagree and need reconciliation.
#[derive(Debug, Error)]
pub enum FulfillmentError {
    /// The request contained no line items.
    #[error("Order has no line items")]
    EmptyOrder,

    /// A line item asked for zero units.
    #[error("Invalid quantity for product {product_id}: must be greater than 0")]
    InvalidQuantity { product_id: ProductId },

    /// A line item references a product that doesn't exist.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// Combined demand for a product exceeds its stock.
    #[error(
        "Insufficient stock for product {product_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        product_id: ProductId,
        requested: u64,
        available: u64,
    },

    /// Stock was committed but the order could not be recorded.
    #[error("Fulfillment failed for user {user_id} after stock was committed: {reason}")]
    FulfillmentFailed {
        user_id: UserId,
        items: Vec<CommittedLineItem>,
        reason: String,
    },

    /// A decrement could not be reversed after a failed commit.
    #[error("Compensation failed for product {product_id} ({amount} units): {reason}")]
    CompensationFailed {
        product_id: ProductId,
        amount: u32,
        reason: String,
    },

    /// The catalog or order store failed before any stock moved.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl FulfillmentError {
    /// Returns true for ordinary rejections of the request itself.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            FulfillmentError::EmptyOrder
                | FulfillmentError::InvalidQuantity { .. }
                | FulfillmentError::ProductNotFound(_)
                | FulfillmentError::InsufficientStock { .. }
        )
    }

    /// Returns true if inventory and order history may now disagree.
    pub fn needs_reconciliation(&self) -> bool {
        matches!(
            self,
            FulfillmentError::FulfillmentFailed { .. } | FulfillmentError::CompensationFailed { .. }
        )
    }

    /// Short label used as a metrics dimension.
    pub fn kind(&self) -> &'static str {
        match self {
            FulfillmentError::EmptyOrder => "empty_order",
            FulfillmentError::InvalidQuantity { .. } => "invalid_quantity",
            FulfillmentError::ProductNotFound(_) => "product_not_found",
            FulfillmentError::InsufficientStock { .. } => "insufficient_stock",
            FulfillmentError::FulfillmentFailed { .. } => "fulfillment_failed",
            FulfillmentError::CompensationFailed { .. } => "compensation_failed",
            FulfillmentError::Store(_) => "store",
        }
    }
}

/// Convenience type alias for fulfillment results.
pub type Result<T> = std::result::Result<T, FulfillmentError>;
