//! Engine error taxonomy.

use common::{OrderId, ProductId, UserId};
use domain::{InvalidTransition, OrderStatus};
use store::StoreError;
use thiserror::Error;

/// Errors that can occur during order lifecycle operations.
///
/// Every variant carries enough structured data for the caller to react
/// programmatically; the rendered message is for logging.
#[derive(Debug, Error)]
pub enum OrderEngineError {
    /// Order creation was attempted with no line items.
    #[error("order must contain at least one item")]
    EmptyItems,

    /// A line item carried a zero quantity.
    #[error("invalid quantity {quantity} for product {product_id} (must be at least 1)")]
    InvalidQuantity {
        product_id: ProductId,
        quantity: u32,
    },

    /// A required shipping-address field was empty.
    #[error("shipping address field '{field}' is required")]
    IncompleteShippingAddress { field: &'static str },

    /// Shipping was requested without a tracking number.
    #[error("tracking number is required")]
    MissingTrackingNumber,

    /// Line items reference products owned by more than one seller.
    #[error("order items span multiple sellers ({first} and {second})")]
    MixedSellers { first: UserId, second: UserId },

    /// A referenced product does not exist.
    #[error("product not found: {0}")]
    ProductNotFound(ProductId),

    /// The order does not exist.
    #[error("order not found: {0}")]
    OrderNotFound(OrderId),

    /// A product had less stock than requested at check or reservation time.
    #[error(
        "insufficient stock for product {product_id}: available {available}, requested {requested}"
    )]
    InsufficientStock {
        product_id: ProductId,
        available: u32,
        requested: u32,
    },

    /// The transition table rejected the requested status change.
    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),

    /// Buyer cancellation was requested past the cancellable window.
    #[error("cannot cancel order in {status} status; only pending or confirmed orders can be cancelled")]
    NotCancellable { status: OrderStatus },

    /// Shipping was requested from the wrong status.
    #[error("cannot ship order in {status} status; order must be confirmed or processing")]
    NotShippable { status: OrderStatus },

    /// Refund was requested from the wrong status.
    #[error("cannot refund order in {status} status; only delivered or cancelled orders can be refunded")]
    NotRefundable { status: OrderStatus },

    /// The actor lacks permission for this operation.
    #[error("not authorized to {action}")]
    Forbidden { action: &'static str },

    /// A store-level failure; see [`OrderEngineError::is_retryable`].
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl OrderEngineError {
    /// Returns true if retrying the whole operation from scratch may
    /// succeed: lost compare-and-swap races, order-number collisions, and
    /// transient database failures. The engine itself never auto-retries,
    /// to avoid masking repeated races.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            OrderEngineError::Store(
                StoreError::VersionConflict { .. }
                    | StoreError::DuplicateOrderNumber { .. }
                    | StoreError::Database(_)
            )
        )
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, OrderEngineError>;
