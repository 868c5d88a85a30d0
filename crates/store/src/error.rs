use common::{OrderId, ProductId, Version};
use thiserror::Error;

/// Errors that can occur when interacting with the catalog or order stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A compare-and-swap update lost a race: the stored version did not
    /// match the version the caller read.
    #[error("version conflict for order {order_id}: expected version {expected}, found {actual}")]
    VersionConflict {
        order_id: OrderId,
        expected: Version,
        actual: Version,
    },

    /// The order-number uniqueness constraint rejected an insert. The whole
    /// creation may be retried from scratch.
    #[error("order number already exists: {order_number}")]
    DuplicateOrderNumber { order_number: String },

    /// The order was not found.
    #[error("order not found: {0}")]
    OrderNotFound(OrderId),

    /// The product was not found.
    #[error("product not found: {0}")]
    ProductNotFound(ProductId),

    /// A database error occurred.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A serialization/deserialization error occurred.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
