//! Order store contract.

use async_trait::async_trait;
use chrono::NaiveDate;
use common::{OrderId, UserId};
use domain::Order;

use crate::error::Result;
use crate::query::OrderQuery;
use crate::stats::{OrderStats, ProductSales, SellerStats};

/// Persistence contract for order documents.
///
/// Orders are owned exclusively by the operation mutating them: every
/// `update` is a compare-and-swap on the document version, so two racing
/// transition requests cannot both succeed. `insert` enforces the
/// order-number uniqueness constraint as the backstop behind the per-day
/// sequence counter.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persists a freshly created order.
    ///
    /// Fails with [`StoreError::DuplicateOrderNumber`] if the order number
    /// is already taken.
    ///
    /// [`StoreError::DuplicateOrderNumber`]: crate::StoreError::DuplicateOrderNumber
    async fn insert(&self, order: &Order) -> Result<()>;

    /// Looks up one order.
    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>>;

    /// Writes an updated order, conditioned on `order.version` still being
    /// the stored version. On success the stored version is bumped and the
    /// stored document returned; on a lost race this fails with
    /// [`StoreError::VersionConflict`].
    ///
    /// [`StoreError::VersionConflict`]: crate::StoreError::VersionConflict
    async fn update(&self, order: &Order) -> Result<Order>;

    /// Atomically increments and returns the order sequence for the given
    /// calendar day, starting at 1. Replaces count-then-format sequencing
    /// so no read-then-write race exists.
    async fn next_daily_sequence(&self, date: NaiveDate) -> Result<u32>;

    /// Returns orders matching the query, newest first.
    async fn query(&self, query: &OrderQuery) -> Result<Vec<Order>>;

    /// Returns the number of orders matching the query, ignoring
    /// limit/offset.
    async fn count(&self, query: &OrderQuery) -> Result<u64>;

    /// Rolls up one seller's orders.
    async fn seller_stats(&self, seller: UserId) -> Result<SellerStats>;

    /// Rolls up platform-wide statistics for orders matching the query's
    /// filter fields (limit/offset are ignored).
    async fn order_stats(&self, query: &OrderQuery) -> Result<OrderStats>;

    /// Returns the best-selling products among orders matching the query,
    /// ranked by units sold.
    async fn top_products(&self, query: &OrderQuery, limit: usize) -> Result<Vec<ProductSales>>;
}
