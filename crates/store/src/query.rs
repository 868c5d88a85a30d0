use chrono::{DateTime, Utc};
use common::UserId;
use domain::OrderStatus;

/// Builder for filtering order listings and statistics.
///
/// All filters are optional and combine with AND. Listings are always
/// returned newest first.
#[derive(Debug, Clone, Default)]
pub struct OrderQuery {
    /// Filter by the buyer who placed the order.
    pub buyer: Option<UserId>,

    /// Filter by the fulfilling seller.
    pub seller: Option<UserId>,

    /// Filter by order status.
    pub status: Option<OrderStatus>,

    /// Filter by orders created at or after this timestamp.
    pub created_from: Option<DateTime<Utc>>,

    /// Filter by orders created at or before this timestamp.
    pub created_to: Option<DateTime<Utc>>,

    /// Case-insensitive substring match on the order number.
    pub order_number_contains: Option<String>,

    /// Maximum number of orders to return.
    pub limit: Option<usize>,

    /// Number of orders to skip.
    pub offset: Option<usize>,
}

impl OrderQuery {
    /// Creates a new empty query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a query for one buyer's orders.
    pub fn for_buyer(buyer: UserId) -> Self {
        Self {
            buyer: Some(buyer),
            ..Default::default()
        }
    }

    /// Creates a query for one seller's orders.
    pub fn for_seller(seller: UserId) -> Self {
        Self {
            seller: Some(seller),
            ..Default::default()
        }
    }

    /// Filters by buyer.
    pub fn buyer(mut self, buyer: UserId) -> Self {
        self.buyer = Some(buyer);
        self
    }

    /// Filters by seller.
    pub fn seller(mut self, seller: UserId) -> Self {
        self.seller = Some(seller);
        self
    }

    /// Filters by status.
    pub fn status(mut self, status: OrderStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Filters to orders created at or after this timestamp.
    pub fn created_from(mut self, timestamp: DateTime<Utc>) -> Self {
        self.created_from = Some(timestamp);
        self
    }

    /// Filters to orders created at or before this timestamp.
    pub fn created_to(mut self, timestamp: DateTime<Utc>) -> Self {
        self.created_to = Some(timestamp);
        self
    }

    /// Filters by an order-number substring (case-insensitive).
    pub fn order_number_contains(mut self, fragment: impl Into<String>) -> Self {
        self.order_number_contains = Some(fragment.into());
        self
    }

    /// Limits the number of orders returned.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skips this many orders before returning results.
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }
}
