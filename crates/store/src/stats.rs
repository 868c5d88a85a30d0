//! Statistics read models computed by the order store.

use std::collections::HashMap;

use common::{Money, ProductId};
use domain::OrderStatus;
use serde::{Deserialize, Serialize};

/// Rollup of one seller's orders.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SellerStats {
    /// Number of orders assigned to the seller.
    pub total_orders: u64,

    /// Sum of seller earnings across those orders.
    pub total_revenue: Money,

    /// Orders still awaiting confirmation.
    pub pending_orders: u64,
}

/// Platform-wide order statistics over an optional creation-time range.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStats {
    pub total_orders: u64,

    /// Sum of order totals.
    pub total_revenue: Money,

    /// Sum of platform commissions.
    pub total_commission: Money,

    /// `total_revenue / total_orders`, zero when there are no orders.
    pub average_order_value: Money,

    /// Order counts keyed by status.
    pub by_status: HashMap<OrderStatus, u64>,
}

/// Sales rollup for one product, ranked by quantity sold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSales {
    pub product: ProductId,

    /// Total units across matching orders.
    pub total_quantity: u64,

    /// Total of `quantity * price_at_purchase` across matching orders.
    pub total_revenue: Money,
}
