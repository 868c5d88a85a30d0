//! Product document as the catalog store holds it.

use common::{Money, ProductId, UserId};
use serde::{Deserialize, Serialize};

/// A catalog product with its inventory counters.
///
/// `stock` is the quantity still available for reservation and never goes
/// negative; `sold` is a cumulative counter decremented (clamped at zero)
/// when a reservation is compensated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,

    /// The seller who owns and fulfils this product.
    pub seller: UserId,

    pub name: String,

    /// Current unit price; frozen into order items at purchase time.
    pub price: Money,

    pub stock: u32,

    pub sold: u32,
}

impl Product {
    /// Creates a product with a zero `sold` counter.
    pub fn new(
        id: ProductId,
        seller: UserId,
        name: impl Into<String>,
        price: Money,
        stock: u32,
    ) -> Self {
        Self {
            id,
            seller,
            name: name.into(),
            price,
            stock,
            sold: 0,
        }
    }

    /// Returns true if at least `quantity` units are in stock.
    pub fn has_stock(&self, quantity: u32) -> bool {
        self.stock >= quantity
    }
}
