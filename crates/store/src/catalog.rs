//! Catalog store contract.

use async_trait::async_trait;
use common::ProductId;
use domain::Product;

use crate::error::Result;

/// Persistence contract for products and their inventory counters.
///
/// `reserve_stock` is the single place where naive read-then-write logic
/// would oversell under concurrent orders; every implementation must make
/// the conditional decrement atomic.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Looks up one product.
    async fn find_by_id(&self, id: ProductId) -> Result<Option<Product>>;

    /// Looks up a batch of products. Missing ids are simply absent from the
    /// result; the caller decides whether that is an error.
    async fn find_many(&self, ids: &[ProductId]) -> Result<Vec<Product>>;

    /// Atomically decrements `stock` and increments `sold` by `quantity`,
    /// only if `stock >= quantity` at the moment of the update.
    ///
    /// Returns the updated product, or `None` if the condition failed
    /// (insufficient stock) — never a partial update.
    async fn reserve_stock(&self, id: ProductId, quantity: u32) -> Result<Option<Product>>;

    /// Compensates a reservation: increments `stock` by `quantity` and
    /// decrements `sold` by `quantity`, clamping `sold` at zero.
    async fn restore_stock(&self, id: ProductId, quantity: u32) -> Result<Product>;
}
