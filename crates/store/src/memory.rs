//! In-memory store implementations.
//!
//! Reference semantics for the persistence contracts, used by unit and
//! integration tests. Both stores take a single write lock for every
//! mutation, which makes the conditional stock decrement and the
//! compare-and-swap order update atomic the same way the PostgreSQL
//! statements are.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use common::{Money, OrderId, ProductId, UserId};
use domain::{Order, OrderStatus, Product};
use tokio::sync::RwLock;

use crate::catalog::CatalogStore;
use crate::error::{Result, StoreError};
use crate::orders::OrderStore;
use crate::query::OrderQuery;
use crate::stats::{OrderStats, ProductSales, SellerStats};

/// In-memory catalog store.
#[derive(Clone, Default)]
pub struct InMemoryCatalogStore {
    products: Arc<RwLock<HashMap<ProductId, Product>>>,
}

impl InMemoryCatalogStore {
    /// Creates a new empty catalog store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a product.
    pub async fn insert(&self, product: Product) {
        self.products.write().await.insert(product.id, product);
    }

    /// Returns a snapshot of one product, for assertions in tests.
    pub async fn get(&self, id: ProductId) -> Option<Product> {
        self.products.read().await.get(&id).cloned()
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalogStore {
    async fn find_by_id(&self, id: ProductId) -> Result<Option<Product>> {
        Ok(self.products.read().await.get(&id).cloned())
    }

    async fn find_many(&self, ids: &[ProductId]) -> Result<Vec<Product>> {
        let products = self.products.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| products.get(id).cloned())
            .collect())
    }

    async fn reserve_stock(&self, id: ProductId, quantity: u32) -> Result<Option<Product>> {
        let mut products = self.products.write().await;
        let Some(product) = products.get_mut(&id) else {
            return Err(StoreError::ProductNotFound(id));
        };

        if product.stock < quantity {
            return Ok(None);
        }

        product.stock -= quantity;
        product.sold += quantity;
        Ok(Some(product.clone()))
    }

    async fn restore_stock(&self, id: ProductId, quantity: u32) -> Result<Product> {
        let mut products = self.products.write().await;
        let product = products
            .get_mut(&id)
            .ok_or(StoreError::ProductNotFound(id))?;

        product.stock += quantity;
        product.sold = product.sold.saturating_sub(quantity);
        Ok(product.clone())
    }
}

#[derive(Default)]
struct OrderStoreState {
    orders: HashMap<OrderId, Order>,
    daily_sequences: HashMap<NaiveDate, u32>,
}

/// In-memory order store.
#[derive(Clone, Default)]
pub struct InMemoryOrderStore {
    state: Arc<RwLock<OrderStoreState>>,
}

impl InMemoryOrderStore {
    /// Creates a new empty order store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of stored orders.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }
}

fn matches(query: &OrderQuery, order: &Order) -> bool {
    if let Some(buyer) = query.buyer
        && order.buyer != buyer
    {
        return false;
    }
    if let Some(seller) = query.seller
        && order.seller != seller
    {
        return false;
    }
    if let Some(status) = query.status
        && order.status != status
    {
        return false;
    }
    if let Some(from) = query.created_from
        && order.created_at < from
    {
        return false;
    }
    if let Some(to) = query.created_to
        && order.created_at > to
    {
        return false;
    }
    if let Some(ref fragment) = query.order_number_contains
        && !order
            .order_number
            .to_lowercase()
            .contains(&fragment.to_lowercase())
    {
        return false;
    }
    true
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn insert(&self, order: &Order) -> Result<()> {
        let mut state = self.state.write().await;

        // Simulates the unique constraint on order_number.
        if state
            .orders
            .values()
            .any(|existing| existing.order_number == order.order_number)
        {
            return Err(StoreError::DuplicateOrderNumber {
                order_number: order.order_number.clone(),
            });
        }

        state.orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>> {
        Ok(self.state.read().await.orders.get(&id).cloned())
    }

    async fn update(&self, order: &Order) -> Result<Order> {
        let mut state = self.state.write().await;
        let stored = state
            .orders
            .get_mut(&order.id)
            .ok_or(StoreError::OrderNotFound(order.id))?;

        if stored.version != order.version {
            return Err(StoreError::VersionConflict {
                order_id: order.id,
                expected: order.version,
                actual: stored.version,
            });
        }

        let mut updated = order.clone();
        updated.version = order.version.next();
        updated.updated_at = Utc::now();
        *stored = updated.clone();
        Ok(updated)
    }

    async fn next_daily_sequence(&self, date: NaiveDate) -> Result<u32> {
        let mut state = self.state.write().await;
        let seq = state.daily_sequences.entry(date).or_insert(0);
        *seq += 1;
        Ok(*seq)
    }

    async fn query(&self, query: &OrderQuery) -> Result<Vec<Order>> {
        let state = self.state.read().await;
        let mut orders: Vec<Order> = state
            .orders
            .values()
            .filter(|order| matches(query, order))
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let offset = query.offset.unwrap_or(0);
        let orders: Vec<Order> = orders
            .into_iter()
            .skip(offset)
            .take(query.limit.unwrap_or(usize::MAX))
            .collect();
        Ok(orders)
    }

    async fn count(&self, query: &OrderQuery) -> Result<u64> {
        let state = self.state.read().await;
        Ok(state
            .orders
            .values()
            .filter(|order| matches(query, order))
            .count() as u64)
    }

    async fn seller_stats(&self, seller: UserId) -> Result<SellerStats> {
        let state = self.state.read().await;
        let mut stats = SellerStats::default();
        for order in state.orders.values().filter(|o| o.seller == seller) {
            stats.total_orders += 1;
            stats.total_revenue += order.seller_earnings;
            if order.status == OrderStatus::Pending {
                stats.pending_orders += 1;
            }
        }
        Ok(stats)
    }

    async fn order_stats(&self, query: &OrderQuery) -> Result<OrderStats> {
        let state = self.state.read().await;
        let mut stats = OrderStats::default();
        for order in state.orders.values().filter(|o| matches(query, o)) {
            stats.total_orders += 1;
            stats.total_revenue += order.total_amount;
            stats.total_commission += order.commission;
            *stats.by_status.entry(order.status).or_insert(0) += 1;
        }
        if stats.total_orders > 0 {
            stats.average_order_value =
                Money::from_cents(stats.total_revenue.cents() / stats.total_orders as i64);
        }
        Ok(stats)
    }

    async fn top_products(&self, query: &OrderQuery, limit: usize) -> Result<Vec<ProductSales>> {
        let state = self.state.read().await;
        let mut by_product: HashMap<ProductId, (u64, Money)> = HashMap::new();
        for order in state.orders.values().filter(|o| matches(query, o)) {
            for item in &order.items {
                let entry = by_product
                    .entry(item.product)
                    .or_insert((0, Money::zero()));
                entry.0 += item.quantity as u64;
                entry.1 += item.line_total();
            }
        }

        let mut sales: Vec<ProductSales> = by_product
            .into_iter()
            .map(|(product, (total_quantity, total_revenue))| ProductSales {
                product,
                total_quantity,
                total_revenue,
            })
            .collect();
        sales.sort_by(|a, b| b.total_quantity.cmp(&a.total_quantity));
        sales.truncate(limit);
        Ok(sales)
    }
}
