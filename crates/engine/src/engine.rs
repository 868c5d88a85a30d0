//! The order lifecycle orchestrator.

use std::collections::HashMap;

use chrono::{Duration, Utc};
use common::{Actor, OrderId, ProductId, UserId};
use domain::{
    Order, OrderDraft, OrderItem, OrderStatus, PaymentMethod, PaymentStatus, Product,
    ShippingAddress, format_order_number,
};
use store::{CatalogStore, OrderQuery, OrderStats, OrderStore, ProductSales, SellerStats};

use crate::config::EngineConfig;
use crate::error::{OrderEngineError, Result};

/// A requested line item, before prices are frozen.
#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub product: ProductId,
    pub quantity: u32,
    pub customization: Option<String>,
}

/// Input to [`OrderEngine::create_order`].
#[derive(Debug, Clone)]
pub struct CreateOrderRequest {
    pub items: Vec<NewOrderItem>,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
}

/// 1-based pagination parameters for listings.
#[derive(Debug, Clone, Copy)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self { page: 1, limit: 20 }
    }
}

impl PageRequest {
    fn normalized(self) -> Self {
        Self {
            page: self.page.max(1),
            limit: self.limit.max(1),
        }
    }

    fn offset(&self) -> usize {
        ((self.page - 1) * self.limit) as usize
    }
}

/// One page of an order listing.
#[derive(Debug, Clone)]
pub struct OrderPage {
    pub orders: Vec<Order>,
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub pages: u64,
}

/// Orchestrates every order mutation.
///
/// Consistency guarantee for creation: stock is reserved first with one
/// atomic conditional decrement per product, and the order row is inserted
/// last. Any failure after a partial reservation restores the already
/// reserved items before the error is returned, so a failed creation leaves
/// stock counters at their pre-call values and no order behind.
///
/// Every subsequent mutation is a compare-and-swap on the order's version;
/// the losing side of a concurrent transition race gets a retryable
/// conflict instead of silently clobbering the winner.
pub struct OrderEngine<C, O> {
    catalog: C,
    orders: O,
    config: EngineConfig,
}

impl<C, O> OrderEngine<C, O>
where
    C: CatalogStore,
    O: OrderStore,
{
    /// Creates an engine with the default configuration.
    pub fn new(catalog: C, orders: O) -> Self {
        Self::with_config(catalog, orders, EngineConfig::default())
    }

    /// Creates an engine with an explicit configuration.
    pub fn with_config(catalog: C, orders: O, config: EngineConfig) -> Self {
        Self {
            catalog,
            orders,
            config,
        }
    }

    /// Creates an order for the acting buyer.
    ///
    /// Validates the request, freezes current prices into the line items,
    /// reserves stock, computes the commission split, and persists the
    /// order as `pending`/`pending`.
    #[tracing::instrument(skip(self, request), fields(buyer = %actor.id))]
    pub async fn create_order(&self, actor: &Actor, request: CreateOrderRequest) -> Result<Order> {
        metrics::counter!("orders_create_attempts_total").increment(1);
        let start = std::time::Instant::now();

        if request.items.is_empty() {
            return Err(OrderEngineError::EmptyItems);
        }
        for item in &request.items {
            if item.quantity == 0 {
                return Err(OrderEngineError::InvalidQuantity {
                    product_id: item.product,
                    quantity: item.quantity,
                });
            }
        }
        if let Some(field) = request.shipping_address.missing_field() {
            return Err(OrderEngineError::IncompleteShippingAddress { field });
        }

        // Batch-fetch all referenced products.
        let ids: Vec<ProductId> = request.items.iter().map(|item| item.product).collect();
        let products: HashMap<ProductId, Product> = self
            .catalog
            .find_many(&ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let mut seller: Option<UserId> = None;
        let mut frozen_items = Vec::with_capacity(request.items.len());

        for item in &request.items {
            let product = products
                .get(&item.product)
                .ok_or(OrderEngineError::ProductNotFound(item.product))?;

            // Single-seller-per-order: a cart spanning sellers is rejected
            // rather than silently attributed to the first one.
            match seller {
                None => seller = Some(product.seller),
                Some(first) if first != product.seller => {
                    return Err(OrderEngineError::MixedSellers {
                        first,
                        second: product.seller,
                    });
                }
                Some(_) => {}
            }

            // Fail fast before touching any counter; the reservation below
            // re-checks atomically.
            if !product.has_stock(item.quantity) {
                return Err(OrderEngineError::InsufficientStock {
                    product_id: product.id,
                    available: product.stock,
                    requested: item.quantity,
                });
            }

            frozen_items.push(OrderItem {
                product: product.id,
                quantity: item.quantity,
                price_at_purchase: product.price,
                customization: item.customization.clone(),
            });
        }
        let seller = seller.ok_or(OrderEngineError::EmptyItems)?;

        let now = Utc::now();
        let sequence = self.orders.next_daily_sequence(now.date_naive()).await?;
        let order_number = format_order_number(now.date_naive(), sequence);

        // Reserve stock item by item; each reservation is an atomic
        // conditional decrement, and earlier reservations are compensated
        // if a later one loses a race.
        let mut reserved: Vec<(ProductId, u32)> = Vec::with_capacity(frozen_items.len());
        for item in &frozen_items {
            match self.catalog.reserve_stock(item.product, item.quantity).await {
                Ok(Some(_)) => reserved.push((item.product, item.quantity)),
                Ok(None) => {
                    metrics::counter!("stock_reservation_failures_total").increment(1);
                    tracing::warn!(
                        product = %item.product,
                        requested = item.quantity,
                        "stock reservation lost a race, rolling back"
                    );
                    self.release_reservations(&reserved).await;

                    let available = self
                        .catalog
                        .find_by_id(item.product)
                        .await?
                        .map(|p| p.stock)
                        .unwrap_or(0);
                    return Err(OrderEngineError::InsufficientStock {
                        product_id: item.product,
                        available,
                        requested: item.quantity,
                    });
                }
                Err(e) => {
                    self.release_reservations(&reserved).await;
                    return Err(e.into());
                }
            }
        }

        let order = Order::create(
            OrderDraft {
                order_number,
                buyer: actor.id,
                seller,
                items: frozen_items,
                payment_method: request.payment_method,
                shipping_address: request.shipping_address,
            },
            self.config.commission_rate_bps,
            now,
        );

        if let Err(e) = self.orders.insert(&order).await {
            // Order-number collision or transient failure: every
            // reservation made above is compensated before surfacing.
            self.release_reservations(&reserved).await;
            return Err(e.into());
        }

        metrics::counter!("orders_created_total").increment(1);
        metrics::histogram!("order_creation_duration_seconds")
            .record(start.elapsed().as_secs_f64());
        tracing::info!(
            order = %order.id,
            order_number = %order.order_number,
            total = %order.total_amount,
            "order created"
        );
        Ok(order)
    }

    /// Loads an order on behalf of an actor who must be its buyer, its
    /// seller, or an admin.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, order_id: OrderId, actor: &Actor) -> Result<Order> {
        let order = self.load_order(order_id).await?;
        if actor.is_admin() || order.is_buyer(&actor.id) || order.is_seller(&actor.id) {
            Ok(order)
        } else {
            Err(OrderEngineError::Forbidden {
                action: "view this order",
            })
        }
    }

    /// Applies a status change permitted by the transition table.
    ///
    /// Seller-of-order or admin only. Transitioning to `delivered` or
    /// `cancelled` stamps the matching timestamp; note that cancellation
    /// through this generic operation does not restore stock — that is
    /// [`OrderEngine::cancel_order`]'s job.
    #[tracing::instrument(skip(self))]
    pub async fn update_status(
        &self,
        order_id: OrderId,
        requested: OrderStatus,
        actor: &Actor,
    ) -> Result<Order> {
        let mut order = self.load_order(order_id).await?;
        self.ensure_seller_or_admin(&order, actor, "update the status of this order")?;

        order.transition_to(requested, Utc::now())?;
        Ok(self.orders.update(&order).await?)
    }

    /// Seller accepts a pending order.
    #[tracing::instrument(skip(self))]
    pub async fn confirm_order(&self, order_id: OrderId, actor: &Actor) -> Result<Order> {
        let mut order = self.load_order(order_id).await?;
        self.ensure_seller_or_admin(&order, actor, "confirm this order")?;

        order.transition_to(OrderStatus::Confirmed, Utc::now())?;
        Ok(self.orders.update(&order).await?)
    }

    /// Buyer-initiated cancellation, allowed only while the order is
    /// pending or confirmed. Restores stock for every line item.
    ///
    /// The compare-and-swap status update is the commit point: it claims
    /// the order before any counter moves, so a cancellation racing a
    /// shipment can never restore stock for an order that actually
    /// shipped. If a restoration fails afterwards the error is surfaced
    /// as retryable while the order stays cancelled.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_order(
        &self,
        order_id: OrderId,
        actor: &Actor,
        reason: Option<String>,
    ) -> Result<Order> {
        let mut order = self.load_order(order_id).await?;
        if !actor.is_admin() && !order.is_buyer(&actor.id) {
            return Err(OrderEngineError::Forbidden {
                action: "cancel this order",
            });
        }

        if !order.status.can_cancel() {
            return Err(OrderEngineError::NotCancellable {
                status: order.status,
            });
        }

        order.transition_to(OrderStatus::Cancelled, Utc::now())?;
        order.cancellation_reason =
            Some(reason.unwrap_or_else(|| "cancelled by buyer".to_string()));
        let order = self.orders.update(&order).await?;

        self.restore_items(&order).await?;

        metrics::counter!("orders_cancelled_total").increment(1);
        tracing::info!(order = %order.id, "order cancelled, stock restored");
        Ok(order)
    }

    /// Seller hands the order to a carrier.
    ///
    /// Allowed from `confirmed` or `processing` (a deliberate shortcut past
    /// the one-step-at-a-time table); requires a tracking number and stamps
    /// the delivery estimate.
    #[tracing::instrument(skip(self))]
    pub async fn ship_order(
        &self,
        order_id: OrderId,
        actor: &Actor,
        tracking_number: &str,
    ) -> Result<Order> {
        let mut order = self.load_order(order_id).await?;
        self.ensure_seller_or_admin(&order, actor, "ship this order")?;

        if !matches!(
            order.status,
            OrderStatus::Confirmed | OrderStatus::Processing
        ) {
            return Err(OrderEngineError::NotShippable {
                status: order.status,
            });
        }
        if tracking_number.trim().is_empty() {
            return Err(OrderEngineError::MissingTrackingNumber);
        }

        order.status = OrderStatus::Shipped;
        order.tracking_number = Some(tracking_number.to_string());
        order.estimated_delivery =
            Some(Utc::now() + Duration::days(self.config.default_delivery_days));
        Ok(self.orders.update(&order).await?)
    }

    /// Buyer confirms receipt of a shipped order.
    #[tracing::instrument(skip(self))]
    pub async fn confirm_delivery(&self, order_id: OrderId, actor: &Actor) -> Result<Order> {
        let mut order = self.load_order(order_id).await?;
        if !actor.is_admin() && !order.is_buyer(&actor.id) {
            return Err(OrderEngineError::Forbidden {
                action: "confirm delivery of this order",
            });
        }

        order.transition_to(OrderStatus::Delivered, Utc::now())?;
        Ok(self.orders.update(&order).await?)
    }

    /// Admin-only refund of a delivered or cancelled order.
    ///
    /// Restores stock for every line item (the same compensation as
    /// cancellation) and marks the payment refunded. Refunding a cancelled
    /// order is the one move outside the transition table, which is why the
    /// status is set directly here.
    #[tracing::instrument(skip(self))]
    pub async fn refund_order(
        &self,
        order_id: OrderId,
        actor: &Actor,
        reason: Option<String>,
    ) -> Result<Order> {
        self.ensure_admin(actor, "refund orders")?;
        let mut order = self.load_order(order_id).await?;

        if !matches!(
            order.status,
            OrderStatus::Delivered | OrderStatus::Cancelled
        ) {
            return Err(OrderEngineError::NotRefundable {
                status: order.status,
            });
        }

        order.status = OrderStatus::Refunded;
        order.payment_status = PaymentStatus::Refunded;
        order.notes = Some(reason.unwrap_or_else(|| "refund processed by admin".to_string()));
        let order = self.orders.update(&order).await?;

        self.restore_items(&order).await?;

        metrics::counter!("orders_refunded_total").increment(1);
        tracing::info!(order = %order.id, "order refunded");
        Ok(order)
    }

    /// Records the outcome of a payment-provider callback.
    ///
    /// Payment state moves independently of the fulfilment status, so this
    /// never consults the transition table.
    #[tracing::instrument(skip(self))]
    pub async fn record_payment(
        &self,
        order_id: OrderId,
        actor: &Actor,
        payment_status: PaymentStatus,
        transaction_id: Option<String>,
    ) -> Result<Order> {
        self.ensure_admin(actor, "record payment results")?;
        let mut order = self.load_order(order_id).await?;

        order.payment_status = payment_status;
        if transaction_id.is_some() {
            order.transaction_id = transaction_id;
        }
        Ok(self.orders.update(&order).await?)
    }

    /// Lists the acting user's purchases, newest first.
    #[tracing::instrument(skip(self, filter))]
    pub async fn buyer_orders(
        &self,
        actor: &Actor,
        filter: OrderQuery,
        page: PageRequest,
    ) -> Result<OrderPage> {
        let query = filter.buyer(actor.id);
        self.paginate(query, page).await
    }

    /// Lists orders assigned to the acting seller, with the seller's
    /// rollup statistics.
    #[tracing::instrument(skip(self, filter))]
    pub async fn seller_orders(
        &self,
        actor: &Actor,
        filter: OrderQuery,
        page: PageRequest,
    ) -> Result<(OrderPage, SellerStats)> {
        let query = filter.seller(actor.id);
        let page = self.paginate(query, page).await?;
        let stats = self.orders.seller_stats(actor.id).await?;
        Ok((page, stats))
    }

    /// Admin-only listing across all buyers and sellers.
    #[tracing::instrument(skip(self, filter))]
    pub async fn all_orders(
        &self,
        actor: &Actor,
        filter: OrderQuery,
        page: PageRequest,
    ) -> Result<OrderPage> {
        self.ensure_admin(actor, "list all orders")?;
        self.paginate(filter, page).await
    }

    /// Admin-only platform statistics over an optional creation-time range.
    #[tracing::instrument(skip(self, filter))]
    pub async fn order_stats(&self, actor: &Actor, filter: OrderQuery) -> Result<OrderStats> {
        self.ensure_admin(actor, "view order statistics")?;
        Ok(self.orders.order_stats(&filter).await?)
    }

    /// Admin-only best-seller ranking.
    #[tracing::instrument(skip(self, filter))]
    pub async fn top_products(
        &self,
        actor: &Actor,
        filter: OrderQuery,
        limit: usize,
    ) -> Result<Vec<ProductSales>> {
        self.ensure_admin(actor, "view order statistics")?;
        Ok(self.orders.top_products(&filter, limit).await?)
    }

    async fn load_order(&self, order_id: OrderId) -> Result<Order> {
        self.orders
            .find_by_id(order_id)
            .await?
            .ok_or(OrderEngineError::OrderNotFound(order_id))
    }

    fn ensure_seller_or_admin(
        &self,
        order: &Order,
        actor: &Actor,
        action: &'static str,
    ) -> Result<()> {
        if actor.is_admin() || order.is_seller(&actor.id) {
            Ok(())
        } else {
            Err(OrderEngineError::Forbidden { action })
        }
    }

    fn ensure_admin(&self, actor: &Actor, action: &'static str) -> Result<()> {
        if actor.is_admin() {
            Ok(())
        } else {
            Err(OrderEngineError::Forbidden { action })
        }
    }

    /// Compensates the reservations made earlier in a failed creation.
    ///
    /// Restoration failures are logged and the remaining items still
    /// restored; the original failure is what the caller sees.
    async fn release_reservations(&self, reserved: &[(ProductId, u32)]) {
        for (product, quantity) in reserved {
            if let Err(e) = self.catalog.restore_stock(*product, *quantity).await {
                tracing::error!(
                    product = %product,
                    quantity,
                    error = %e,
                    "failed to compensate stock reservation"
                );
            }
        }
    }

    /// Restores stock for every line item of a cancelled or refunded order.
    async fn restore_items(&self, order: &Order) -> Result<()> {
        for item in &order.items {
            self.catalog
                .restore_stock(item.product, item.quantity)
                .await?;
        }
        Ok(())
    }

    async fn paginate(&self, query: OrderQuery, page: PageRequest) -> Result<OrderPage> {
        let page = page.normalized();
        let total = self.orders.count(&query).await?;
        let orders = self
            .orders
            .query(&query.limit(page.limit as usize).offset(page.offset()))
            .await?;

        Ok(OrderPage {
            orders,
            page: page.page,
            limit: page.limit,
            total,
            pages: total.div_ceil(page.limit as u64),
        })
    }
}
