//! PostgreSQL-backed store implementations.
//!
//! The concurrency contracts live in the SQL itself: stock reservation is a
//! single conditional `UPDATE ... WHERE stock >= $qty RETURNING`, order
//! updates are `UPDATE ... WHERE version = $expected`, and the daily
//! sequence is an upsert-increment on a one-row-per-day counter table.

use async_trait::async_trait;
use chrono::NaiveDate;
use common::{Money, OrderId, ProductId, UserId, Version};
use domain::{Order, OrderItem, Product, ShippingAddress};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::catalog::CatalogStore;
use crate::error::{Result, StoreError};
use crate::orders::OrderStore;
use crate::query::OrderQuery;
use crate::stats::{OrderStats, ProductSales, SellerStats};

const ORDER_COLUMNS: &str = "id, order_number, buyer, seller, items, total_cents, \
     commission_cents, seller_earnings_cents, status, payment_method, payment_status, \
     transaction_id, shipping_address, tracking_number, estimated_delivery, delivered_at, \
     cancelled_at, cancellation_reason, notes, version, created_at, updated_at";

const PRODUCT_COLUMNS: &str = "id, seller, name, price_cents, stock, sold";

/// Runs the database migrations.
pub async fn run_migrations(pool: &PgPool) -> std::result::Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../migrations").run(pool).await
}

fn row_to_product(row: PgRow) -> Result<Product> {
    Ok(Product {
        id: ProductId::from_uuid(row.try_get::<Uuid, _>("id")?),
        seller: UserId::from_uuid(row.try_get::<Uuid, _>("seller")?),
        name: row.try_get("name")?,
        price: Money::from_cents(row.try_get("price_cents")?),
        stock: row.try_get::<i64, _>("stock")? as u32,
        sold: row.try_get::<i64, _>("sold")? as u32,
    })
}

fn row_to_order(row: PgRow) -> Result<Order> {
    let items: Vec<OrderItem> = serde_json::from_value(row.try_get("items")?)?;
    let shipping_address: ShippingAddress =
        serde_json::from_value(row.try_get("shipping_address")?)?;

    // Statuses are stored as their lowercase wire form; parse back through
    // the same serde representation.
    let status = serde_json::from_value(serde_json::Value::String(
        row.try_get::<String, _>("status")?,
    ))?;
    let payment_method = serde_json::from_value(serde_json::Value::String(
        row.try_get::<String, _>("payment_method")?,
    ))?;
    let payment_status = serde_json::from_value(serde_json::Value::String(
        row.try_get::<String, _>("payment_status")?,
    ))?;

    Ok(Order {
        id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
        order_number: row.try_get("order_number")?,
        buyer: UserId::from_uuid(row.try_get::<Uuid, _>("buyer")?),
        seller: UserId::from_uuid(row.try_get::<Uuid, _>("seller")?),
        items,
        total_amount: Money::from_cents(row.try_get("total_cents")?),
        commission: Money::from_cents(row.try_get("commission_cents")?),
        seller_earnings: Money::from_cents(row.try_get("seller_earnings_cents")?),
        status,
        payment_method,
        payment_status,
        transaction_id: row.try_get("transaction_id")?,
        shipping_address,
        tracking_number: row.try_get("tracking_number")?,
        estimated_delivery: row.try_get("estimated_delivery")?,
        delivered_at: row.try_get("delivered_at")?,
        cancelled_at: row.try_get("cancelled_at")?,
        cancellation_reason: row.try_get("cancellation_reason")?,
        notes: row.try_get("notes")?,
        version: Version::new(row.try_get("version")?),
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// PostgreSQL catalog store.
#[derive(Clone)]
pub struct PostgresCatalogStore {
    pool: PgPool,
}

impl PostgresCatalogStore {
    /// Creates a new PostgreSQL catalog store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Inserts or replaces a product. Intended for seeding and tests.
    pub async fn insert(&self, product: &Product) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO products (id, seller, name, price_cents, stock, sold)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE
            SET seller = $2, name = $3, price_cents = $4, stock = $5, sold = $6
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(product.seller.as_uuid())
        .bind(&product.name)
        .bind(product.price.cents())
        .bind(product.stock as i64)
        .bind(product.sold as i64)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl CatalogStore for PostgresCatalogStore {
    async fn find_by_id(&self, id: ProductId) -> Result<Option<Product>> {
        let row = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(row_to_product).transpose()
    }

    async fn find_many(&self, ids: &[ProductId]) -> Result<Vec<Product>> {
        let uuids: Vec<Uuid> = ids.iter().map(|id| id.as_uuid()).collect();
        let rows = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ANY($1)"
        ))
        .bind(&uuids)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_product).collect()
    }

    async fn reserve_stock(&self, id: ProductId, quantity: u32) -> Result<Option<Product>> {
        // The WHERE clause is the whole point: the decrement only applies
        // when enough stock exists at the moment of the update.
        let row = sqlx::query(&format!(
            r#"
            UPDATE products
            SET stock = stock - $2, sold = sold + $2
            WHERE id = $1 AND stock >= $2
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(id.as_uuid())
        .bind(quantity as i64)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(row_to_product(row)?)),
            None => {
                // Distinguish "insufficient stock" from "no such product".
                if self.find_by_id(id).await?.is_none() {
                    Err(StoreError::ProductNotFound(id))
                } else {
                    Ok(None)
                }
            }
        }
    }

    async fn restore_stock(&self, id: ProductId, quantity: u32) -> Result<Product> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE products
            SET stock = stock + $2, sold = GREATEST(sold - $2, 0)
            WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(id.as_uuid())
        .bind(quantity as i64)
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or(StoreError::ProductNotFound(id))
            .and_then(row_to_product)
    }
}

/// PostgreSQL order store.
#[derive(Clone)]
pub struct PostgresOrderStore {
    pool: PgPool,
}

impl PostgresOrderStore {
    /// Creates a new PostgreSQL order store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Appends `AND ...` clauses for every set filter and returns the number of
/// parameters consumed. Binding order must mirror this exactly.
fn push_filter_sql(sql: &mut String, query: &OrderQuery, mut param_count: usize) -> usize {
    if query.buyer.is_some() {
        param_count += 1;
        sql.push_str(&format!(" AND buyer = ${param_count}"));
    }
    if query.seller.is_some() {
        param_count += 1;
        sql.push_str(&format!(" AND seller = ${param_count}"));
    }
    if query.status.is_some() {
        param_count += 1;
        sql.push_str(&format!(" AND status = ${param_count}"));
    }
    if query.created_from.is_some() {
        param_count += 1;
        sql.push_str(&format!(" AND created_at >= ${param_count}"));
    }
    if query.created_to.is_some() {
        param_count += 1;
        sql.push_str(&format!(" AND created_at <= ${param_count}"));
    }
    if query.order_number_contains.is_some() {
        param_count += 1;
        sql.push_str(&format!(" AND order_number ILIKE ${param_count}"));
    }
    param_count
}

fn bind_filters<'q>(
    mut q: sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments>,
    query: &'q OrderQuery,
) -> sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments> {
    if let Some(buyer) = query.buyer {
        q = q.bind(buyer.as_uuid());
    }
    if let Some(seller) = query.seller {
        q = q.bind(seller.as_uuid());
    }
    if let Some(status) = query.status {
        q = q.bind(status.as_str());
    }
    if let Some(from) = query.created_from {
        q = q.bind(from);
    }
    if let Some(to) = query.created_to {
        q = q.bind(to);
    }
    if let Some(ref fragment) = query.order_number_contains {
        q = q.bind(format!("%{fragment}%"));
    }
    q
}

#[async_trait]
impl OrderStore for PostgresOrderStore {
    async fn insert(&self, order: &Order) -> Result<()> {
        let items = serde_json::to_value(&order.items)?;
        let shipping_address = serde_json::to_value(&order.shipping_address)?;

        sqlx::query(
            r#"
            INSERT INTO orders (
                id, order_number, buyer, seller, items, total_cents,
                commission_cents, seller_earnings_cents, status, payment_method,
                payment_status, transaction_id, shipping_address, tracking_number,
                estimated_delivery, delivered_at, cancelled_at, cancellation_reason,
                notes, version, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                    $15, $16, $17, $18, $19, $20, $21, $22)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(&order.order_number)
        .bind(order.buyer.as_uuid())
        .bind(order.seller.as_uuid())
        .bind(items)
        .bind(order.total_amount.cents())
        .bind(order.commission.cents())
        .bind(order.seller_earnings.cents())
        .bind(order.status.as_str())
        .bind(order.payment_method.as_str())
        .bind(order.payment_status.as_str())
        .bind(&order.transaction_id)
        .bind(shipping_address)
        .bind(&order.tracking_number)
        .bind(order.estimated_delivery)
        .bind(order.delivered_at)
        .bind(order.cancelled_at)
        .bind(&order.cancellation_reason)
        .bind(&order.notes)
        .bind(order.version.as_i64())
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            // The unique constraint on order_number is the sequencing backstop.
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("orders_order_number_key")
            {
                return StoreError::DuplicateOrderNumber {
                    order_number: order.order_number.clone(),
                };
            }
            StoreError::Database(e)
        })?;

        Ok(())
    }

    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(row_to_order).transpose()
    }

    async fn update(&self, order: &Order) -> Result<Order> {
        // Immutable-at-creation fields (items, amounts, address) are
        // deliberately absent from the SET list.
        let row = sqlx::query(&format!(
            r#"
            UPDATE orders
            SET status = $3, payment_status = $4, transaction_id = $5,
                tracking_number = $6, estimated_delivery = $7, delivered_at = $8,
                cancelled_at = $9, cancellation_reason = $10, notes = $11,
                version = version + 1, updated_at = NOW()
            WHERE id = $1 AND version = $2
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(order.id.as_uuid())
        .bind(order.version.as_i64())
        .bind(order.status.as_str())
        .bind(order.payment_status.as_str())
        .bind(&order.transaction_id)
        .bind(&order.tracking_number)
        .bind(order.estimated_delivery)
        .bind(order.delivered_at)
        .bind(order.cancelled_at)
        .bind(&order.cancellation_reason)
        .bind(&order.notes)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => row_to_order(row),
            None => {
                let actual: Option<i64> =
                    sqlx::query_scalar("SELECT version FROM orders WHERE id = $1")
                        .bind(order.id.as_uuid())
                        .fetch_optional(&self.pool)
                        .await?;

                match actual {
                    Some(actual) => Err(StoreError::VersionConflict {
                        order_id: order.id,
                        expected: order.version,
                        actual: Version::new(actual),
                    }),
                    None => Err(StoreError::OrderNotFound(order.id)),
                }
            }
        }
    }

    async fn next_daily_sequence(&self, date: NaiveDate) -> Result<u32> {
        let seq: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO order_counters (day, seq)
            VALUES ($1, 1)
            ON CONFLICT (day) DO UPDATE SET seq = order_counters.seq + 1
            RETURNING seq
            "#,
        )
        .bind(date)
        .fetch_one(&self.pool)
        .await?;

        Ok(seq as u32)
    }

    async fn query(&self, query: &OrderQuery) -> Result<Vec<Order>> {
        let mut sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE 1=1");
        let mut param_count = push_filter_sql(&mut sql, query, 0);
        sql.push_str(" ORDER BY created_at DESC");

        if query.limit.is_some() {
            param_count += 1;
            sql.push_str(&format!(" LIMIT ${param_count}"));
        }
        if query.offset.is_some() {
            param_count += 1;
            sql.push_str(&format!(" OFFSET ${param_count}"));
        }

        let mut q = bind_filters(sqlx::query(&sql), query);
        if let Some(limit) = query.limit {
            q = q.bind(limit as i64);
        }
        if let Some(offset) = query.offset {
            q = q.bind(offset as i64);
        }

        let rows = q.fetch_all(&self.pool).await?;
        rows.into_iter().map(row_to_order).collect()
    }

    async fn count(&self, query: &OrderQuery) -> Result<u64> {
        let mut sql = String::from("SELECT COUNT(*) FROM orders WHERE 1=1");
        push_filter_sql(&mut sql, query, 0);

        let mut q = sqlx::query_scalar::<_, i64>(&sql);
        if let Some(buyer) = query.buyer {
            q = q.bind(buyer.as_uuid());
        }
        if let Some(seller) = query.seller {
            q = q.bind(seller.as_uuid());
        }
        if let Some(status) = query.status {
            q = q.bind(status.as_str());
        }
        if let Some(from) = query.created_from {
            q = q.bind(from);
        }
        if let Some(to) = query.created_to {
            q = q.bind(to);
        }
        if let Some(ref fragment) = query.order_number_contains {
            q = q.bind(format!("%{fragment}%"));
        }

        Ok(q.fetch_one(&self.pool).await? as u64)
    }

    async fn seller_stats(&self, seller: UserId) -> Result<SellerStats> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS total_orders,
                   COALESCE(SUM(seller_earnings_cents), 0)::bigint AS total_revenue,
                   COUNT(*) FILTER (WHERE status = 'pending') AS pending_orders
            FROM orders
            WHERE seller = $1
            "#,
        )
        .bind(seller.as_uuid())
        .fetch_one(&self.pool)
        .await?;

        Ok(SellerStats {
            total_orders: row.try_get::<i64, _>("total_orders")? as u64,
            total_revenue: Money::from_cents(row.try_get("total_revenue")?),
            pending_orders: row.try_get::<i64, _>("pending_orders")? as u64,
        })
    }

    async fn order_stats(&self, query: &OrderQuery) -> Result<OrderStats> {
        let mut sql = String::from(
            "SELECT COUNT(*) AS total_orders, \
             COALESCE(SUM(total_cents), 0)::bigint AS total_revenue, \
             COALESCE(SUM(commission_cents), 0)::bigint AS total_commission \
             FROM orders WHERE 1=1",
        );
        push_filter_sql(&mut sql, query, 0);

        let row = bind_filters(sqlx::query(&sql), query)
            .fetch_one(&self.pool)
            .await?;

        let total_orders = row.try_get::<i64, _>("total_orders")? as u64;
        let total_revenue = Money::from_cents(row.try_get("total_revenue")?);
        let total_commission = Money::from_cents(row.try_get("total_commission")?);
        let average_order_value = if total_orders > 0 {
            Money::from_cents(total_revenue.cents() / total_orders as i64)
        } else {
            Money::zero()
        };

        let mut by_status_sql =
            String::from("SELECT status, COUNT(*) AS n FROM orders WHERE 1=1");
        push_filter_sql(&mut by_status_sql, query, 0);
        by_status_sql.push_str(" GROUP BY status");

        let rows = bind_filters(sqlx::query(&by_status_sql), query)
            .fetch_all(&self.pool)
            .await?;

        let mut by_status = std::collections::HashMap::new();
        for row in rows {
            let status = serde_json::from_value(serde_json::Value::String(
                row.try_get::<String, _>("status")?,
            ))?;
            by_status.insert(status, row.try_get::<i64, _>("n")? as u64);
        }

        Ok(OrderStats {
            total_orders,
            total_revenue,
            total_commission,
            average_order_value,
            by_status,
        })
    }

    async fn top_products(&self, query: &OrderQuery, limit: usize) -> Result<Vec<ProductSales>> {
        let mut sql = String::from(
            "SELECT (item->>'product')::uuid AS product, \
             SUM((item->>'quantity')::bigint)::bigint AS total_quantity, \
             SUM((item->>'quantity')::bigint * (item->>'price_at_purchase')::bigint)::bigint AS total_revenue \
             FROM orders, jsonb_array_elements(items) AS item WHERE 1=1",
        );
        let mut param_count = push_filter_sql(&mut sql, query, 0);
        param_count += 1;
        sql.push_str(&format!(
            " GROUP BY 1 ORDER BY total_quantity DESC LIMIT ${param_count}"
        ));

        let rows = bind_filters(sqlx::query(&sql), query)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|row| {
                Ok(ProductSales {
                    product: ProductId::from_uuid(row.try_get::<Uuid, _>("product")?),
                    total_quantity: row.try_get::<i64, _>("total_quantity")? as u64,
                    total_revenue: Money::from_cents(row.try_get("total_revenue")?),
                })
            })
            .collect()
    }
}
