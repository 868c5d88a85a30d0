//! The order document and its parts.

use chrono::{DateTime, Utc};
use common::{Money, OrderId, ProductId, UserId, Version};
use serde::{Deserialize, Serialize};

use crate::commission::calculate_commission;
use crate::status::{InvalidTransition, OrderStatus, PaymentMethod, PaymentStatus};

/// A line item frozen at order-creation time.
///
/// `price_at_purchase` captures the product's price when the order was
/// placed; later catalog price changes never affect an existing order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product: ProductId,

    pub quantity: u32,

    pub price_at_purchase: Money,

    /// Free-form buyer customization note, if the product supports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customization: Option<String>,
}

impl OrderItem {
    /// Returns the line total (`price_at_purchase * quantity`).
    pub fn line_total(&self) -> Money {
        self.price_at_purchase.multiply(self.quantity)
    }
}

/// Structured delivery address, validated present at creation and immutable
/// afterward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub full_name: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    pub country: String,
}

impl ShippingAddress {
    /// Returns the name of the first required field that is empty, if any.
    pub fn missing_field(&self) -> Option<&'static str> {
        let required = [
            ("full_name", &self.full_name),
            ("phone", &self.phone),
            ("address", &self.address),
            ("city", &self.city),
            ("country", &self.country),
        ];
        required
            .into_iter()
            .find(|(_, value)| value.trim().is_empty())
            .map(|(field, _)| field)
    }
}

/// The validated input from which an order document is built.
///
/// Assembled by the engine after item validation, stock checks, and
/// order-number generation.
#[derive(Debug, Clone)]
pub struct OrderDraft {
    pub order_number: String,
    pub buyer: UserId,
    pub seller: UserId,
    pub items: Vec<OrderItem>,
    pub payment_method: PaymentMethod,
    pub shipping_address: ShippingAddress,
}

/// One buyer's purchase transaction.
///
/// Created by the lifecycle engine on successful stock reservation, mutated
/// only through guarded status transitions, and never physically deleted —
/// cancellation and refund are states, not deletions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,

    /// Unique human-readable identifier, `ORD-YYYYMMDD-NNN`.
    pub order_number: String,

    pub buyer: UserId,

    /// The seller fulfilling every item in this order (mixed-seller carts
    /// are rejected at creation).
    pub seller: UserId,

    pub items: Vec<OrderItem>,

    /// Sum of line totals, frozen at creation.
    pub total_amount: Money,

    /// Platform cut of `total_amount`.
    pub commission: Money,

    /// `total_amount - commission`, owed to the seller.
    pub seller_earnings: Money,

    pub status: OrderStatus,

    pub payment_method: PaymentMethod,

    pub payment_status: PaymentStatus,

    /// Provider transaction reference recorded by payment callbacks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,

    pub shipping_address: ShippingAddress,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracking_number: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_delivery: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivered_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancellation_reason: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    /// Optimistic-concurrency version, bumped by the store on every update.
    #[serde(default)]
    pub version: Version,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Builds a pending order from a validated draft.
    ///
    /// Computes the total from the frozen line items and splits it at the
    /// given commission rate, so `commission + seller_earnings ==
    /// total_amount` holds by construction.
    pub fn create(draft: OrderDraft, commission_rate_bps: u32, now: DateTime<Utc>) -> Self {
        let total_amount: Money = draft.items.iter().map(OrderItem::line_total).sum();
        let split = calculate_commission(total_amount, commission_rate_bps);

        Self {
            id: OrderId::new(),
            order_number: draft.order_number,
            buyer: draft.buyer,
            seller: draft.seller,
            items: draft.items,
            total_amount,
            commission: split.commission,
            seller_earnings: split.seller_earnings,
            status: OrderStatus::Pending,
            payment_method: draft.payment_method,
            payment_status: PaymentStatus::Pending,
            transaction_id: None,
            shipping_address: draft.shipping_address,
            tracking_number: None,
            estimated_delivery: None,
            delivered_at: None,
            cancelled_at: None,
            cancellation_reason: None,
            notes: None,
            version: Version::initial(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies a transition permitted by the transition table, stamping the
    /// matching timestamp exactly once.
    pub fn transition_to(
        &mut self,
        next: OrderStatus,
        now: DateTime<Utc>,
    ) -> Result<(), InvalidTransition> {
        self.status.validate_transition(next)?;
        self.status = next;
        match next {
            OrderStatus::Delivered => self.delivered_at = Some(now),
            OrderStatus::Cancelled => self.cancelled_at = Some(now),
            _ => {}
        }
        Ok(())
    }

    /// Returns true if the given user placed this order.
    pub fn is_buyer(&self, user: &UserId) -> bool {
        self.buyer == *user
    }

    /// Returns true if the given user is the fulfilling seller.
    pub fn is_seller(&self, user: &UserId) -> bool {
        self.seller == *user
    }

    /// Returns the total quantity across all line items.
    pub fn total_quantity(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commission::DEFAULT_COMMISSION_RATE_BPS;

    fn address() -> ShippingAddress {
        ShippingAddress {
            full_name: "Amina W.".to_string(),
            phone: "+254700000000".to_string(),
            address: "12 Riverside Dr".to_string(),
            city: "Nairobi".to_string(),
            postal_code: Some("00100".to_string()),
            country: "KE".to_string(),
        }
    }

    fn draft(items: Vec<OrderItem>) -> OrderDraft {
        OrderDraft {
            order_number: "ORD-20240115-001".to_string(),
            buyer: UserId::new(),
            seller: UserId::new(),
            items,
            payment_method: PaymentMethod::Mpesa,
            shipping_address: address(),
        }
    }

    fn item(price: i64, quantity: u32) -> OrderItem {
        OrderItem {
            product: ProductId::new(),
            quantity,
            price_at_purchase: Money::from_cents(price),
            customization: None,
        }
    }

    #[test]
    fn create_computes_totals_and_split() {
        let order = Order::create(
            draft(vec![item(10_000, 2), item(500, 1)]),
            DEFAULT_COMMISSION_RATE_BPS,
            Utc::now(),
        );

        assert_eq!(order.total_amount, Money::from_cents(20_500));
        assert_eq!(order.commission, Money::from_cents(2_050));
        assert_eq!(order.seller_earnings, Money::from_cents(18_450));
        assert_eq!(order.commission + order.seller_earnings, order.total_amount);
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.payment_status, PaymentStatus::Pending);
        assert_eq!(order.version, Version::initial());
    }

    #[test]
    fn transition_stamps_delivered_at_once() {
        let mut order = Order::create(
            draft(vec![item(1_000, 1)]),
            DEFAULT_COMMISSION_RATE_BPS,
            Utc::now(),
        );
        order.status = OrderStatus::Shipped;

        let now = Utc::now();
        order.transition_to(OrderStatus::Delivered, now).unwrap();
        assert_eq!(order.status, OrderStatus::Delivered);
        assert_eq!(order.delivered_at, Some(now));
        assert_eq!(order.cancelled_at, None);
    }

    #[test]
    fn transition_stamps_cancelled_at() {
        let mut order = Order::create(
            draft(vec![item(1_000, 1)]),
            DEFAULT_COMMISSION_RATE_BPS,
            Utc::now(),
        );

        let now = Utc::now();
        order.transition_to(OrderStatus::Cancelled, now).unwrap();
        assert_eq!(order.cancelled_at, Some(now));
    }

    #[test]
    fn illegal_transition_leaves_order_untouched() {
        let mut order = Order::create(
            draft(vec![item(1_000, 1)]),
            DEFAULT_COMMISSION_RATE_BPS,
            Utc::now(),
        );

        let err = order
            .transition_to(OrderStatus::Delivered, Utc::now())
            .unwrap_err();
        assert_eq!(err.from, OrderStatus::Pending);
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.delivered_at, None);
    }

    #[test]
    fn address_missing_field_reports_first_empty() {
        let mut addr = address();
        assert_eq!(addr.missing_field(), None);

        addr.city = "  ".to_string();
        assert_eq!(addr.missing_field(), Some("city"));

        addr.full_name = String::new();
        assert_eq!(addr.missing_field(), Some("full_name"));
    }

    #[test]
    fn postal_code_is_optional() {
        let mut addr = address();
        addr.postal_code = None;
        assert_eq!(addr.missing_field(), None);
    }

    #[test]
    fn order_serialization_roundtrip() {
        let order = Order::create(
            draft(vec![item(2_500, 3)]),
            DEFAULT_COMMISSION_RATE_BPS,
            Utc::now(),
        );
        let json = serde_json::to_string(&order).unwrap();
        let back: Order = serde_json::from_str(&json).unwrap();
        assert_eq!(order, back);
    }

    #[test]
    fn total_quantity_sums_line_items() {
        let order = Order::create(
            draft(vec![item(1_000, 2), item(1_000, 5)]),
            DEFAULT_COMMISSION_RATE_BPS,
            Utc::now(),
        );
        assert_eq!(order.total_quantity(), 7);
    }
}
