//! Order lifecycle enums and the status transition table.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The status of an order in its lifecycle.
///
/// Legal transitions:
/// ```text
/// Pending ────┬──► Confirmed ──► Processing ──► Shipped ──► Delivered ──► Refunded
///             │        │
///             └────────┴──► Cancelled
/// ```
///
/// `Cancelled` and `Refunded` are terminal. Refunding a cancelled order is an
/// admin override handled outside this table (see the engine's refund
/// operation); the table itself admits no transition out of `Cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Order created, awaiting seller confirmation.
    #[default]
    Pending,

    /// Seller has accepted the order.
    Confirmed,

    /// Seller has started fulfilment.
    Processing,

    /// Order handed to the carrier.
    Shipped,

    /// Buyer confirmed receipt (terminal except for refund).
    Delivered,

    /// Order was cancelled before fulfilment (terminal state).
    Cancelled,

    /// Payment was returned to the buyer (terminal state).
    Refunded,
}

/// A status transition not permitted by the transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot transition order from {from} to {to}")]
pub struct InvalidTransition {
    pub from: OrderStatus,
    pub to: OrderStatus,
}

impl OrderStatus {
    /// Returns the statuses reachable from this one.
    pub fn allowed_transitions(&self) -> &'static [OrderStatus] {
        match self {
            OrderStatus::Pending => &[OrderStatus::Confirmed, OrderStatus::Cancelled],
            OrderStatus::Confirmed => &[OrderStatus::Processing, OrderStatus::Cancelled],
            OrderStatus::Processing => &[OrderStatus::Shipped],
            OrderStatus::Shipped => &[OrderStatus::Delivered],
            OrderStatus::Delivered => &[OrderStatus::Refunded],
            OrderStatus::Cancelled => &[],
            OrderStatus::Refunded => &[],
        }
    }

    /// Returns true if the transition table permits moving to `next`.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        self.allowed_transitions().contains(&next)
    }

    /// Validates a transition against the table.
    ///
    /// Rejects everything not explicitly listed, including identity
    /// transitions.
    pub fn validate_transition(&self, next: OrderStatus) -> Result<(), InvalidTransition> {
        if self.can_transition_to(next) {
            Ok(())
        } else {
            Err(InvalidTransition {
                from: *self,
                to: next,
            })
        }
    }

    /// Returns true if a buyer may still cancel an order in this status.
    ///
    /// Narrower than the transition table: buyer cancellation is disallowed
    /// once the seller has started processing.
    pub fn can_cancel(&self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Confirmed)
    }

    /// Returns true if this is a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Cancelled | OrderStatus::Refunded)
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Refunded => "refunded",
        }
    }

    /// All statuses, in lifecycle order.
    pub fn all() -> &'static [OrderStatus] {
        &[
            OrderStatus::Pending,
            OrderStatus::Confirmed,
            OrderStatus::Processing,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
            OrderStatus::Refunded,
        ]
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Payment state of an order, updated independently of the order status by
/// payment-callback collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
    Refunded,
}

impl PaymentStatus {
    /// Returns the payment status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How the buyer chose to pay. `Pending` means the method has not been
/// selected yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Mpesa,
    Paypal,
    Card,
    #[default]
    Pending,
}

impl PaymentMethod {
    /// Returns the payment method name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Mpesa => "mpesa",
            PaymentMethod::Paypal => "paypal",
            PaymentMethod::Card => "card",
            PaymentMethod::Pending => "pending",
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_status_is_pending() {
        assert_eq!(OrderStatus::default(), OrderStatus::Pending);
    }

    #[test]
    fn pending_transitions() {
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Confirmed));
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Shipped));
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Delivered));
    }

    #[test]
    fn confirmed_transitions() {
        assert!(OrderStatus::Confirmed.can_transition_to(OrderStatus::Processing));
        assert!(OrderStatus::Confirmed.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Confirmed.can_transition_to(OrderStatus::Delivered));
    }

    #[test]
    fn linear_fulfilment_chain() {
        assert!(OrderStatus::Processing.can_transition_to(OrderStatus::Shipped));
        assert!(OrderStatus::Shipped.can_transition_to(OrderStatus::Delivered));
        assert!(OrderStatus::Delivered.can_transition_to(OrderStatus::Refunded));
    }

    #[test]
    fn terminal_states_have_no_transitions() {
        assert!(OrderStatus::Cancelled.allowed_transitions().is_empty());
        assert!(OrderStatus::Refunded.allowed_transitions().is_empty());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(OrderStatus::Refunded.is_terminal());
        assert!(!OrderStatus::Delivered.is_terminal());
    }

    #[test]
    fn identity_transitions_rejected() {
        for status in OrderStatus::all() {
            assert!(
                !status.can_transition_to(*status),
                "{status} must not transition to itself"
            );
        }
    }

    #[test]
    fn table_closure_everything_unlisted_is_rejected() {
        for current in OrderStatus::all() {
            for next in OrderStatus::all() {
                let listed = current.allowed_transitions().contains(next);
                assert_eq!(
                    current.validate_transition(*next).is_ok(),
                    listed,
                    "{current} -> {next}"
                );
            }
        }
    }

    #[test]
    fn invalid_transition_names_both_statuses() {
        let err = OrderStatus::Shipped
            .validate_transition(OrderStatus::Cancelled)
            .unwrap_err();
        assert_eq!(err.from, OrderStatus::Shipped);
        assert_eq!(err.to, OrderStatus::Cancelled);
        assert_eq!(
            err.to_string(),
            "cannot transition order from shipped to cancelled"
        );
    }

    #[test]
    fn can_cancel_only_pending_and_confirmed() {
        assert!(OrderStatus::Pending.can_cancel());
        assert!(OrderStatus::Confirmed.can_cancel());
        assert!(!OrderStatus::Processing.can_cancel());
        assert!(!OrderStatus::Shipped.can_cancel());
        assert!(!OrderStatus::Delivered.can_cancel());
        assert!(!OrderStatus::Cancelled.can_cancel());
        assert!(!OrderStatus::Refunded.can_cancel());
    }

    #[test]
    fn statuses_serialize_lowercase() {
        assert_eq!(
            serde_json::to_string(&OrderStatus::Pending).unwrap(),
            "\"pending\""
        );
        assert_eq!(
            serde_json::to_string(&PaymentStatus::Paid).unwrap(),
            "\"paid\""
        );
        assert_eq!(
            serde_json::to_string(&PaymentMethod::Mpesa).unwrap(),
            "\"mpesa\""
        );
    }

    #[test]
    fn status_roundtrip_through_strings() {
        for status in OrderStatus::all() {
            let parsed: OrderStatus =
                serde_json::from_value(serde_json::Value::String(status.as_str().into())).unwrap();
            assert_eq!(parsed, *status);
        }
    }
}
