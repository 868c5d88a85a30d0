//! Commission math for splitting an order total between platform and seller.

use common::Money;
use serde::{Deserialize, Serialize};

/// Platform commission rate in basis points (1000 = 10%).
pub const DEFAULT_COMMISSION_RATE_BPS: u32 = 1_000;

/// The platform/seller split of an order total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionSplit {
    /// The platform's cut.
    pub commission: Money,

    /// What the fulfilling seller is owed.
    pub seller_earnings: Money,
}

/// Splits an order total into platform commission and seller earnings.
///
/// The commission is the total multiplied by the rate, rounded half-up to
/// the nearest cent; the seller earnings are the remainder, so
/// `commission + seller_earnings == total` holds exactly for every input.
pub fn calculate_commission(total: Money, rate_bps: u32) -> CommissionSplit {
    debug_assert!(!total.is_negative(), "order totals are never negative");

    let commission = Money::from_cents((total.cents() * rate_bps as i64 + 5_000) / 10_000);
    CommissionSplit {
        commission,
        seller_earnings: total - commission,
    }
}
