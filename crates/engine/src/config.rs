//! Engine configuration loaded from environment variables.

use domain::DEFAULT_COMMISSION_RATE_BPS;

/// Default number of days between shipping and estimated delivery.
pub const DEFAULT_DELIVERY_DAYS: i64 = 7;

/// Tunables for the order lifecycle engine.
///
/// Reads from environment variables:
/// - `COMMISSION_RATE_BPS` — platform commission in basis points (default: `1000`)
/// - `DEFAULT_DELIVERY_DAYS` — shipping-to-delivery estimate in days (default: `7`)
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub commission_rate_bps: u32,
    pub default_delivery_days: i64,
}

impl EngineConfig {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            commission_rate_bps: std::env::var("COMMISSION_RATE_BPS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_COMMISSION_RATE_BPS),
            default_delivery_days: std::env::var("DEFAULT_DELIVERY_DAYS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_DELIVERY_DAYS),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            commission_rate_bps: DEFAULT_COMMISSION_RATE_BPS,
            default_delivery_days: DEFAULT_DELIVERY_DAYS,
        }
    }
}
