//! Human-readable order numbers.
//!
//! Format: `ORD-YYYYMMDD-NNN` where the sequence is scoped to the calendar
//! day and resets to 1 at midnight. Sequencing itself is owned by the order
//! store's per-day atomic counter; this module only formats and parses.

use chrono::NaiveDate;

/// Formats an order number from its date and daily sequence.
///
/// The sequence is zero-padded to three digits but grows beyond `999`
/// without truncation.
pub fn format_order_number(date: NaiveDate, sequence: u32) -> String {
    format!("ORD-{}-{:03}", date.format("%Y%m%d"), sequence)
}

/// Parses an order number back into its date and sequence.
///
/// Returns `None` for anything that does not match the `ORD-YYYYMMDD-NNN`
/// shape.
pub fn parse_order_number(order_number: &str) -> Option<(NaiveDate, u32)> {
    let rest = order_number.strip_prefix("ORD-")?;
    let (date_part, seq_part) = rest.split_once('-')?;
    if date_part.len() != 8 || seq_part.len() < 3 {
        return None;
    }
    let date = NaiveDate::parse_from_str(date_part, "%Y%m%d").ok()?;
    let sequence = seq_part.parse().ok()?;
    Some((date, sequence))
}
