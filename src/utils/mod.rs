//! # Utilities Module
//!
//! This module contains helper functions and utilities used
//! across the backend service.

use rust_decimal::{Decimal, RoundingStrategy};

/// Round a monetary or percentage value for display.
///
/// Two decimal places, midpoint away from zero. Applied only at the
/// response-building and CSV edges; intermediate computation keeps full
/// `Decimal` precision so repeated reads never accumulate rounding error.
///
/// ## Examples
///
/// ```rust,ignore
/// assert_eq!(round_money(dec!(10.505)), dec!(10.51));
/// assert_eq!(round_money(dec!(105)), dec!(105.00));
/// ```
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Format a monetary value as a plain two-decimal string ("1234.50").
///
/// Used for CSV cells, where the admin console expects fixed two-decimal
/// numbers without a currency suffix.
pub fn format_amount(value: Decimal) -> String {
    format!("{:.2}", round_money(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_round_money() {
        assert_eq!(round_money(dec!(10.505)), dec!(10.51));
        assert_eq!(round_money(dec!(10.504)), dec!(10.50));
        assert_eq!(round_money(dec!(-10.505)), dec!(-10.51));
        assert_eq!(round_money(dec!(105)), dec!(105));
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(dec!(1234.5)), "1234.50");
        assert_eq!(format_amount(dec!(0)), "0.00");
        assert_eq!(format_amount(dec!(99.999)), "100.00");
    }
}
