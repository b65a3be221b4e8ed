//! Decimal arithmetic utilities for order sizing and reporting.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Number of whole shares purchasable for a notional dollar amount at a price.
///
/// Fractional shares are not modeled; the remainder stays in cash.
pub fn whole_shares(notional: Decimal, price: Decimal) -> Decimal {
    if price <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    (notional / price).floor()
}

/// Percentage of `part` relative to `whole`, zero if `whole` is zero.
pub fn percent_of(part: Decimal, whole: Decimal) -> Decimal {
    if whole == Decimal::ZERO {
        Decimal::ZERO
    } else {
        part / whole * dec!(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whole_shares_floors() {
        assert_eq!(whole_shares(dec!(10000), dec!(300)), dec!(33));
        assert_eq!(whole_shares(dec!(10000), dec!(100)), dec!(100));
        assert_eq!(whole_shares(dec!(99), dec!(100)), Decimal::ZERO);
    }

    #[test]
    fn test_whole_shares_zero_price() {
        assert_eq!(whole_shares(dec!(10000), Decimal::ZERO), Decimal::ZERO);
    }

    #[test]
    fn test_percent_of() {
        assert_eq!(percent_of(dec!(50), dec!(200)), dec!(25));
        assert_eq!(percent_of(dec!(50), Decimal::ZERO), Decimal::ZERO);
    }
}
