//! Type definitions for the execution venue surface.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque order handle issued by the execution venue.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct OrderId(pub u64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Venue-owned order state.
///
/// The strategy holds only the id and fetches the rest on demand. The
/// creation date is the venue's trade-date string (`YYYY-MM-DD`); parsing
/// it is the strategy's responsibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub id: OrderId,
    pub symbol: String,
    /// Trade date the order was created on
    pub created: String,
    /// Shares filled so far; zero means the order never executed
    pub filled_qty: Decimal,
}

/// Point-in-time account state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AccountSnapshot {
    /// Cash available for new buys
    pub cash: Decimal,
    /// Total portfolio value (cash plus positions at current prices)
    pub portfolio_value: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_id_display() {
        assert_eq!(OrderId(42).to_string(), "42");
    }

    #[test]
    fn test_order_id_hashable_and_ordered() {
        use std::collections::HashSet;

        let mut set = HashSet::new();
        set.insert(OrderId(1));
        set.insert(OrderId(1));
        set.insert(OrderId(2));

        assert_eq!(set.len(), 2);
        assert!(OrderId(1) < OrderId(2));
    }
}
