//! Venue-agnostic brokerage trait.
//!
//! The seam between the strategy and whatever executes its orders. Every
//! call is attempted exactly once per cycle; retry policy belongs to the
//! venue, not the strategy.

use super::types::{AccountSnapshot, OrderId, OrderRecord};
use async_trait::async_trait;
use rust_decimal::Decimal;

/// Order submission and lookup against an execution venue.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Brokerage: Send + Sync {
    /// Current cash and portfolio value.
    async fn account(&self) -> anyhow::Result<AccountSnapshot>;

    /// Submit a buy sized in dollars.
    ///
    /// Fails when the security is untradeable or the venue rejects the
    /// order.
    async fn submit_notional_order(
        &self,
        symbol: &str,
        notional: Decimal,
    ) -> anyhow::Result<OrderId>;

    /// Submit an order for a signed share quantity (negative sells).
    async fn submit_share_order(
        &self,
        symbol: &str,
        signed_qty: Decimal,
    ) -> anyhow::Result<OrderId>;

    /// Fetch the venue's record for a previously submitted order.
    async fn get_order(&self, id: OrderId) -> anyhow::Result<OrderRecord>;
}
