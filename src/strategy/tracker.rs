//! Position lifecycle tracking.
//!
//! Owns the set of order ids the strategy still considers open. Buys add
//! to the set; the daily sweep sells positions whose holding period has
//! elapsed and removes them. An order in the set has not yet been unwound
//! by this strategy.

use crate::broker::{Brokerage, OrderId, OrderRecord};
use crate::config::StrategyConfig;
use crate::utils::dates::{days_between, DateParseError};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, error, info, warn};

/// Result of a single buy attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum BuyOutcome {
    /// Order accepted by the venue and now tracked.
    Submitted(OrderId),
    /// Cash did not cover the target value; no order was sent.
    InsufficientCash { target_value: Decimal },
    /// Venue rejected the order. Non-fatal; the caller decides what to do.
    Rejected { symbol: String, reason: String },
}

/// A position closed by the sweep.
#[derive(Debug, Clone, Serialize)]
pub struct ClosedPosition {
    /// The tracked buy order that aged out
    pub order_id: OrderId,
    /// The sell order that unwound it
    pub sell_order_id: OrderId,
    pub symbol: String,
    /// Shares sold (positive)
    pub quantity: Decimal,
}

/// Outcome of one holding-period sweep.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SweepReport {
    /// Positions sold and untracked this sweep
    pub sold: Vec<ClosedPosition>,
    /// Aged orders with zero fill, still tracked
    pub stuck_unfilled: Vec<OrderId>,
    /// Orders whose venue lookup failed, still tracked
    pub lookup_failures: Vec<OrderId>,
    /// Aged orders whose sell submission failed, still tracked
    pub sell_failures: Vec<OrderId>,
    /// Orders remaining in the tracked set after the sweep
    pub still_held: usize,
}

/// Tracks open orders through their buy / hold / sell lifecycle.
#[derive(Debug)]
pub struct PositionTracker {
    max_position_fraction: Decimal,
    holding_period_days: i64,
    tracked: HashSet<OrderId>,
}

impl PositionTracker {
    /// Create a tracker with explicit parameters.
    pub fn new(max_position_fraction: Decimal, holding_period_days: u32) -> Self {
        Self {
            max_position_fraction,
            holding_period_days: i64::from(holding_period_days),
            tracked: HashSet::new(),
        }
    }

    /// Create a tracker from strategy configuration.
    pub fn from_config(config: &StrategyConfig) -> Self {
        Self::new(config.max_position_fraction, config.holding_period_days)
    }

    /// Number of orders currently tracked.
    pub fn tracked_count(&self) -> usize {
        self.tracked.len()
    }

    /// Whether an order id is currently tracked.
    pub fn is_tracked(&self, id: OrderId) -> bool {
        self.tracked.contains(&id)
    }

    /// All tracked order ids, in ascending order.
    pub fn tracked_ids(&self) -> Vec<OrderId> {
        let mut ids: Vec<OrderId> = self.tracked.iter().copied().collect();
        ids.sort();
        ids
    }

    /// Re-seed the tracked set from persisted state.
    pub fn restore(&mut self, ids: impl IntoIterator<Item = OrderId>) {
        self.tracked.extend(ids);
    }

    /// Attempt to buy `symbol` up to the configured fraction of portfolio
    /// value.
    ///
    /// The affordability check is conservative only: it compares the cash
    /// the caller sampled, which is not refreshed between multiple buys in
    /// one cycle, and it does not guarantee the order fills at that value.
    pub async fn buy(
        &mut self,
        broker: &dyn Brokerage,
        symbol: &str,
        cash: Decimal,
        portfolio_value: Decimal,
    ) -> BuyOutcome {
        let target_value = portfolio_value * self.max_position_fraction;

        if cash <= target_value {
            debug!(
                %symbol,
                %cash,
                %target_value,
                "Cash does not cover target value, skipping buy"
            );
            return BuyOutcome::InsufficientCash { target_value };
        }

        match broker.submit_notional_order(symbol, target_value).await {
            Ok(id) => {
                self.tracked.insert(id);
                info!(
                    order_id = %id,
                    %symbol,
                    %target_value,
                    tracked = self.tracked.len(),
                    "Buy submitted and tracked"
                );
                BuyOutcome::Submitted(id)
            }
            Err(e) => {
                error!(%symbol, error = %e, "Venue rejected buy order");
                BuyOutcome::Rejected {
                    symbol: symbol.to_string(),
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Sell every tracked position whose holding period has elapsed.
    ///
    /// Ages are computed for all tracked orders before any sell is
    /// submitted, so a malformed creation date aborts the sweep with the
    /// tracked set untouched. Aged orders with zero fill are reported but
    /// never sold or untracked. Removals happen in one batch
    /// set-difference after the pass.
    pub async fn sweep_and_sell(
        &mut self,
        broker: &dyn Brokerage,
        current_date: &str,
    ) -> Result<SweepReport, DateParseError> {
        let mut report = SweepReport::default();

        let mut records: Vec<OrderRecord> = Vec::new();
        for id in self.tracked_ids() {
            match broker.get_order(id).await {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!(order_id = %id, error = %e, "Order lookup failed, keeping tracked");
                    report.lookup_failures.push(id);
                }
            }
        }

        // Parse every creation date before submitting any sell, so a bad
        // date cannot leave the sweep half-applied.
        let mut aged: Vec<(OrderRecord, i64)> = Vec::with_capacity(records.len());
        for record in records {
            let age_days = days_between(&record.created, current_date)?;
            aged.push((record, age_days));
        }

        let mut to_remove: HashSet<OrderId> = HashSet::new();
        for (record, age_days) in aged {
            if age_days < self.holding_period_days {
                continue;
            }

            if record.filled_qty <= Decimal::ZERO {
                warn!(
                    order_id = %record.id,
                    symbol = %record.symbol,
                    age_days,
                    "Aged order never filled, remains tracked"
                );
                report.stuck_unfilled.push(record.id);
                continue;
            }

            match broker
                .submit_share_order(&record.symbol, -record.filled_qty)
                .await
            {
                Ok(sell_id) => {
                    info!(
                        order_id = %record.id,
                        sell_order_id = %sell_id,
                        symbol = %record.symbol,
                        quantity = %record.filled_qty,
                        age_days,
                        "Position liquidated"
                    );
                    to_remove.insert(record.id);
                    report.sold.push(ClosedPosition {
                        order_id: record.id,
                        sell_order_id: sell_id,
                        symbol: record.symbol,
                        quantity: record.filled_qty,
                    });
                }
                Err(e) => {
                    error!(
                        order_id = %record.id,
                        symbol = %record.symbol,
                        error = %e,
                        "Sell submission failed, keeping tracked for next sweep"
                    );
                    report.sell_failures.push(record.id);
                }
            }
        }

        self.tracked = self.tracked.difference(&to_remove).copied().collect();
        report.still_held = self.tracked.len();

        Ok(report)
    }
}
