//! Daily trading session state and entry points.
//!
//! One `TradingSession` lives for the whole run. An external driver calls
//! the three entry points once per trading day, strictly in order:
//! pre-market candidate refresh, the rebalance, then the end-of-day hook.

use crate::broker::{Brokerage, OrderId};
use crate::config::StrategyConfig;
use crate::signal::{select_candidates, AnnouncementFeed};
use crate::strategy::tracker::{BuyOutcome, PositionTracker, SweepReport};
use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{info, warn};

/// A buy the rebalance submitted.
#[derive(Debug, Clone, Serialize)]
pub struct SubmittedBuy {
    pub symbol: String,
    pub order_id: OrderId,
}

/// A buy the venue rejected.
#[derive(Debug, Clone, Serialize)]
pub struct RejectedBuy {
    pub symbol: String,
    pub reason: String,
}

/// Everything that happened during one rebalance.
#[derive(Debug, Clone, Serialize)]
pub struct RebalanceSummary {
    pub date: String,
    pub submitted: Vec<SubmittedBuy>,
    /// Candidates skipped because cash did not cover the target value
    pub skipped_insufficient_cash: Vec<String>,
    pub rejected: Vec<RejectedBuy>,
    pub sweep: SweepReport,
}

impl RebalanceSummary {
    /// Serialize for structured log emission.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| format!("{{\"error\":\"{}\"}}", e))
    }
}

/// Strategy state for a run: today's candidates plus the position tracker.
#[derive(Debug)]
pub struct TradingSession {
    candidates: Vec<String>,
    tracker: PositionTracker,
}

impl TradingSession {
    /// Create a fresh session from strategy configuration.
    pub fn new(config: &StrategyConfig) -> Self {
        Self {
            candidates: Vec::new(),
            tracker: PositionTracker::from_config(config),
        }
    }

    /// Today's buy candidates.
    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    /// The position tracker.
    pub fn tracker(&self) -> &PositionTracker {
        &self.tracker
    }

    /// Re-seed tracked orders from persisted state.
    pub fn restore_tracked(&mut self, ids: impl IntoIterator<Item = OrderId>) {
        self.tracker.restore(ids);
    }

    /// Pre-market entry point: replace the candidate list wholesale with
    /// today's flagged symbols.
    ///
    /// A day with no announcements leaves an empty list, never
    /// yesterday's.
    pub async fn before_market_open(
        &mut self,
        feed: &dyn AnnouncementFeed,
        date: &str,
    ) -> Result<usize> {
        let rows = feed
            .rows_for(date)
            .await
            .with_context(|| format!("Failed to fetch signal rows for {date}"))?;

        self.candidates = select_candidates(&rows);

        info!(
            %date,
            rows = rows.len(),
            candidates = self.candidates.len(),
            "Candidate list refreshed"
        );

        Ok(self.candidates.len())
    }

    /// Rebalance entry point: buy today's candidates, then sweep aged
    /// positions.
    ///
    /// The account is sampled once and every buy is checked against that
    /// same snapshot, so several buys in one cycle can each count the same
    /// cash as available. The check is conservative only.
    pub async fn rebalance(
        &mut self,
        broker: &dyn Brokerage,
        date: &str,
    ) -> Result<RebalanceSummary> {
        let account = broker
            .account()
            .await
            .context("Failed to fetch account snapshot")?;

        let mut submitted = Vec::new();
        let mut skipped = Vec::new();
        let mut rejected = Vec::new();

        let candidates = self.candidates.clone();
        for symbol in &candidates {
            match self
                .tracker
                .buy(broker, symbol, account.cash, account.portfolio_value)
                .await
            {
                BuyOutcome::Submitted(order_id) => submitted.push(SubmittedBuy {
                    symbol: symbol.clone(),
                    order_id,
                }),
                BuyOutcome::InsufficientCash { .. } => skipped.push(symbol.clone()),
                BuyOutcome::Rejected { symbol, reason } => {
                    rejected.push(RejectedBuy { symbol, reason })
                }
            }
        }

        let sweep = self
            .tracker
            .sweep_and_sell(broker, date)
            .await
            .with_context(|| format!("Sell sweep aborted on {date}"))?;

        if !rejected.is_empty() {
            warn!(
                %date,
                rejected = rejected.len(),
                "Some buy orders were rejected by the venue"
            );
        }

        Ok(RebalanceSummary {
            date: date.to_string(),
            submitted,
            skipped_insufficient_cash: skipped,
            rejected,
            sweep,
        })
    }

    /// End-of-day hook: log the session's tracking counters.
    pub fn end_of_day(&self) {
        info!(
            candidates = self.candidates.len(),
            tracked_orders = self.tracker.tracked_count(),
            "End of trading day"
        );
    }
}
