//! Trading strategy implementation.
//!
//! Contains the core logic for:
//! - Position lifecycle tracking (buy, hold-timer, sell sweep)
//! - The daily session driven by the three scheduled entry points

mod session;
mod tracker;

pub use session::{RebalanceSummary, RejectedBuy, SubmittedBuy, TradingSession};
pub use tracker::{BuyOutcome, ClosedPosition, PositionTracker, SweepReport};
