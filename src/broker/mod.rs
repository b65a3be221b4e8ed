//! Execution venue surface for the buyback trader.
//!
//! The strategy never talks to a venue directly; everything goes through
//! the `Brokerage` trait. The only implementation shipped here is the
//! paper-trading venue used for simulated sessions; a live brokerage
//! client would attach at the same seam.

mod paper;
mod traits;
mod types;

pub use paper::{PaperBroker, PaperState};
pub use traits::Brokerage;
pub use types::{AccountSnapshot, OrderId, OrderRecord};

#[cfg(test)]
pub use traits::MockBrokerage;
