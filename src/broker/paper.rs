//! Paper-trading venue for simulated sessions.

use super::traits::Brokerage;
use super::types::{AccountSnapshot, OrderId, OrderRecord};
use crate::utils::decimal::whole_shares;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Simulated account state for a paper session.
#[derive(Debug, Clone)]
pub struct PaperState {
    pub starting_cash: Decimal,
    pub cash: Decimal,
    /// Shares held per symbol
    pub positions: HashMap<String, Decimal>,
    /// Every order the venue has issued, by id
    pub orders: HashMap<OrderId, OrderRecord>,
}

impl PaperState {
    fn new(starting_cash: Decimal) -> Self {
        Self {
            starting_cash,
            cash: starting_cash,
            positions: HashMap::new(),
            orders: HashMap::new(),
        }
    }
}

/// Simulated execution venue.
///
/// Orders fill immediately at the posted per-symbol price, in whole
/// shares. Symbols with no posted price are rejected as untradeable.
/// Disabling fills records orders with zero filled quantity, which is how
/// tests and paper sessions produce stuck orders.
pub struct PaperBroker {
    state: Arc<RwLock<PaperState>>,
    /// Posted per-symbol prices
    prices: Arc<RwLock<HashMap<String, Decimal>>>,
    /// Trade date stamped onto new orders
    session_date: Arc<RwLock<String>>,
    order_id_counter: AtomicU64,
    fills_enabled: AtomicBool,
}

impl PaperBroker {
    /// Create a new paper venue with the given starting cash.
    pub fn new(starting_cash: Decimal) -> Self {
        Self {
            state: Arc::new(RwLock::new(PaperState::new(starting_cash))),
            prices: Arc::new(RwLock::new(HashMap::new())),
            session_date: Arc::new(RwLock::new(String::new())),
            order_id_counter: AtomicU64::new(1),
            fills_enabled: AtomicBool::new(true),
        }
    }

    /// Post a price for a symbol, replacing any existing quote.
    pub async fn set_price(&self, symbol: &str, price: Decimal) {
        self.prices.write().await.insert(symbol.to_string(), price);
    }

    /// Post a price only if the symbol has no quote yet.
    pub async fn ensure_price(&self, symbol: &str, price: Decimal) {
        self.prices
            .write()
            .await
            .entry(symbol.to_string())
            .or_insert(price);
    }

    /// Set the trade date stamped onto orders created from now on.
    pub async fn set_session_date(&self, date: &str) {
        *self.session_date.write().await = date.to_string();
    }

    /// Toggle immediate fills. When disabled, submitted orders are
    /// recorded with zero filled quantity and move no cash.
    pub fn set_fills_enabled(&self, enabled: bool) {
        self.fills_enabled.store(enabled, Ordering::SeqCst);
    }

    /// Get current venue state for logging and tests.
    pub async fn get_state(&self) -> PaperState {
        self.state.read().await.clone()
    }

    /// Restore account cash and prior orders from a persisted session.
    ///
    /// Rebuilds positions from the restored fills and bumps the order-id
    /// counter past every restored id.
    pub async fn restore(&self, cash: Decimal, orders: Vec<OrderRecord>) {
        let mut state = self.state.write().await;
        state.cash = cash;

        let mut max_id = 0u64;
        for order in orders {
            max_id = max_id.max(order.id.0);
            if order.filled_qty > Decimal::ZERO {
                *state.positions.entry(order.symbol.clone()).or_default() += order.filled_qty;
            }
            state.orders.insert(order.id, order);
        }

        // Never reuse an id the venue has already issued
        self.order_id_counter.fetch_max(max_id + 1, Ordering::SeqCst);

        info!(
            cash = %state.cash,
            orders = state.orders.len(),
            positions = state.positions.len(),
            "Paper venue state restored"
        );
    }

    fn next_order_id(&self) -> OrderId {
        OrderId(self.order_id_counter.fetch_add(1, Ordering::SeqCst))
    }

    async fn price_for(&self, symbol: &str) -> Result<Decimal> {
        self.prices
            .read()
            .await
            .get(symbol)
            .copied()
            .filter(|price| *price > Decimal::ZERO)
            .ok_or_else(|| anyhow!("untradeable symbol {symbol}: no posted price"))
    }
}

#[async_trait]
impl Brokerage for PaperBroker {
    async fn account(&self) -> Result<AccountSnapshot> {
        let state = self.state.read().await;
        let prices = self.prices.read().await;

        let mut portfolio_value = state.cash;
        for (symbol, qty) in &state.positions {
            if let Some(price) = prices.get(symbol) {
                portfolio_value += *qty * *price;
            }
        }

        Ok(AccountSnapshot {
            cash: state.cash,
            portfolio_value,
        })
    }

    async fn submit_notional_order(&self, symbol: &str, notional: Decimal) -> Result<OrderId> {
        let price = self.price_for(symbol).await?;
        let created = self.session_date.read().await.clone();
        let id = self.next_order_id();

        let mut state = self.state.write().await;
        let filled = if self.fills_enabled.load(Ordering::SeqCst) {
            whole_shares(notional, price)
        } else {
            Decimal::ZERO
        };

        if filled > Decimal::ZERO {
            state.cash -= filled * price;
            *state.positions.entry(symbol.to_string()).or_default() += filled;
        }

        state.orders.insert(
            id,
            OrderRecord {
                id,
                symbol: symbol.to_string(),
                created,
                filled_qty: filled,
            },
        );

        info!(
            order_id = %id,
            %symbol,
            %notional,
            %price,
            filled = %filled,
            "Paper buy order"
        );

        Ok(id)
    }

    async fn submit_share_order(&self, symbol: &str, signed_qty: Decimal) -> Result<OrderId> {
        let price = self.price_for(symbol).await?;
        let created = self.session_date.read().await.clone();
        let id = self.next_order_id();

        let mut state = self.state.write().await;
        let filled = if self.fills_enabled.load(Ordering::SeqCst) {
            signed_qty
        } else {
            Decimal::ZERO
        };

        if filled != Decimal::ZERO {
            state.cash -= filled * price;
            *state.positions.entry(symbol.to_string()).or_default() += filled;
        }

        state.orders.insert(
            id,
            OrderRecord {
                id,
                symbol: symbol.to_string(),
                created,
                filled_qty: filled,
            },
        );

        info!(
            order_id = %id,
            %symbol,
            quantity = %signed_qty,
            %price,
            "Paper share order"
        );

        Ok(id)
    }

    async fn get_order(&self, id: OrderId) -> Result<OrderRecord> {
        let state = self.state.read().await;
        debug!(order_id = %id, "Paper order lookup");
        state
            .orders
            .get(&id)
            .cloned()
            .ok_or_else(|| anyhow!("unknown order id {id}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    async fn venue_with_price(symbol: &str, price: Decimal) -> PaperBroker {
        let broker = PaperBroker::new(dec!(100000));
        broker.set_price(symbol, price).await;
        broker.set_session_date("2010-01-04").await;
        broker
    }

    #[tokio::test]
    async fn test_notional_buy_fills_whole_shares() {
        let broker = venue_with_price("AAPL", dec!(300)).await;

        let id = broker
            .submit_notional_order("AAPL", dec!(10000))
            .await
            .unwrap();

        let record = broker.get_order(id).await.unwrap();
        assert_eq!(record.filled_qty, dec!(33)); // floor(10000 / 300)
        assert_eq!(record.created, "2010-01-04");

        let state = broker.get_state().await;
        assert_eq!(state.positions["AAPL"], dec!(33));
        assert_eq!(state.cash, dec!(100000) - dec!(33) * dec!(300));
    }

    #[tokio::test]
    async fn test_unknown_symbol_rejected() {
        let broker = venue_with_price("AAPL", dec!(300)).await;

        let result = broker.submit_notional_order("ZZZZ", dec!(10000)).await;
        assert!(result.is_err());

        let state = broker.get_state().await;
        assert!(state.orders.is_empty());
        assert_eq!(state.cash, dec!(100000));
    }

    #[tokio::test]
    async fn test_fills_disabled_records_zero_fill() {
        let broker = venue_with_price("AAPL", dec!(300)).await;
        broker.set_fills_enabled(false);

        let id = broker
            .submit_notional_order("AAPL", dec!(10000))
            .await
            .unwrap();

        let record = broker.get_order(id).await.unwrap();
        assert_eq!(record.filled_qty, Decimal::ZERO);

        let state = broker.get_state().await;
        assert_eq!(state.cash, dec!(100000));
        assert!(state.positions.is_empty());
    }

    #[tokio::test]
    async fn test_negative_share_order_returns_cash() {
        let broker = venue_with_price("AAPL", dec!(100)).await;

        broker
            .submit_notional_order("AAPL", dec!(5000))
            .await
            .unwrap();
        let cash_after_buy = broker.get_state().await.cash;

        broker.submit_share_order("AAPL", dec!(-50)).await.unwrap();

        let state = broker.get_state().await;
        assert_eq!(state.positions["AAPL"], Decimal::ZERO);
        assert_eq!(state.cash, cash_after_buy + dec!(5000));
    }

    #[tokio::test]
    async fn test_account_marks_positions_at_posted_prices() {
        let broker = venue_with_price("AAPL", dec!(100)).await;

        broker
            .submit_notional_order("AAPL", dec!(10000))
            .await
            .unwrap();

        // 100 shares bought at $100; price moves to $120
        broker.set_price("AAPL", dec!(120)).await;

        let account = broker.account().await.unwrap();
        assert_eq!(account.cash, dec!(90000));
        assert_eq!(account.portfolio_value, dec!(90000) + dec!(100) * dec!(120));
    }

    #[tokio::test]
    async fn test_order_ids_are_unique_and_increasing() {
        let broker = venue_with_price("AAPL", dec!(100)).await;

        let a = broker
            .submit_notional_order("AAPL", dec!(1000))
            .await
            .unwrap();
        let b = broker
            .submit_notional_order("AAPL", dec!(1000))
            .await
            .unwrap();

        assert!(b > a);
    }

    #[tokio::test]
    async fn test_restore_rebuilds_positions_and_counter() {
        let broker = PaperBroker::new(dec!(100000));
        broker.set_price("AAPL", dec!(100)).await;
        broker.set_session_date("2010-03-10").await;

        broker
            .restore(
                dec!(95000),
                vec![OrderRecord {
                    id: OrderId(7),
                    symbol: "AAPL".to_string(),
                    created: "2010-01-04".to_string(),
                    filled_qty: dec!(50),
                }],
            )
            .await;

        let record = broker.get_order(OrderId(7)).await.unwrap();
        assert_eq!(record.filled_qty, dec!(50));

        let state = broker.get_state().await;
        assert_eq!(state.cash, dec!(95000));
        assert_eq!(state.positions["AAPL"], dec!(50));

        // New ids start past the restored ones
        let id = broker
            .submit_notional_order("AAPL", dec!(1000))
            .await
            .unwrap();
        assert_eq!(id, OrderId(8));
    }

    #[tokio::test]
    async fn test_ensure_price_does_not_overwrite() {
        let broker = venue_with_price("AAPL", dec!(300)).await;
        broker.ensure_price("AAPL", dec!(100)).await;
        broker.ensure_price("MSFT", dec!(100)).await;

        assert_eq!(broker.price_for("AAPL").await.unwrap(), dec!(300));
        assert_eq!(broker.price_for("MSFT").await.unwrap(), dec!(100));
    }
}
