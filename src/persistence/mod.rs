//! SQLite persistence for paper trading sessions.
//!
//! Persists strategy state so a restarted session resumes its hold
//! timers:
//! - Account cash
//! - The tracked order set with creation dates and fills
//! - Trade execution history

use crate::broker::{OrderId, OrderRecord};
use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Persisted account state.
#[derive(Debug, Clone)]
pub struct PersistedAccount {
    pub starting_cash: Decimal,
    pub cash: Decimal,
}

/// SQLite-based persistence manager.
pub struct PersistenceManager {
    conn: Connection,
}

impl PersistenceManager {
    /// Create a new persistence manager, initializing the database if needed.
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path.as_ref())
            .with_context(|| format!("Failed to open database at {:?}", db_path.as_ref()))?;

        let manager = Self { conn };
        manager.init_schema()?;

        info!("Persistence manager initialized at {:?}", db_path.as_ref());
        Ok(manager)
    }

    /// Initialize database schema.
    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            -- Account state (singleton row)
            CREATE TABLE IF NOT EXISTS account_state (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                starting_cash TEXT NOT NULL,
                cash TEXT NOT NULL,
                last_saved TEXT NOT NULL
            );

            -- Orders the strategy still considers open
            CREATE TABLE IF NOT EXISTS tracked_orders (
                order_id INTEGER PRIMARY KEY,
                symbol TEXT NOT NULL,
                submitted_on TEXT NOT NULL,
                filled_qty TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_tracked_symbol ON tracked_orders(symbol);

            -- Trade history
            CREATE TABLE IF NOT EXISTS trades (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                trade_date TEXT NOT NULL,
                symbol TEXT NOT NULL,
                side TEXT NOT NULL,
                order_id INTEGER NOT NULL,
                quantity TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_trades_date ON trades(trade_date);
            CREATE INDEX IF NOT EXISTS idx_trades_symbol ON trades(symbol);
            "#,
        )?;

        debug!("Database schema initialized");
        Ok(())
    }

    /// Save account cash, stamped with the trading date.
    pub fn save_account(
        &self,
        starting_cash: Decimal,
        cash: Decimal,
        trade_date: &str,
    ) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO account_state (id, starting_cash, cash, last_saved)
            VALUES (1, ?1, ?2, ?3)
            ON CONFLICT(id) DO UPDATE SET
                starting_cash = ?1,
                cash = ?2,
                last_saved = ?3
            "#,
            params![starting_cash.to_string(), cash.to_string(), trade_date],
        )?;

        debug!(%cash, %trade_date, "Account state saved");
        Ok(())
    }

    /// Load persisted account state, if any.
    pub fn load_account(&self) -> Result<Option<PersistedAccount>> {
        let row: Option<(String, String)> = self
            .conn
            .query_row(
                "SELECT starting_cash, cash FROM account_state WHERE id = 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((starting_cash, cash)) = row else {
            return Ok(None);
        };

        Ok(Some(PersistedAccount {
            starting_cash: Decimal::from_str(&starting_cash).unwrap_or_default(),
            cash: Decimal::from_str(&cash).unwrap_or_default(),
        }))
    }

    /// Insert a newly tracked order.
    pub fn insert_tracked_order(&self, record: &OrderRecord) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO tracked_orders (order_id, symbol, submitted_on, filled_qty)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![
                record.id.0,
                record.symbol,
                record.created,
                record.filled_qty.to_string(),
            ],
        )?;
        Ok(())
    }

    /// Remove tracked orders that were sold, in one transaction.
    pub fn remove_tracked_orders(&self, ids: &[OrderId]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }

        let tx = self.conn.unchecked_transaction()?;
        for id in ids {
            tx.execute("DELETE FROM tracked_orders WHERE order_id = ?1", [id.0])?;
        }
        tx.commit()?;

        debug!(removed = ids.len(), "Tracked orders removed");
        Ok(())
    }

    /// Load all tracked orders.
    pub fn load_tracked_orders(&self) -> Result<Vec<OrderRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT order_id, symbol, submitted_on, filled_qty FROM tracked_orders ORDER BY order_id",
        )?;

        let orders: Vec<OrderRecord> = stmt
            .query_map([], |row| {
                Ok(OrderRecord {
                    id: OrderId(row.get(0)?),
                    symbol: row.get(1)?,
                    created: row.get(2)?,
                    filled_qty: Decimal::from_str(&row.get::<_, String>(3)?).unwrap_or_default(),
                })
            })?
            .filter_map(|r| r.ok())
            .collect();

        Ok(orders)
    }

    /// Record a trade.
    pub fn record_trade(
        &self,
        trade_date: &str,
        symbol: &str,
        side: &str,
        order_id: OrderId,
        quantity: Decimal,
    ) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO trades (trade_date, symbol, side, order_id, quantity)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![trade_date, symbol, side, order_id.0, quantity.to_string()],
        )?;
        Ok(())
    }

    /// Number of currently tracked orders.
    pub fn tracked_count(&self) -> Result<u64> {
        let count: u64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM tracked_orders", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Total number of recorded trades.
    pub fn trade_count(&self) -> Result<u64> {
        let count: u64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM trades", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Clear all data (for testing or reset).
    pub fn clear_all(&self) -> Result<()> {
        warn!("Clearing all persistence data");
        self.conn.execute_batch(
            r#"
            DELETE FROM account_state;
            DELETE FROM tracked_orders;
            DELETE FROM trades;
            "#,
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn record(id: u64, symbol: &str, created: &str, filled: Decimal) -> OrderRecord {
        OrderRecord {
            id: OrderId(id),
            symbol: symbol.to_string(),
            created: created.to_string(),
            filled_qty: filled,
        }
    }

    #[test]
    fn test_tracked_orders_round_trip() {
        let manager = PersistenceManager::new(":memory:").unwrap();

        manager
            .insert_tracked_order(&record(1, "AAPL", "2010-01-04", dec!(50)))
            .unwrap();
        manager
            .insert_tracked_order(&record(2, "MSFT", "2010-01-05", dec!(0)))
            .unwrap();

        let loaded = manager.load_tracked_orders().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].id, OrderId(1));
        assert_eq!(loaded[0].symbol, "AAPL");
        assert_eq!(loaded[0].created, "2010-01-04");
        assert_eq!(loaded[0].filled_qty, dec!(50));
        assert_eq!(loaded[1].filled_qty, Decimal::ZERO);
    }

    #[test]
    fn test_remove_tracked_orders_batch() {
        let manager = PersistenceManager::new(":memory:").unwrap();

        for id in 1..=3 {
            manager
                .insert_tracked_order(&record(id, "AAPL", "2010-01-04", dec!(10)))
                .unwrap();
        }

        manager
            .remove_tracked_orders(&[OrderId(1), OrderId(3)])
            .unwrap();

        let loaded = manager.load_tracked_orders().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, OrderId(2));
        assert_eq!(manager.tracked_count().unwrap(), 1);
    }

    #[test]
    fn test_account_round_trip() {
        let manager = PersistenceManager::new(":memory:").unwrap();

        assert!(manager.load_account().unwrap().is_none());

        manager
            .save_account(dec!(1000000), dec!(987654.32), "2010-02-01")
            .unwrap();

        let account = manager.load_account().unwrap().unwrap();
        assert_eq!(account.starting_cash, dec!(1000000));
        assert_eq!(account.cash, dec!(987654.32));

        // Saving again overwrites the singleton row
        manager
            .save_account(dec!(1000000), dec!(990000), "2010-02-02")
            .unwrap();
        let account = manager.load_account().unwrap().unwrap();
        assert_eq!(account.cash, dec!(990000));
    }

    #[test]
    fn test_trade_history() {
        let manager = PersistenceManager::new(":memory:").unwrap();

        manager
            .record_trade("2010-01-04", "AAPL", "buy", OrderId(1), dec!(50))
            .unwrap();
        manager
            .record_trade("2010-03-06", "AAPL", "sell", OrderId(2), dec!(50))
            .unwrap();

        assert_eq!(manager.trade_count().unwrap(), 2);
    }

    #[test]
    fn test_clear_all() {
        let manager = PersistenceManager::new(":memory:").unwrap();

        manager
            .insert_tracked_order(&record(1, "AAPL", "2010-01-04", dec!(50)))
            .unwrap();
        manager
            .save_account(dec!(1000000), dec!(999999), "2010-01-04")
            .unwrap();

        manager.clear_all().unwrap();

        assert!(manager.load_tracked_orders().unwrap().is_empty());
        assert!(manager.load_account().unwrap().is_none());
    }
}
