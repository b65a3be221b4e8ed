//! Configuration management for the buyback trader.
//!
//! Loads settings from environment variables and config files.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Strategy parameters (position sizing, holding period)
    #[serde(default)]
    pub strategy: StrategyConfig,
    /// Announcement feed settings
    #[serde(default)]
    pub feed: FeedConfig,
    /// Paper trading venue settings
    #[serde(default)]
    pub paper: PaperConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// Maximum fraction of portfolio value allocated to a single buy (0.0-1.0)
    #[serde(default = "default_max_position_fraction")]
    pub max_position_fraction: Decimal,
    /// Calendar days a filled position is held before liquidation
    #[serde(default = "default_holding_period_days")]
    pub holding_period_days: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Path to the buyback-announcement CSV file
    #[serde(default = "default_signal_file")]
    pub signal_file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperConfig {
    /// Starting cash balance for a fresh paper session
    #[serde(default = "default_starting_cash")]
    pub starting_cash: Decimal,
    /// Price posted for symbols the feed introduces without market data
    #[serde(default = "default_paper_price")]
    pub default_price: Decimal,
    /// Path to the SQLite state database
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

// Default value functions
fn default_max_position_fraction() -> Decimal {
    Decimal::new(1, 2) // 0.01 = 1% of portfolio value per position
}

fn default_holding_period_days() -> u32 {
    60
}

fn default_signal_file() -> String {
    "data/buybacks.csv".to_string()
}

fn default_starting_cash() -> Decimal {
    Decimal::new(1_000_000, 0) // $1M paper account
}

fn default_paper_price() -> Decimal {
    Decimal::new(100, 0) // $100 per share
}

fn default_db_path() -> String {
    "data/paper_state.db".to_string()
}

impl Config {
    /// Load configuration from environment variables and config files.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::File::with_name("config").required(false))
            .add_source(config::Environment::default().separator("__").prefix("BBT"))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.strategy.max_position_fraction > Decimal::ZERO
                && self.strategy.max_position_fraction <= Decimal::ONE,
            "max_position_fraction must be between 0 and 1"
        );

        anyhow::ensure!(
            self.strategy.holding_period_days >= 1,
            "holding_period_days must be at least 1"
        );

        anyhow::ensure!(
            self.paper.starting_cash > Decimal::ZERO,
            "starting_cash must be positive"
        );

        anyhow::ensure!(
            self.paper.default_price > Decimal::ZERO,
            "default_price must be positive"
        );

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            strategy: StrategyConfig::default(),
            feed: FeedConfig::default(),
            paper: PaperConfig::default(),
        }
    }
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            max_position_fraction: default_max_position_fraction(),
            holding_period_days: default_holding_period_days(),
        }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            signal_file: default_signal_file(),
        }
    }
}

impl Default for PaperConfig {
    fn default() -> Self {
        Self {
            starting_cash: default_starting_cash(),
            default_price: default_paper_price(),
            db_path: default_db_path(),
        }
    }
}
