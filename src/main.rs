//! Buyback Trader - Main Entry Point
//!
//! Replays a paper trading session over a buyback-announcement feed.

use anyhow::Result;
use buyback_trader::broker::{Brokerage, OrderId, PaperBroker};
use buyback_trader::config::Config;
use buyback_trader::persistence::PersistenceManager;
use buyback_trader::signal::CsvAnnouncementFeed;
use buyback_trader::strategy::{RebalanceSummary, TradingSession};
use buyback_trader::utils::decimal::percent_of;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use tracing::{error, info, Level};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

/// Buyback Trader CLI
#[derive(Parser)]
#[command(name = "buyback-trader")]
#[command(version, about = "Buyback-announcement swing trading over US equities")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a paper session over the announcement feed
    Run {
        /// Path to the announcement CSV file (overrides config)
        #[arg(short, long)]
        feed: Option<String>,

        /// Path to the SQLite state database (overrides config)
        #[arg(short, long)]
        db: Option<String>,

        /// Starting cash for a fresh session (overrides config)
        #[arg(short, long)]
        cash: Option<f64>,
    },

    /// Show session status from persisted state
    Status {
        /// Path to the SQLite state database
        #[arg(short, long, default_value = "data/paper_state.db")]
        db: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging()?;

    match cli.command {
        Some(Commands::Run { feed, db, cash }) => {
            run_session(feed.as_deref(), db.as_deref(), cash).await
        }
        Some(Commands::Status { db }) => show_status(&db),
        None => run_session(None, None, None).await,
    }
}

fn init_logging() -> Result<()> {
    use tracing_subscriber::fmt::writer::MakeWriterExt;

    // Create logs directory
    std::fs::create_dir_all("logs")?;

    // File appender for detailed logs
    let file_appender = tracing_appender::rolling::hourly("logs", "buyback-trader.log");
    let (file_writer, _guard) = tracing_appender::non_blocking(file_appender);

    // Leak the guard to keep it alive for the program duration
    Box::leak(Box::new(_guard));

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("buyback_trader=debug".parse()?)
                .add_directive(Level::INFO.into()),
        )
        .with_writer(std::io::stdout.and(file_writer))
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .init();

    Ok(())
}

/// Log configuration on startup.
fn log_config(config: &Config) {
    info!("📋 Configuration:");
    info!(
        "   Max Position: {}% of portfolio value",
        config.strategy.max_position_fraction * Decimal::new(100, 0)
    );
    info!(
        "   Holding Period: {} calendar days",
        config.strategy.holding_period_days
    );
    info!("   Signal File: {}", config.feed.signal_file);
    info!("   Starting Cash: ${}", config.paper.starting_cash);
    info!("   State Database: {}", config.paper.db_path);
}

/// Replay the paper session day by day over the feed's trading dates.
async fn run_session(
    feed_override: Option<&str>,
    db_override: Option<&str>,
    cash_override: Option<f64>,
) -> Result<()> {
    info!("╔════════════════════════════════════════════════════════════╗");
    info!(
        "║         Buyback Trader v{} - Paper Session              ║",
        env!("CARGO_PKG_VERSION")
    );
    info!("╚════════════════════════════════════════════════════════════╝");

    let mut config = Config::load()?;
    if let Some(path) = feed_override {
        config.feed.signal_file = path.to_string();
    }
    if let Some(path) = db_override {
        config.paper.db_path = path.to_string();
    }
    if let Some(cash) = cash_override {
        config.paper.starting_cash =
            Decimal::from_f64_retain(cash).unwrap_or(config.paper.starting_cash);
    }
    config.validate()?;
    log_config(&config);

    let feed = CsvAnnouncementFeed::new(&config.feed.signal_file)?;
    info!(
        trading_days = feed.len(),
        first = %feed.trading_dates().first().map(String::as_str).unwrap_or("-"),
        last = %feed.trading_dates().last().map(String::as_str).unwrap_or("-"),
        "Announcement feed loaded"
    );

    if let Some(parent) = std::path::Path::new(&config.paper.db_path).parent() {
        std::fs::create_dir_all(parent)?;
    }
    let persistence = PersistenceManager::new(&config.paper.db_path)?;

    let broker = PaperBroker::new(config.paper.starting_cash);
    let mut session = TradingSession::new(&config.strategy);

    // Restore a previous session's hold timers, if any
    if let Some(account) = persistence.load_account()? {
        let restored = persistence.load_tracked_orders()?;
        info!(
            cash = %account.cash,
            tracked = restored.len(),
            "📂 Restoring persisted session state"
        );
        for order in &restored {
            broker
                .ensure_price(&order.symbol, config.paper.default_price)
                .await;
        }
        session.restore_tracked(restored.iter().map(|r| r.id));
        broker.restore(account.cash, restored).await;
    }

    let dates = feed.trading_dates().to_vec();
    for date in &dates {
        info!("═══════════════════ {} ═══════════════════", date);
        broker.set_session_date(date).await;

        // PHASE 1: PRE-MARKET - refresh the candidate list
        session.before_market_open(&feed, date).await?;

        // The paper venue needs a quote before a candidate is tradeable
        for symbol in session.candidates() {
            broker
                .ensure_price(symbol, config.paper.default_price)
                .await;
        }

        // PHASE 2: REBALANCE - buy candidates, sweep aged positions
        let summary = match session.rebalance(&broker, date).await {
            Ok(summary) => summary,
            Err(e) => {
                error!(%date, error = %e, "Rebalance aborted, skipping to next day");
                continue;
            }
        };
        persist_day(&persistence, &broker, &config, &summary).await?;
        info!(summary = %summary.to_json(), "Rebalance complete");

        // PHASE 3: CLOSE - end-of-day bookkeeping
        session.end_of_day();
    }

    log_final_report(&broker, &persistence, &config).await?;
    Ok(())
}

/// Persist one day's buys, sells, and account state.
async fn persist_day(
    persistence: &PersistenceManager,
    broker: &PaperBroker,
    config: &Config,
    summary: &RebalanceSummary,
) -> Result<()> {
    for buy in &summary.submitted {
        let record = broker.get_order(buy.order_id).await?;
        persistence.record_trade(
            &summary.date,
            &record.symbol,
            "buy",
            record.id,
            record.filled_qty,
        )?;
        persistence.insert_tracked_order(&record)?;
    }

    let sold_ids: Vec<OrderId> = summary.sweep.sold.iter().map(|c| c.order_id).collect();
    persistence.remove_tracked_orders(&sold_ids)?;
    for closed in &summary.sweep.sold {
        persistence.record_trade(
            &summary.date,
            &closed.symbol,
            "sell",
            closed.sell_order_id,
            closed.quantity,
        )?;
    }

    let account = broker.account().await?;
    persistence.save_account(config.paper.starting_cash, account.cash, &summary.date)?;

    Ok(())
}

/// Log the end-of-session summary.
async fn log_final_report(
    broker: &PaperBroker,
    persistence: &PersistenceManager,
    config: &Config,
) -> Result<()> {
    let account = broker.account().await?;
    let state = broker.get_state().await;
    let pnl = account.portfolio_value - config.paper.starting_cash;

    info!("╔════════════════════════════════════════════════════════════╗");
    info!("║                    SESSION REPORT                          ║");
    info!("╠════════════════════════════════════════════════════════════╣");
    info!(
        "║ Starting Cash:      ${:>14.2}                        ",
        config.paper.starting_cash
    );
    info!(
        "║ Final Cash:         ${:>14.2}                        ",
        account.cash
    );
    info!(
        "║ Portfolio Value:    ${:>14.2}                        ",
        account.portfolio_value
    );
    info!(
        "║ PnL:                ${:>14.2} ({:+.2}%)              ",
        pnl,
        percent_of(pnl, config.paper.starting_cash)
    );
    info!(
        "║ Orders Issued:      {:>6}                                 ",
        state.orders.len()
    );
    info!(
        "║ Trades Recorded:    {:>6}                                 ",
        persistence.trade_count()?
    );
    info!(
        "║ Still Tracked:      {:>6}                                 ",
        persistence.tracked_count()?
    );
    info!("╚════════════════════════════════════════════════════════════╝");

    Ok(())
}

/// Show session status from persisted state.
fn show_status(db_path: &str) -> Result<()> {
    use std::path::Path;

    println!("╔════════════════════════════════════════════════════════════╗");
    println!("║              BUYBACK TRADER STATUS                         ║");
    println!("╚════════════════════════════════════════════════════════════╝");

    if !Path::new(db_path).exists() {
        println!("\n❌ Database not found: {}", db_path);
        println!("   No paper session has been run yet, or the database path is incorrect.");
        return Ok(());
    }

    let persistence = PersistenceManager::new(db_path)?;

    let Some(account) = persistence.load_account()? else {
        println!("\n❌ No saved state found in database.");
        return Ok(());
    };

    let pnl = account.cash - account.starting_cash;

    println!("\n📊 Account Summary");
    println!("   ├─ Starting Cash:    ${:.2}", account.starting_cash);
    println!("   ├─ Current Cash:     ${:.2}", account.cash);
    println!(
        "   └─ Cash PnL:         ${:.2} ({:+.2}%)",
        pnl,
        percent_of(pnl, account.starting_cash)
    );

    let tracked = persistence.load_tracked_orders()?;
    println!("\n📈 Activity");
    println!("   ├─ Trades Recorded:  {}", persistence.trade_count()?);
    println!("   └─ Tracked Orders:   {}", tracked.len());

    if !tracked.is_empty() {
        println!("\n🔓 Open Positions");
        for order in &tracked {
            println!("   ┌─ {} (order {})", order.symbol, order.id);
            println!("   ├─ Submitted: {}", order.created);
            println!("   └─ Filled:    {} shares", order.filled_qty);
        }
    }

    println!();
    Ok(())
}
