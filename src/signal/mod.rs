//! Buyback-announcement signal feed and candidate selection.
//!
//! The external pipeline delivers one row per security for the current
//! trading day; candidate selection keeps the symbols whose announcement
//! flag fired, in input order.

mod csv_feed;

pub use csv_feed::CsvAnnouncementFeed;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Per-security pipeline row for a single trading day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalRow {
    pub symbol: String,
    /// Whether a buyback announcement was published for this symbol today
    pub announced_today: bool,
}

/// Symbols whose announcement flag is set, preserving input order.
///
/// An empty input yields an empty list.
pub fn select_candidates(rows: &[SignalRow]) -> Vec<String> {
    rows.iter()
        .filter(|row| row.announced_today)
        .map(|row| row.symbol.clone())
        .collect()
}

/// Source of daily announcement rows.
///
/// Implementations guarantee that `rows_for` serves rows for the requested
/// trading day only.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AnnouncementFeed: Send + Sync {
    /// Fetch all signal rows for the given trading date (`YYYY-MM-DD`).
    async fn rows_for(&self, date: &str) -> anyhow::Result<Vec<SignalRow>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(symbol: &str, announced: bool) -> SignalRow {
        SignalRow {
            symbol: symbol.to_string(),
            announced_today: announced,
        }
    }

    #[test]
    fn test_select_candidates_keeps_flagged_in_order() {
        let rows = vec![
            row("AAPL", true),
            row("MSFT", false),
            row("IBM", true),
            row("GE", true),
        ];

        assert_eq!(select_candidates(&rows), vec!["AAPL", "IBM", "GE"]);
    }

    #[test]
    fn test_select_candidates_empty_input() {
        assert!(select_candidates(&[]).is_empty());
    }

    #[test]
    fn test_select_candidates_none_flagged() {
        let rows = vec![row("AAPL", false), row("MSFT", false)];
        assert!(select_candidates(&rows).is_empty());
    }
}
