//! CSV-backed buyback announcement feed.

use super::{AnnouncementFeed, SignalRow};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

/// Announcement feed loaded from a CSV file.
///
/// Expected CSV format:
/// ```csv
/// date,symbol,announced
/// 2010-01-04,AAPL,true
/// 2010-01-04,MSFT,false
/// ```
///
/// Rows are indexed by trading date so a paper session can replay the feed
/// day by day.
#[derive(Clone)]
pub struct CsvAnnouncementFeed {
    /// Rows grouped by trading date, dates in ascending order
    rows_by_date: BTreeMap<String, Vec<SignalRow>>,
    /// Sorted distinct trading dates
    dates: Vec<String>,
}

impl CsvAnnouncementFeed {
    /// Load a feed from a CSV file.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read signal file: {}", path.display()))?;

        Self::from_csv_content(&content)
    }

    /// Load a feed from CSV content.
    pub fn from_csv_content(content: &str) -> Result<Self> {
        let mut rows: Vec<CsvRow> = Vec::new();

        for (line_num, line) in content.lines().enumerate() {
            // Skip header
            if line_num == 0 && line.starts_with("date") {
                continue;
            }

            if line.trim().is_empty() {
                continue;
            }

            let row = CsvRow::parse(line)
                .with_context(|| format!("Failed to parse line {}: {}", line_num + 1, line))?;
            rows.push(row);
        }

        if rows.is_empty() {
            anyhow::bail!("Signal file contains no data rows");
        }

        let mut rows_by_date: BTreeMap<String, Vec<SignalRow>> = BTreeMap::new();
        let mut seen: HashSet<(String, String)> = HashSet::new();

        for row in rows {
            anyhow::ensure!(
                seen.insert((row.date.clone(), row.symbol.clone())),
                "Duplicate row for {} on {}",
                row.symbol,
                row.date
            );
            rows_by_date.entry(row.date).or_default().push(SignalRow {
                symbol: row.symbol,
                announced_today: row.announced,
            });
        }

        let dates: Vec<String> = rows_by_date.keys().cloned().collect();

        Ok(Self {
            rows_by_date,
            dates,
        })
    }

    /// All trading dates present in the feed, ascending.
    pub fn trading_dates(&self) -> &[String] {
        &self.dates
    }

    /// Total number of trading dates.
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    /// Check if the feed has no data.
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

#[async_trait]
impl AnnouncementFeed for CsvAnnouncementFeed {
    async fn rows_for(&self, date: &str) -> Result<Vec<SignalRow>> {
        // A date absent from the file is a day with no pipeline rows at all.
        Ok(self.rows_by_date.get(date).cloned().unwrap_or_default())
    }
}

/// A single parsed CSV row.
struct CsvRow {
    date: String,
    symbol: String,
    announced: bool,
}

impl CsvRow {
    fn parse(line: &str) -> Result<Self> {
        let fields: Vec<&str> = line.split(',').map(|f| f.trim()).collect();
        anyhow::ensure!(
            fields.len() == 3,
            "Expected 3 fields (date,symbol,announced), got {}",
            fields.len()
        );

        let announced = match fields[2].to_ascii_lowercase().as_str() {
            "true" | "1" => true,
            "false" | "0" => false,
            other => anyhow::bail!("Invalid announced flag: {}", other),
        };

        anyhow::ensure!(!fields[0].is_empty(), "Empty date field");
        anyhow::ensure!(!fields[1].is_empty(), "Empty symbol field");

        Ok(Self {
            date: fields[0].to_string(),
            symbol: fields[1].to_string(),
            announced,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
date,symbol,announced
2010-01-05,AAPL,true
2010-01-04,MSFT,false
2010-01-04,IBM,true
2010-01-05,GE,0
";

    #[test]
    fn test_dates_sorted_and_distinct() {
        let feed = CsvAnnouncementFeed::from_csv_content(SAMPLE).unwrap();
        assert_eq!(feed.trading_dates(), ["2010-01-04", "2010-01-05"]);
        assert_eq!(feed.len(), 2);
    }

    #[test]
    fn test_rows_for_returns_only_that_day() {
        let feed = CsvAnnouncementFeed::from_csv_content(SAMPLE).unwrap();
        let rows = tokio_test::block_on(feed.rows_for("2010-01-04")).unwrap();

        let symbols: Vec<&str> = rows.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(symbols, ["MSFT", "IBM"]);
    }

    #[test]
    fn test_rows_for_unknown_date_is_empty() {
        let feed = CsvAnnouncementFeed::from_csv_content(SAMPLE).unwrap();
        let rows = tokio_test::block_on(feed.rows_for("2011-07-01")).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_numeric_flags_parse() {
        let feed = CsvAnnouncementFeed::from_csv_content(SAMPLE).unwrap();
        let rows = tokio_test::block_on(feed.rows_for("2010-01-05")).unwrap();

        assert!(rows.iter().any(|r| r.symbol == "AAPL" && r.announced_today));
        assert!(rows.iter().any(|r| r.symbol == "GE" && !r.announced_today));
    }

    #[test]
    fn test_malformed_flag_rejected() {
        let result = CsvAnnouncementFeed::from_csv_content("date,symbol,announced\n2010-01-04,AAPL,maybe\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_file_rejected() {
        assert!(CsvAnnouncementFeed::from_csv_content("date,symbol,announced\n").is_err());
    }

    #[test]
    fn test_duplicate_row_rejected() {
        let content = "date,symbol,announced\n2010-01-04,AAPL,true\n2010-01-04,AAPL,false\n";
        assert!(CsvAnnouncementFeed::from_csv_content(content).is_err());
    }
}
