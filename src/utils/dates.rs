//! Calendar-date arithmetic for holding-period checks.
//!
//! The execution venue reports order creation dates as `YYYY-MM-DD`
//! strings; aging a position means parsing two of those and counting the
//! whole calendar days between them.

use chrono::NaiveDate;

/// Date format used across the feed, the venue, and the tracker.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A trade-date string that does not parse as `YYYY-MM-DD`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid trade date {input:?}: expected YYYY-MM-DD")]
pub struct DateParseError {
    pub input: String,
}

/// Parse a `YYYY-MM-DD` trade date.
pub fn parse_trade_date(input: &str) -> Result<NaiveDate, DateParseError> {
    NaiveDate::parse_from_str(input, DATE_FORMAT).map_err(|_| DateParseError {
        input: input.to_string(),
    })
}

/// Absolute difference between two trade dates in whole calendar days.
///
/// Symmetric: `days_between(a, b) == days_between(b, a)`.
pub fn days_between(a: &str, b: &str) -> Result<i64, DateParseError> {
    let a = parse_trade_date(a)?;
    let b = parse_trade_date(b)?;
    Ok((b - a).num_days().abs())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sixty_day_span() {
        assert_eq!(days_between("2020-01-01", "2020-03-01").unwrap(), 60);
    }

    #[test]
    fn test_symmetric() {
        assert_eq!(
            days_between("2010-04-12", "2010-06-30").unwrap(),
            days_between("2010-06-30", "2010-04-12").unwrap()
        );
    }

    #[test]
    fn test_same_day_is_zero() {
        assert_eq!(days_between("2010-05-05", "2010-05-05").unwrap(), 0);
    }

    #[test]
    fn test_malformed_first_argument() {
        let err = days_between("05/05/2010", "2010-05-05").unwrap_err();
        assert_eq!(err.input, "05/05/2010");
    }

    #[test]
    fn test_malformed_second_argument() {
        assert!(days_between("2010-05-05", "not-a-date").is_err());
    }

    #[test]
    fn test_crosses_year_boundary() {
        assert_eq!(days_between("2010-12-31", "2011-01-01").unwrap(), 1);
    }
}
