//! Timestamp utilities
//!
//! Timestamps are stored as RFC 3339 UTC text, dates as `YYYY-MM-DD`.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};

use crate::{Error, Result};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Current UTC calendar date
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Render a timestamp in the storage format
pub fn to_storage(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a stored timestamp
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Corrupt timestamp '{}': {}", value, e)))
}

/// Parse a stored calendar date
pub fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| Error::Internal(format!("Corrupt date '{}': {}", value, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_now_returns_recent_timestamp() {
        let timestamp = now();
        // Between 2000-01-01 and 2100-01-01
        assert!(timestamp.timestamp() > 946_684_800);
        assert!(timestamp.timestamp() < 4_102_444_800);
    }

    #[test]
    fn test_storage_format_parses_back() {
        let ts = Utc.with_ymd_and_hms(2026, 1, 10, 9, 30, 0).unwrap();
        let stored = to_storage(ts);
        assert_eq!(stored, "2026-01-10T09:30:00.000Z");
        assert_eq!(parse_timestamp(&stored).unwrap(), ts);
    }

    #[test]
    fn test_parse_date() {
        let date = parse_date("2026-01-12").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2026, 1, 12).unwrap());
        assert!(parse_date("12/01/2026").is_err());
    }

    #[test]
    fn test_today_matches_now() {
        assert_eq!(today(), now().date_naive());
    }
}
