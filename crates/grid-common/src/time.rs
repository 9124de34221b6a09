//! Time handling for extraction queries.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// A closed time interval `[start, end]` for extraction queries.
///
/// Both endpoints are included, matching the slice semantics of the
/// gridded source collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, dt: &DateTime<Utc>) -> bool {
        dt >= &self.start && dt <= &self.end
    }

    /// Index range of the time stamps falling inside this interval.
    ///
    /// `times` must be sorted ascending.
    pub fn indices_within(&self, times: &[DateTime<Utc>]) -> std::ops::Range<usize> {
        let start = times.partition_point(|t| *t < self.start);
        let end = times.partition_point(|t| *t <= self.end);
        start..end.max(start)
    }
}

/// Parse an ISO 8601 / RFC 3339 timestamp, accepting a bare date or a
/// datetime without timezone (interpreted as UTC).
pub fn parse_iso8601(s: &str) -> Result<DateTime<Utc>, TimeParseError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Ok(ndt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Ok(Utc.from_utc_datetime(&ndt));
    }

    if let Ok(ndt) = NaiveDateTime::parse_from_str(&format!("{s}T00:00:00"), "%Y-%m-%dT%H:%M:%S") {
        return Ok(Utc.from_utc_datetime(&ndt));
    }

    Err(TimeParseError::InvalidFormat(s.to_string()))
}

#[derive(Debug, thiserror::Error)]
pub enum TimeParseError {
    #[error("invalid time format: {0}")]
    InvalidFormat(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    fn hour(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, h, 0, 0).unwrap()
    }

    #[test]
    fn test_parse_iso8601() {
        let dt = parse_iso8601("2024-01-15T12:00:00Z").unwrap();
        assert_eq!(dt.year(), 2024);
        assert_eq!(dt.hour(), 12);

        let dt = parse_iso8601("2024-01-15").unwrap();
        assert_eq!(dt.day(), 15);
        assert_eq!(dt.hour(), 0);

        assert!(parse_iso8601("noon-ish").is_err());
    }

    #[test]
    fn test_indices_within_closed_interval() {
        let times: Vec<_> = (0..6).map(hour).collect();
        let range = TimeRange::new(hour(1), hour(3));

        // Both endpoints included.
        assert_eq!(range.indices_within(&times), 1..4);

        let empty = TimeRange::new(hour(7), hour(9));
        assert!(empty.indices_within(&times).is_empty());
    }
}
