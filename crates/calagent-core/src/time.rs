//! Time handling for availability queries.
//!
//! This module provides [`normalize_timestamp`] for making caller-supplied
//! timestamps RFC 3339 compliant, and [`TimeWindow`] for the half-open
//! ranges used by free/busy queries.

use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced while parsing caller-supplied times.
#[derive(Debug, Error)]
pub enum TimeError {
    /// The value is not an RFC 3339 instant.
    #[error("invalid timestamp '{value}': {source}")]
    InvalidInstant {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    /// The value is not a `YYYY-MM-DD` date.
    #[error("invalid date '{value}': {source}")]
    InvalidDate {
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}

/// Qualifies a timestamp as UTC when it carries no offset.
///
/// A value that neither ends in `Z` nor contains `+` gets a `Z` appended.
/// Anything else is returned unchanged. The calendar API rejects
/// unqualified timestamps, so every query goes through this first.
///
/// ```
/// use calagent_core::normalize_timestamp;
///
/// assert_eq!(normalize_timestamp("2026-01-26T20:00:00"), "2026-01-26T20:00:00Z");
/// assert_eq!(normalize_timestamp("2026-01-26T20:00:00+01:00"), "2026-01-26T20:00:00+01:00");
/// ```
pub fn normalize_timestamp(value: &str) -> String {
    if value.ends_with('Z') || value.contains('+') {
        value.to_string()
    } else {
        format!("{}Z", value)
    }
}

/// Parses an RFC 3339 instant and converts it to UTC.
pub fn parse_instant(value: &str) -> Result<DateTime<Utc>, TimeError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|source| TimeError::InvalidInstant {
            value: value.to_string(),
            source,
        })
}

/// Parses a `YYYY-MM-DD` calendar date.
pub fn parse_date(value: &str) -> Result<NaiveDate, TimeError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|source| TimeError::InvalidDate {
        value: value.to_string(),
        source,
    })
}

/// Formats an instant the way the calendar API expects it (`...Z`, whole seconds).
pub fn to_rfc3339(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// A time window for free/busy queries.
///
/// Represents a half-open interval `[start, end)` in UTC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Start of the window (inclusive).
    pub start: DateTime<Utc>,
    /// End of the window (exclusive).
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Creates a new time window, or `None` if `end` precedes `start`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    /// The bounds of a UTC day: `[date 00:00:00Z, date 23:59:59Z)`.
    ///
    /// The end stops one second short of midnight, so the last free slot of
    /// a day renders as `23:59`.
    pub fn for_utc_day(date: NaiveDate) -> Self {
        let start = date.and_time(NaiveTime::MIN).and_utc();
        let end = date
            .and_time(NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN))
            .and_utc();
        Self { start, end }
    }

    /// Returns the duration of the window.
    pub fn duration(&self) -> chrono::Duration {
        self.end - self.start
    }

    /// Returns `true` if the window has zero length.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Start of the window in API format.
    pub fn start_rfc3339(&self) -> String {
        to_rfc3339(&self.start)
    }

    /// End of the window in API format.
    pub fn end_rfc3339(&self) -> String {
        to_rfc3339(&self.end)
    }
}
