//! Calendar and event types.
//!
//! - [`CalendarDescriptor`]: a calendar the user can see
//! - [`Event`]: a single (already expanded) event instance
//! - [`BusyInterval`] / [`FreeInterval`]: free/busy building blocks

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Name used for calendars that have no summary.
pub const UNKNOWN_CALENDAR: &str = "Unknown";

/// Title used for events that have no summary.
pub const UNTITLED_EVENT: &str = "(No title)";

/// A calendar visible to the authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarDescriptor {
    /// Opaque provider identifier, used in queries.
    pub id: String,
    /// Human-readable name, used for exclusion and reporting.
    pub display_name: String,
}

impl CalendarDescriptor {
    /// Creates a descriptor, falling back to [`UNKNOWN_CALENDAR`] when the
    /// provider supplied no name.
    pub fn new(id: impl Into<String>, display_name: Option<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.unwrap_or_else(|| UNKNOWN_CALENDAR.to_string()),
        }
    }
}

/// The start of an event as the provider reported it.
///
/// The value is kept verbatim so it can be reported back unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum EventStart {
    /// A timed event, e.g. `2026-01-26T09:00:00Z`.
    DateTime(String),
    /// An all-day event, e.g. `2026-01-26`.
    Date(String),
}

impl EventStart {
    pub fn as_str(&self) -> &str {
        match self {
            Self::DateTime(s) | Self::Date(s) => s,
        }
    }

    pub fn is_all_day(&self) -> bool {
        matches!(self, Self::Date(_))
    }
}

impl fmt::Display for EventStart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An event instance found in a calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub summary: String,
    pub start: EventStart,
    /// Display name of the calendar the event was found in.
    pub calendar_name: String,
}

impl Event {
    pub fn new(summary: Option<String>, start: EventStart, calendar_name: impl Into<String>) -> Self {
        Self {
            summary: summary.unwrap_or_else(|| UNTITLED_EVENT.to_string()),
            start,
            calendar_name: calendar_name.into(),
        }
    }

    /// `<summary> (on <calendar>) at <start>`
    pub fn describe(&self) -> String {
        format!("{} (on {}) at {}", self.summary, self.calendar_name, self.start)
    }
}

/// A busy period reported by a free/busy query. Half-open `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusyInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl BusyInterval {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }
}

/// A gap between busy periods. Always has positive length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreeInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl fmt::Display for FreeInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.start.format("%H:%M"), self.end.format("%H:%M"))
    }
}
