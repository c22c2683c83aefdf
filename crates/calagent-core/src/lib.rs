//! Core types: calendars, events, intervals, conflict and free-slot formatting

pub mod availability;
pub mod event;
pub mod freeslots;
pub mod time;
pub mod tracing;

pub use availability::{EXCLUDED_CALENDARS, FREE_MESSAGE, format_conflicts, is_excluded};
pub use event::{BusyInterval, CalendarDescriptor, Event, EventStart, FreeInterval};
pub use freeslots::{compute_free_slots, summarize_free_time};
pub use time::{TimeError, TimeWindow, normalize_timestamp, parse_date, parse_instant};
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
