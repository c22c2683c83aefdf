//! The calendar tools exposed to LLM agents.
//!
//! Both tools return plain text. Failures never escape as errors: they are
//! rendered into the returned string so the model can read them.

use std::sync::Arc;

use tracing::{debug, instrument};

use calagent_core::{
    TimeWindow, format_conflicts, is_excluded, normalize_timestamp, parse_date, parse_instant,
    summarize_free_time,
};
use calagent_providers::ClientSource;

use crate::error::ToolError;

/// Calendar consulted by `get_free_time`.
pub const PRIMARY_CALENDAR: &str = "primary";

const AVAILABILITY_ERROR: &str = "Error querying calendars";
const FREE_TIME_ERROR: &str = "Error checking free time";

/// Availability queries over the calendars of one user.
#[derive(Clone)]
pub struct CalendarTools {
    source: Arc<dyn ClientSource>,
}

impl CalendarTools {
    pub fn new(source: Arc<dyn ClientSource>) -> Self {
        Self { source }
    }

    /// Lists every event between `start` and `end` across all calendars
    /// except holiday, birthday and contact calendars.
    ///
    /// Timestamps without an offset are taken as UTC.
    #[instrument(skip(self))]
    pub async fn check_availability(&self, start: &str, end: &str) -> String {
        match self.scan_conflicts(start, end).await {
            Ok(text) => text,
            Err(e) => {
                debug!(error = %e, "availability query failed");
                format!("{}: {}", AVAILABILITY_ERROR, e)
            }
        }
    }

    /// Lists the free slots of the primary calendar on `date` (`YYYY-MM-DD`,
    /// UTC day).
    #[instrument(skip(self))]
    pub async fn get_free_time(&self, date: &str) -> String {
        match self.free_slots(date).await {
            Ok(text) => text,
            Err(e) => {
                debug!(error = %e, "free time query failed");
                format!("{}: {}", FREE_TIME_ERROR, e)
            }
        }
    }

    /// Static text served as the `calendar://summary` resource.
    pub fn summary(&self) -> &'static str {
        "Calendar summary: use check_availability to find conflicts across all \
         calendars, or get_free_time to list free slots on the primary calendar."
    }

    async fn scan_conflicts(&self, start: &str, end: &str) -> Result<String, ToolError> {
        let time_min = normalize_timestamp(start);
        let time_max = normalize_timestamp(end);

        let window_start = parse_instant(&time_min)?;
        let window_end = parse_instant(&time_max)?;
        if TimeWindow::new(window_start, window_end).is_none() {
            return Err(ToolError::InvalidWindow {
                start: time_min,
                end: time_max,
            });
        }

        let client = self.source.obtain_client().await?;
        let calendars = client.list_calendars().await?;
        debug!(count = calendars.len(), "listed calendars");

        let mut events = Vec::new();
        for calendar in &calendars {
            if is_excluded(&calendar.display_name) {
                debug!(calendar = %calendar.display_name, "skipping excluded calendar");
                continue;
            }
            let found = client.list_events(calendar, &time_min, &time_max).await?;
            debug!(calendar = %calendar.display_name, events = found.len(), "listed events");
            events.extend(found);
        }

        Ok(format_conflicts(&events))
    }

    async fn free_slots(&self, date: &str) -> Result<String, ToolError> {
        let day = parse_date(date)?;
        let window = TimeWindow::for_utc_day(day);

        let client = self.source.obtain_client().await?;
        let ids = [PRIMARY_CALENDAR.to_string()];
        let mut busy = client
            .free_busy(&ids, &window.start_rfc3339(), &window.end_rfc3339())
            .await?;
        let intervals = busy.remove(PRIMARY_CALENDAR).unwrap_or_default();
        debug!(busy = intervals.len(), "fetched busy intervals");

        Ok(summarize_free_time(date, &window, &intervals))
    }
}
