//! Calendar API abstraction.
//!
//! [`CalendarApi`] is the read-only surface the availability tools need.
//! [`ClientSource`] hands out an authenticated [`CalendarApi`] per
//! request. Both traits are object-safe so the tools can be tested against
//! in-memory fakes.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use calagent_core::{BusyInterval, CalendarDescriptor, Event};

use crate::error::{AuthError, ProviderResult};

/// A boxed future for async trait methods.
///
/// Keeps the traits below usable as `dyn` objects.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Read-only access to a user's calendars.
///
/// Timestamps are passed as RFC 3339 strings exactly as they should go on
/// the wire; callers normalize them first.
pub trait CalendarApi: Send + Sync {
    /// Short provider name for logs and errors.
    fn name(&self) -> &str;

    /// Lists every calendar the user can see, in provider order.
    fn list_calendars(&self) -> BoxFuture<'_, ProviderResult<Vec<CalendarDescriptor>>>;

    /// Lists event instances of one calendar inside `[time_min, time_max)`.
    ///
    /// Recurring events are expanded and results are ordered by start time.
    /// Returned events carry the calendar's display name.
    fn list_events<'a>(
        &'a self,
        calendar: &'a CalendarDescriptor,
        time_min: &'a str,
        time_max: &'a str,
    ) -> BoxFuture<'a, ProviderResult<Vec<Event>>>;

    /// Returns busy intervals per requested calendar id.
    fn free_busy<'a>(
        &'a self,
        calendar_ids: &'a [String],
        time_min: &'a str,
        time_max: &'a str,
    ) -> BoxFuture<'a, ProviderResult<HashMap<String, Vec<BusyInterval>>>>;
}

/// Produces an authenticated calendar client.
pub trait ClientSource: Send + Sync {
    fn obtain_client(&self) -> BoxFuture<'_, Result<Box<dyn CalendarApi>, AuthError>>;
}
