//! In-memory calendar fakes shared by the unit tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

use calagent_core::{BusyInterval, CalendarDescriptor, Event, EventStart};
use calagent_providers::{
    AuthError, BoxFuture, CalendarApi, ClientSource, ProviderError, ProviderResult,
};

pub(crate) fn utc(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
}

#[derive(Default)]
pub(crate) struct FakeCalendar {
    calendars: Vec<CalendarDescriptor>,
    events: HashMap<String, Vec<Event>>,
    busy: HashMap<String, Vec<BusyInterval>>,
    failing: Option<String>,
    pub(crate) queried: Mutex<Vec<String>>,
    pub(crate) windows: Mutex<Vec<(String, String)>>,
}

impl FakeCalendar {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_calendar(mut self, id: &str, name: &str) -> Self {
        self.calendars
            .push(CalendarDescriptor::new(id, Some(name.to_string())));
        self
    }

    pub(crate) fn with_event(mut self, calendar_id: &str, summary: &str, start: &str) -> Self {
        let name = self
            .calendars
            .iter()
            .find(|c| c.id == calendar_id)
            .map(|c| c.display_name.clone())
            .unwrap_or_default();
        self.events.entry(calendar_id.to_string()).or_default().push(Event::new(
            Some(summary.to_string()),
            EventStart::DateTime(start.to_string()),
            name,
        ));
        self
    }

    pub(crate) fn with_busy(mut self, calendar_id: &str, start: &str, end: &str) -> Self {
        self.busy
            .entry(calendar_id.to_string())
            .or_default()
            .push(BusyInterval::new(utc(start), utc(end)));
        self
    }

    pub(crate) fn failing_on(mut self, calendar_id: &str) -> Self {
        self.failing = Some(calendar_id.to_string());
        self
    }

    pub(crate) fn queried(&self) -> Vec<String> {
        self.queried.lock().unwrap().clone()
    }

    fn check(&self, id: &str) -> ProviderResult<()> {
        if self.failing.as_deref() == Some(id) {
            return Err(ProviderError::server("backend unavailable").with_provider("fake"));
        }
        Ok(())
    }
}

struct FakeClient(Arc<FakeCalendar>);

impl CalendarApi for FakeClient {
    fn name(&self) -> &str {
        "fake"
    }

    fn list_calendars(&self) -> BoxFuture<'_, ProviderResult<Vec<CalendarDescriptor>>> {
        Box::pin(async move { Ok(self.0.calendars.clone()) })
    }

    fn list_events<'a>(
        &'a self,
        calendar: &'a CalendarDescriptor,
        time_min: &'a str,
        time_max: &'a str,
    ) -> BoxFuture<'a, ProviderResult<Vec<Event>>> {
        Box::pin(async move {
            self.0.queried.lock().unwrap().push(calendar.id.clone());
            self.0
                .windows
                .lock()
                .unwrap()
                .push((time_min.to_string(), time_max.to_string()));
            self.0.check(&calendar.id)?;
            Ok(self.0.events.get(&calendar.id).cloned().unwrap_or_default())
        })
    }

    fn free_busy<'a>(
        &'a self,
        calendar_ids: &'a [String],
        time_min: &'a str,
        time_max: &'a str,
    ) -> BoxFuture<'a, ProviderResult<HashMap<String, Vec<BusyInterval>>>> {
        Box::pin(async move {
            self.0
                .windows
                .lock()
                .unwrap()
                .push((time_min.to_string(), time_max.to_string()));
            let mut result = HashMap::new();
            for id in calendar_ids {
                self.0.queried.lock().unwrap().push(id.clone());
                self.0.check(id)?;
                result.insert(id.clone(), self.0.busy.get(id).cloned().unwrap_or_default());
            }
            Ok(result)
        })
    }
}

/// Hands out clients over one shared [`FakeCalendar`].
pub(crate) struct FakeSource {
    pub(crate) calendar: Arc<FakeCalendar>,
    unauthorized: bool,
}

impl FakeSource {
    pub(crate) fn new(calendar: FakeCalendar) -> Arc<Self> {
        Arc::new(Self {
            calendar: Arc::new(calendar),
            unauthorized: false,
        })
    }

    pub(crate) fn unauthorized() -> Arc<Self> {
        Arc::new(Self {
            calendar: Arc::new(FakeCalendar::new()),
            unauthorized: true,
        })
    }
}

impl ClientSource for FakeSource {
    fn obtain_client(&self) -> BoxFuture<'_, Result<Box<dyn CalendarApi>, AuthError>> {
        Box::pin(async move {
            if self.unauthorized {
                return Err(AuthError::AuthorizationRequired);
            }
            Ok(Box::new(FakeClient(self.calendar.clone())) as Box<dyn CalendarApi>)
        })
    }
}
