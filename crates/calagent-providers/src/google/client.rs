//! Google Calendar API v3 client.
//!
//! Read-only calls only: calendar list, event list and free/busy. List
//! calls follow `nextPageToken` until the result set is exhausted.

use std::collections::HashMap;

use calagent_core::{BusyInterval, CalendarDescriptor, Event, EventStart};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ProviderError, ProviderResult};
use crate::provider::{BoxFuture, CalendarApi};

const PROVIDER_NAME: &str = "google";

/// Client bound to one access token.
#[derive(Debug, Clone)]
pub struct GoogleCalendarClient {
    http_client: reqwest::Client,
    access_token: String,
    base_url: String,
}

impl GoogleCalendarClient {
    pub fn new(
        http_client: reqwest::Client,
        access_token: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            http_client,
            access_token: access_token.into(),
            base_url: base_url.into(),
        }
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub async fn calendar_list(&self) -> ProviderResult<Vec<CalendarDescriptor>> {
        let url = format!("{}/users/me/calendarList", self.base_url);
        let mut calendars = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query: Vec<(&str, &str)> = Vec::new();
            if let Some(token) = page_token.as_deref() {
                query.push(("pageToken", token));
            }

            let page: CalendarListResponse = self.get_json(&url, &query, "list calendars").await?;
            calendars.extend(
                page.items
                    .into_iter()
                    .map(|entry| CalendarDescriptor::new(entry.id, entry.summary)),
            );

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!("found {} calendars", calendars.len());
        Ok(calendars)
    }

    pub async fn events(
        &self,
        calendar: &CalendarDescriptor,
        time_min: &str,
        time_max: &str,
    ) -> ProviderResult<Vec<Event>> {
        let url = format!(
            "{}/calendars/{}/events",
            self.base_url,
            urlencoding::encode(&calendar.id)
        );
        let mut events = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![
                ("timeMin", time_min),
                ("timeMax", time_max),
                ("singleEvents", "true"),
                ("orderBy", "startTime"),
            ];
            if let Some(token) = page_token.as_deref() {
                query.push(("pageToken", token));
            }

            let page: EventListResponse = self.get_json(&url, &query, "list events").await?;
            events.extend(
                page.items
                    .into_iter()
                    .filter_map(|item| item.into_event(&calendar.display_name)),
            );

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!(
            "fetched {} events from calendar {:?}",
            events.len(),
            calendar.display_name
        );
        Ok(events)
    }

    pub async fn query_free_busy(
        &self,
        calendar_ids: &[String],
        time_min: &str,
        time_max: &str,
    ) -> ProviderResult<HashMap<String, Vec<BusyInterval>>> {
        let url = format!("{}/freeBusy", self.base_url);
        let body = FreeBusyRequest {
            time_min,
            time_max,
            items: calendar_ids
                .iter()
                .map(|id| FreeBusyItem { id: id.as_str() })
                .collect(),
        };

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::from_transport("free/busy query", e).with_provider(PROVIDER_NAME))?;

        let parsed: FreeBusyResponse = Self::read_json(response, "free/busy query").await?;

        let mut busy = HashMap::with_capacity(parsed.calendars.len());
        for (id, calendar) in parsed.calendars {
            if let Some(error) = calendar.errors.first() {
                return Err(free_busy_error(&id, &error.reason));
            }
            busy.insert(
                id,
                calendar
                    .busy
                    .into_iter()
                    .map(|period| BusyInterval::new(period.start, period.end))
                    .collect(),
            );
        }

        Ok(busy)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
        context: &str,
    ) -> ProviderResult<T> {
        let mut request = self.http_client.get(url).bearer_auth(&self.access_token);
        if !query.is_empty() {
            request = request.query(query);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ProviderError::from_transport(context, e).with_provider(PROVIDER_NAME))?;

        Self::read_json(response, context).await
    }

    async fn read_json<T: DeserializeOwned>(
        response: reqwest::Response,
        context: &str,
    ) -> ProviderResult<T> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::from_transport(context, e).with_provider(PROVIDER_NAME))?;

        if !status.is_success() {
            warn!("{} failed with {}", context, status);
            return Err(ProviderError::from_status(status, context, &body).with_provider(PROVIDER_NAME));
        }

        serde_json::from_str(&body).map_err(|e| {
            ProviderError::invalid_response(format!("failed to parse {} response: {}", context, e))
                .with_provider(PROVIDER_NAME)
        })
    }
}

/// A per-calendar error inside an otherwise successful free/busy response.
fn free_busy_error(calendar_id: &str, reason: &str) -> ProviderError {
    let message = format!("free/busy lookup failed for {}: {}", calendar_id, reason);
    match reason {
        "notFound" => ProviderError::not_found(message),
        _ => ProviderError::server(message),
    }
    .with_provider(PROVIDER_NAME)
}

impl CalendarApi for GoogleCalendarClient {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn list_calendars(&self) -> BoxFuture<'_, ProviderResult<Vec<CalendarDescriptor>>> {
        Box::pin(self.calendar_list())
    }

    fn list_events<'a>(
        &'a self,
        calendar: &'a CalendarDescriptor,
        time_min: &'a str,
        time_max: &'a str,
    ) -> BoxFuture<'a, ProviderResult<Vec<Event>>> {
        Box::pin(self.events(calendar, time_min, time_max))
    }

    fn free_busy<'a>(
        &'a self,
        calendar_ids: &'a [String],
        time_min: &'a str,
        time_max: &'a str,
    ) -> BoxFuture<'a, ProviderResult<HashMap<String, Vec<BusyInterval>>>> {
        Box::pin(self.query_free_busy(calendar_ids, time_min, time_max))
    }
}

/// Response from the calendarList endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CalendarListResponse {
    #[serde(default)]
    items: Vec<CalendarListEntry>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CalendarListEntry {
    id: String,
    summary: Option<String>,
}

/// Response from the events.list endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventListResponse {
    #[serde(default)]
    items: Vec<ApiEvent>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiEvent {
    summary: Option<String>,
    status: Option<String>,
    #[serde(default)]
    start: ApiEventTime,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiEventTime {
    date: Option<String>,
    date_time: Option<String>,
}

impl ApiEvent {
    /// Cancelled instances and events without a start are dropped.
    fn into_event(self, calendar_name: &str) -> Option<Event> {
        if self.status.as_deref() == Some("cancelled") {
            return None;
        }

        let start = match (self.start.date_time, self.start.date) {
            (Some(dt), _) => EventStart::DateTime(dt),
            (None, Some(date)) => EventStart::Date(date),
            (None, None) => {
                warn!("skipping event without start in {:?}", calendar_name);
                return None;
            }
        };

        Some(Event::new(self.summary, start, calendar_name))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FreeBusyRequest<'a> {
    time_min: &'a str,
    time_max: &'a str,
    items: Vec<FreeBusyItem<'a>>,
}

#[derive(Debug, Serialize)]
struct FreeBusyItem<'a> {
    id: &'a str,
}

#[derive(Debug, Deserialize)]
struct FreeBusyResponse {
    #[serde(default)]
    calendars: HashMap<String, FreeBusyCalendar>,
}

#[derive(Debug, Deserialize)]
struct FreeBusyCalendar {
    #[serde(default)]
    busy: Vec<FreeBusyPeriod>,
    #[serde(default)]
    errors: Vec<FreeBusyError>,
}

#[derive(Debug, Deserialize)]
struct FreeBusyPeriod {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct FreeBusyError {
    reason: String,
}
