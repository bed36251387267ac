//! Google Calendar client
//!
//! Direct HTTP client for the Google Calendar v3 REST API. Authentication is a
//! bearer access token supplied through configuration; obtaining and refreshing
//! that token is outside this crate.

use crate::integrations::calendar::{CalendarEvent, CalendarSource, NewCalendarEvent};
use crate::integrations::error::IntegrationError;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

const GOOGLE_CALENDAR_API_BASE_URL: &str = "https://www.googleapis.com/calendar/v3";

/// Events requested per page
const PAGE_SIZE: &str = "100";

/// Pages followed per window before the listing is cut short
const MAX_PAGES: usize = 10;

/// Google Calendar API client bound to one calendar
#[derive(Debug, Clone)]
pub struct GoogleCalendarClient {
    client: reqwest::Client,
    access_token: String,
    calendar_id: String,
    base_url: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct EventsListResponse {
    #[serde(default)]
    items: Vec<EventResource>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Deserialize, Debug)]
struct EventResource {
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    location: Option<String>,
    start: EventTime,
    end: EventTime,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct EventTime {
    #[serde(default)]
    date_time: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    date: Option<NaiveDate>,
}

impl EventTime {
    fn to_utc(&self) -> Option<DateTime<Utc>> {
        if let Some(dt) = self.date_time {
            return Some(dt.with_timezone(&Utc));
        }
        self.date
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc())
    }
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct CalendarResource {
    time_zone: String,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct InsertEventRequest<'a> {
    summary: &'a str,
    description: &'a str,
    start: InsertEventTime<'a>,
    end: InsertEventTime<'a>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct InsertEventTime<'a> {
    date_time: String,
    time_zone: &'a str,
}

#[derive(Deserialize, Debug)]
struct InsertEventResponse {
    id: String,
}

impl GoogleCalendarClient {
    /// Create a client for `calendar_id` ("primary" for the user's main calendar)
    pub fn new(client: reqwest::Client, access_token: String, calendar_id: String) -> Self {
        Self {
            client,
            access_token,
            calendar_id,
            base_url: GOOGLE_CALENDAR_API_BASE_URL.to_string(),
        }
    }

    /// Point the client at a different API root (used in tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn token(&self) -> Result<&str, IntegrationError> {
        if self.access_token.is_empty() {
            return Err(IntegrationError::MissingCredentials("GOOGLE_CALENDAR_TOKEN"));
        }
        Ok(&self.access_token)
    }

    fn calendar_url(&self) -> String {
        format!("{}/calendars/{}", self.base_url, self.calendar_id)
    }
}

#[async_trait]
impl CalendarSource for GoogleCalendarClient {
    async fn list_events(
        &self,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>, IntegrationError> {
        let token = self.token()?;
        let url = format!("{}/events", self.calendar_url());

        tracing::debug!(
            calendar_id = %self.calendar_id,
            window_start = %window_start,
            window_end = %window_end,
            "Listing calendar events"
        );

        let time_min = window_start.to_rfc3339_opts(SecondsFormat::Secs, true);
        let time_max = window_end.to_rfc3339_opts(SecondsFormat::Secs, true);
        let mut items = Vec::new();
        let mut page_token: Option<String> = None;

        for page in 1..=MAX_PAGES {
            let mut query = vec![
                ("timeMin", time_min.as_str()),
                ("timeMax", time_max.as_str()),
                ("singleEvents", "true"),
                ("orderBy", "startTime"),
                ("maxResults", PAGE_SIZE),
            ];
            if let Some(next) = page_token.as_deref() {
                query.push(("pageToken", next));
            }

            let response = self
                .client
                .get(&url)
                .bearer_auth(token)
                .query(&query)
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                let body = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unable to read error body".to_string());
                return Err(IntegrationError::from_status(
                    "Google Calendar",
                    status.as_u16(),
                    &body,
                ));
            }

            let parsed: EventsListResponse = response.json().await.map_err(|e| {
                IntegrationError::SourceUnavailable(format!(
                    "Failed to parse Google Calendar events: {}",
                    e
                ))
            })?;
            items.extend(parsed.items);

            match parsed.next_page_token {
                Some(next) if page < MAX_PAGES => page_token = Some(next),
                Some(_) => {
                    tracing::warn!(pages = MAX_PAGES, "Calendar listing truncated at page limit");
                    break;
                }
                None => break,
            }
        }

        let mut events = Vec::with_capacity(items.len());
        for item in items {
            let (Some(start), Some(end)) = (item.start.to_utc(), item.end.to_utc()) else {
                tracing::warn!(
                    title = ?item.summary,
                    "Skipping calendar event without a usable start or end"
                );
                continue;
            };
            events.push(CalendarEvent {
                start,
                end,
                all_day: item.start.date_time.is_none(),
                title: item.summary.unwrap_or_else(|| "No title".to_string()),
                description: item.description.filter(|d| !d.trim().is_empty()),
                location: item.location.filter(|l| !l.trim().is_empty()),
            });
        }
        events.sort_by_key(|e| e.start);

        tracing::debug!(count = events.len(), "Fetched calendar events");
        Ok(events)
    }

    async fn timezone(&self) -> Result<String, IntegrationError> {
        let token = self.token()?;
        let response = self
            .client
            .get(self.calendar_url())
            .bearer_auth(token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error body".to_string());
            return Err(IntegrationError::from_status(
                "Google Calendar",
                status.as_u16(),
                &body,
            ));
        }

        let calendar: CalendarResource = response.json().await.map_err(|e| {
            IntegrationError::SourceUnavailable(format!("Failed to parse calendar: {}", e))
        })?;
        Ok(calendar.time_zone)
    }

    async fn create_event(&self, event: &NewCalendarEvent) -> Result<String, IntegrationError> {
        let token = self
            .token()
            .map_err(|e| IntegrationError::CalendarWrite(e.to_string()))?;
        let url = format!("{}/events", self.calendar_url());

        let body = InsertEventRequest {
            summary: &event.title,
            description: &event.description,
            start: InsertEventTime {
                date_time: event.start.format("%Y-%m-%dT%H:%M:%S").to_string(),
                time_zone: &event.timezone,
            },
            end: InsertEventTime {
                date_time: event.end.format("%Y-%m-%dT%H:%M:%S").to_string(),
                time_zone: &event.timezone,
            },
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| IntegrationError::CalendarWrite(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error body".to_string());
            return Err(IntegrationError::CalendarWrite(format!(
                "Google Calendar returned HTTP {}: {}",
                status.as_u16(),
                body
            )));
        }

        let created: InsertEventResponse = response.json().await.map_err(|e| {
            IntegrationError::CalendarWrite(format!("Failed to parse created event: {}", e))
        })?;

        tracing::debug!(event_id = %created.id, title = %event.title, "Created calendar event");
        Ok(created.id)
    }
}
