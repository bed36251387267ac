//! Calendar source contract
//!
//! Defines the events the planner reads from a calendar and the events it
//! writes back after the user approves a plan.

use crate::integrations::error::IntegrationError;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// An event read from the calendar
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    /// Event start (all-day events start at midnight UTC of their date)
    pub start: DateTime<Utc>,
    /// Event end
    pub end: DateTime<Utc>,
    /// The event spans whole days and has no wall-clock time
    #[serde(default)]
    pub all_day: bool,
    /// Raw event title, possibly carrying a category tag
    pub title: String,
    /// Optional free-text description
    pub description: Option<String>,
    /// Optional location
    pub location: Option<String>,
}

/// An event to be created in the calendar
///
/// Times are wall-clock times interpreted in `timezone`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCalendarEvent {
    /// Event title
    pub title: String,
    /// Local start time
    pub start: NaiveDateTime,
    /// Local end time
    pub end: NaiveDateTime,
    /// Description carrying the planning metadata
    pub description: String,
    /// IANA timezone name (e.g. "Europe/Berlin")
    pub timezone: String,
}

/// A calendar the planner can read from and write to
#[async_trait]
pub trait CalendarSource: Send + Sync {
    /// List events overlapping `[window_start, window_end]`, ordered by start
    async fn list_events(
        &self,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>, IntegrationError>;

    /// The calendar's configured timezone
    async fn timezone(&self) -> Result<String, IntegrationError>;

    /// Create one event, returning the provider-assigned identifier
    ///
    /// Fails with [`IntegrationError::CalendarWrite`] when the write is rejected.
    async fn create_event(&self, event: &NewCalendarEvent) -> Result<String, IntegrationError>;
}
