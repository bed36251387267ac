//! External data sources
//!
//! Contracts for the calendar and task providers the planner reads from and
//! writes to, plus their HTTP implementations.
//!
//! The orchestrator only depends on the [`CalendarSource`] and [`TaskSource`]
//! traits, so tests can swap in in-memory sources.

pub mod calendar;
pub mod error;
pub mod google_calendar;
pub mod parsers;
pub mod tasks;
pub mod todoist;

pub use calendar::{CalendarEvent, CalendarSource, NewCalendarEvent};
pub use error::IntegrationError;
pub use google_calendar::GoogleCalendarClient;
pub use tasks::{Task, TaskSource};
pub use todoist::TodoistClient;
