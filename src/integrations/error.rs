//! Integration error types
//!
//! Errors raised by calendar and task sources. Read failures are absorbed by
//! the context aggregator; write failures are collected by the commit gate.

use thiserror::Error;

/// Errors that can occur while talking to a calendar or task provider
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IntegrationError {
    /// The provider could not be reached or returned an unusable response
    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),

    /// Creating a calendar event failed
    #[error("Calendar write failed: {0}")]
    CalendarWrite(String),

    /// The credential needed to reach the provider is not configured
    #[error("Missing credentials: {0} is not set")]
    MissingCredentials(&'static str),
}

impl IntegrationError {
    /// Build a `SourceUnavailable` error from an HTTP status and body
    pub fn from_status(provider: &str, status: u16, body: &str) -> Self {
        IntegrationError::SourceUnavailable(format!(
            "{} returned HTTP {}: {}",
            provider, status, body
        ))
    }
}

impl From<reqwest::Error> for IntegrationError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            IntegrationError::SourceUnavailable(format!("request timed out: {}", err))
        } else {
            IntegrationError::SourceUnavailable(err.to_string())
        }
    }
}
