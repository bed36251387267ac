//! Todoist client (REST v2)

use crate::integrations::error::IntegrationError;
use crate::integrations::tasks::{Task, TaskSource};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;

const TODOIST_API_BASE_URL: &str = "https://api.todoist.com/rest/v2";

/// Todoist API client
#[derive(Debug, Clone)]
pub struct TodoistClient {
    client: reqwest::Client,
    api_token: String,
    base_url: String,
}

#[derive(Deserialize, Debug)]
struct TodoistTask {
    content: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    due: Option<TodoistDue>,
    #[serde(default = "default_priority")]
    priority: u8,
    #[serde(default)]
    labels: Vec<String>,
}

#[derive(Deserialize, Debug)]
struct TodoistDue {
    date: String,
}

fn default_priority() -> u8 {
    1
}

impl TodoistDue {
    /// Due values are either a plain date or a datetime; only the date matters
    fn as_date(&self) -> Option<NaiveDate> {
        let date_part = self.date.get(..10).unwrap_or(&self.date);
        NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
    }
}

impl From<TodoistTask> for Task {
    fn from(raw: TodoistTask) -> Self {
        Task {
            due: raw.due.as_ref().and_then(TodoistDue::as_date),
            content: raw.content,
            description: raw.description.filter(|d| !d.trim().is_empty()),
            priority: raw.priority,
            labels: raw.labels,
        }
    }
}

impl TodoistClient {
    /// Create a client authenticated with a personal API token
    pub fn new(client: reqwest::Client, api_token: String) -> Self {
        Self {
            client,
            api_token,
            base_url: TODOIST_API_BASE_URL.to_string(),
        }
    }

    /// Point the client at a different API root (used in tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl TaskSource for TodoistClient {
    async fn list_tasks(&self) -> Result<Vec<Task>, IntegrationError> {
        if self.api_token.is_empty() {
            return Err(IntegrationError::MissingCredentials("TODOIST_API_TOKEN"));
        }

        let url = format!("{}/tasks", self.base_url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error body".to_string());
            return Err(IntegrationError::from_status(
                "Todoist",
                status.as_u16(),
                &body,
            ));
        }

        let raw: Vec<TodoistTask> = response.json().await.map_err(|e| {
            IntegrationError::SourceUnavailable(format!("Failed to parse Todoist tasks: {}", e))
        })?;

        tracing::debug!(count = raw.len(), "Fetched Todoist tasks");
        Ok(raw.into_iter().map(Task::from).collect())
    }
}
