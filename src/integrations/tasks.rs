//! Task source contract

use crate::integrations::error::IntegrationError;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A task read from the task manager
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Task text
    pub content: String,
    /// Optional longer description
    #[serde(default)]
    pub description: Option<String>,
    /// Due date, if any
    #[serde(default)]
    pub due: Option<NaiveDate>,
    /// Provider priority, 1 (normal) to 4 (urgent)
    pub priority: u8,
    /// Labels attached to the task
    #[serde(default)]
    pub labels: Vec<String>,
}

impl Task {
    /// Create a task with default priority and no metadata
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            description: None,
            due: None,
            priority: 1,
            labels: Vec::new(),
        }
    }

    /// Set the due date
    pub fn due_on(mut self, date: NaiveDate) -> Self {
        self.due = Some(date);
        self
    }

    /// Planner priority label for the provider priority
    ///
    /// Provider priority 4 is the most urgent and maps to "P1".
    pub fn priority_label(&self) -> &'static str {
        match self.priority {
            4 => "P1",
            3 => "P2",
            2 => "P3",
            _ => "P4",
        }
    }
}

/// A task manager the planner reads from
#[async_trait]
pub trait TaskSource: Send + Sync {
    /// List all open tasks in provider order
    async fn list_tasks(&self) -> Result<Vec<Task>, IntegrationError>;
}
