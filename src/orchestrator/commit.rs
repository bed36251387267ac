//! Commit Gate
//!
//! Writes the approved subset of proposed entries to the calendar. Each entry
//! is written independently: a failed write is recorded and the remaining
//! entries are still attempted.

use crate::integrations::{CalendarSource, NewCalendarEvent};
use crate::orchestrator::constants::FALLBACK_TIMEZONE;
use crate::orchestrator::error::OrchestratorError;
use crate::orchestrator::materializer::ProposedEntry;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

/// An entry written to the calendar
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrittenEntry {
    /// Proposed entry id
    pub entry_id: String,
    /// Provider-assigned event id
    pub event_id: String,
    /// Entry title
    pub title: String,
}

/// An entry that could not be written
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitFailure {
    /// Proposed entry id
    pub entry_id: String,
    /// Entry title
    pub title: String,
    /// Why the write failed
    pub reason: String,
}

/// Outcome of a commit
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CommitReport {
    /// Successful writes, in plan order
    pub written: Vec<WrittenEntry>,
    /// Failed writes, in plan order
    pub failures: Vec<CommitFailure>,
    /// Timezone the events were written in
    pub timezone: String,
    /// Set when the calendar timezone could not be read
    pub timezone_caveat: Option<String>,
}

impl CommitReport {
    /// Number of writes attempted
    pub fn attempted(&self) -> usize {
        self.written.len() + self.failures.len()
    }

    /// Whether every attempted write succeeded
    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty()
    }

    /// User-facing summary of the outcome
    pub fn summary(&self) -> String {
        let attempted = self.attempted();
        if attempted == 0 {
            return "No events were selected to add to your calendar.".to_string();
        }
        if self.failures.is_empty() {
            return format!(
                "Successfully added {} event(s) to your calendar.",
                self.written.len()
            );
        }
        if self.written.is_empty() {
            let errors: Vec<String> = self
                .failures
                .iter()
                .map(|f| format!("{} ({})", f.title, f.reason))
                .collect();
            return format!("Failed to add any events. Errors: {}", errors.join(", "));
        }
        let failed: Vec<&str> = self.failures.iter().map(|f| f.title.as_str()).collect();
        format!(
            "Added {} of {} events. Failed to add: {}",
            self.written.len(),
            attempted,
            failed.join(", ")
        )
    }
}

/// Check an approval against the proposed entries
///
/// # Returns
/// * `Ok(())` - Selection is non-empty and every id was proposed
/// * `Err(OrchestratorError)` - Empty selection or unknown ids
pub fn validate_selection(
    approved: &BTreeSet<String>,
    proposed: &[ProposedEntry],
) -> Result<(), OrchestratorError> {
    if approved.is_empty() {
        return Err(OrchestratorError::EmptySelection);
    }
    let known: BTreeSet<&str> = proposed.iter().map(|e| e.id.as_str()).collect();
    let unknown: Vec<String> = approved
        .iter()
        .filter(|id| !known.contains(id.as_str()))
        .cloned()
        .collect();
    if !unknown.is_empty() {
        return Err(OrchestratorError::UnknownEntries(unknown));
    }
    Ok(())
}

/// Applies approved entries to the calendar
#[derive(Clone)]
pub struct CommitGate {
    calendar: Arc<dyn CalendarSource>,
}

impl CommitGate {
    /// Create a gate writing to `calendar`
    pub fn new(calendar: Arc<dyn CalendarSource>) -> Self {
        Self { calendar }
    }

    async fn resolve_timezone(&self) -> (String, Option<String>) {
        match self.calendar.timezone().await {
            Ok(tz) if !tz.trim().is_empty() => (tz, None),
            Ok(_) => (
                FALLBACK_TIMEZONE.to_string(),
                Some(format!(
                    "Calendar reported no timezone; events were written in {}",
                    FALLBACK_TIMEZONE
                )),
            ),
            Err(e) => {
                tracing::warn!(error = %e, "Could not read calendar timezone, using fallback");
                (
                    FALLBACK_TIMEZONE.to_string(),
                    Some(format!(
                        "Calendar timezone unavailable ({}); events were written in {}",
                        e, FALLBACK_TIMEZONE
                    )),
                )
            }
        }
    }

    /// Write the approved entries
    ///
    /// The selection is validated before any write; an invalid selection
    /// writes nothing.
    ///
    /// # Arguments
    /// * `approved` - Entry ids the user selected
    /// * `proposed` - Entries offered to the user
    ///
    /// # Returns
    /// * `Ok(CommitReport)` - Per-entry outcome (possibly partial)
    /// * `Err(OrchestratorError)` - The selection was invalid
    pub async fn commit(
        &self,
        approved: &BTreeSet<String>,
        proposed: &[ProposedEntry],
    ) -> Result<CommitReport, OrchestratorError> {
        validate_selection(approved, proposed)?;

        let (timezone, timezone_caveat) = self.resolve_timezone().await;
        let mut report = CommitReport {
            timezone: timezone.clone(),
            timezone_caveat,
            ..Default::default()
        };

        for entry in proposed.iter().filter(|e| approved.contains(&e.id)) {
            let event = NewCalendarEvent {
                title: entry.title.clone(),
                start: entry.start,
                end: entry.end,
                description: entry.description.clone(),
                timezone: timezone.clone(),
            };

            match self.calendar.create_event(&event).await {
                Ok(event_id) => {
                    tracing::debug!(entry_id = %entry.id, event_id = %event_id, "Committed entry");
                    report.written.push(WrittenEntry {
                        entry_id: entry.id.clone(),
                        event_id,
                        title: entry.title.clone(),
                    });
                }
                Err(e) => {
                    tracing::warn!(entry_id = %entry.id, error = %e, "Failed to commit entry");
                    report.failures.push(CommitFailure {
                        entry_id: entry.id.clone(),
                        title: entry.title.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(title: &str) -> CommitFailure {
        CommitFailure {
            entry_id: "evt_2".to_string(),
            title: title.to_string(),
            reason: "HTTP 500".to_string(),
        }
    }

    fn written(title: &str) -> WrittenEntry {
        WrittenEntry {
            entry_id: "evt_1".to_string(),
            event_id: "abc".to_string(),
            title: title.to_string(),
        }
    }

    #[test]
    fn test_summary_forms() {
        let all = CommitReport {
            written: vec![written("Inbox"), written("Review")],
            ..Default::default()
        };
        assert_eq!(all.summary(), "Successfully added 2 event(s) to your calendar.");

        let partial = CommitReport {
            written: vec![written("Inbox")],
            failures: vec![failure("Review")],
            ..Default::default()
        };
        assert_eq!(partial.summary(), "Added 1 of 2 events. Failed to add: Review");

        let none = CommitReport {
            failures: vec![failure("Review")],
            ..Default::default()
        };
        assert_eq!(
            none.summary(),
            "Failed to add any events. Errors: Review (HTTP 500)"
        );
    }

    #[test]
    fn test_validate_selection_rejects_empty_and_unknown() {
        let proposed: Vec<ProposedEntry> = Vec::new();
        assert_eq!(
            validate_selection(&BTreeSet::new(), &proposed),
            Err(OrchestratorError::EmptySelection)
        );

        let approved: BTreeSet<String> = ["evt_9".to_string()].into_iter().collect();
        assert_eq!(
            validate_selection(&approved, &proposed),
            Err(OrchestratorError::UnknownEntries(vec!["evt_9".to_string()]))
        );
    }
}
