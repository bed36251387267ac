//! Session state
//!
//! The single record threaded through every step of a planning session.
//! Only the state machine mutates it; handlers read snapshots.

use crate::orchestrator::commit::CommitReport;
use crate::orchestrator::materializer::ProposedEntry;
use crate::orchestrator::plan_types::ScheduleBlock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// State machine phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    /// Fetching calendar and task context
    Gathering,
    /// Asking the oracle how confident it is
    Assessing,
    /// Waiting for the user to answer a clarification question
    Clarifying,
    /// Asking the oracle for a schedule
    Planning,
    /// Waiting for the user to pick entries to commit
    AwaitingApproval,
    /// Writing approved entries to the calendar
    Committing,
    /// Finished
    Done,
    /// Stopped on an unrecoverable error
    Failed,
}

impl Phase {
    /// Whether no further transitions are possible
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Done | Phase::Failed)
    }

    /// Wire name of the phase
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Gathering => "GATHERING",
            Phase::Assessing => "ASSESSING",
            Phase::Clarifying => "CLARIFYING",
            Phase::Planning => "PLANNING",
            Phase::AwaitingApproval => "AWAITING_APPROVAL",
            Phase::Committing => "COMMITTING",
            Phase::Done => "DONE",
            Phase::Failed => "FAILED",
        }
    }

    /// Parse a wire name back into a phase
    pub fn parse(s: &str) -> Option<Self> {
        [
            Phase::Gathering,
            Phase::Assessing,
            Phase::Clarifying,
            Phase::Planning,
            Phase::AwaitingApproval,
            Phase::Committing,
            Phase::Done,
            Phase::Failed,
        ]
        .into_iter()
        .find(|p| p.as_str() == s)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who said a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    /// The person planning their day
    User,
    /// The planner
    Assistant,
}

/// One conversation turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// Speaker
    pub role: TurnRole,
    /// What was said
    pub content: String,
}

/// Mutable record for one planning session
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionState {
    /// Append-only conversation history
    pub conversation: Vec<Turn>,
    /// Past calendar events
    pub momentum_summary: String,
    /// Upcoming calendar events
    pub constraint_summary: String,
    /// Urgent and backlog tasks
    pub task_summary: String,
    /// Current planning goal, amended by clarification answers
    pub user_intent: String,
    /// Latest oracle reasoning
    pub analysis: String,
    /// Latest assessed confidence in [0, 1]
    pub confidence: f64,
    /// What blocks full confidence; empty once resolved
    pub missing_info: String,
    /// Generated schedule; non-empty only after routing to planning
    pub plan: Vec<ScheduleBlock>,
    /// Overall scheduling rationale
    pub plan_metadata: String,
    /// Calendar entry candidates derived from `plan`
    pub proposed_entries: Vec<ProposedEntry>,
    /// Entries the user selected for commit
    pub approved_entry_ids: BTreeSet<String>,
    /// Aggregate/assess passes executed
    pub cycle_count: u32,
    /// Clarification round-trips executed
    pub clarification_count: u32,
    /// Question awaiting an answer while clarifying
    pub pending_question: Option<String>,
    /// Planning was forced by the clarification limit below the threshold
    pub low_confidence: bool,
    /// Unparsed text of the latest assessment
    pub raw_assessment: String,
    /// Degradations the user should know about
    pub caveats: Vec<String>,
    /// Outcome of the calendar commit
    pub commit_report: Option<CommitReport>,
    /// Reason the session failed
    pub failure: Option<String>,
    /// Malformed assessments in a row
    pub consecutive_malformed: u32,
}

impl SessionState {
    /// Fresh state for a planning request
    pub fn new(user_intent: impl Into<String>) -> Self {
        let user_intent = user_intent.into();
        Self {
            conversation: vec![Turn {
                role: TurnRole::User,
                content: user_intent.clone(),
            }],
            user_intent,
            ..Default::default()
        }
    }

    /// Append a conversation turn
    pub fn push_turn(&mut self, role: TurnRole, content: impl Into<String>) {
        self.conversation.push(Turn {
            role,
            content: content.into(),
        });
    }

    /// Record a caveat once
    pub fn add_caveat(&mut self, caveat: impl Into<String>) {
        let caveat = caveat.into();
        if !self.caveats.contains(&caveat) {
            self.caveats.push(caveat);
        }
    }

    /// Conversation rendered for oracle prompts
    pub fn transcript(&self) -> String {
        if self.conversation.is_empty() {
            return "(No previous conversation)".to_string();
        }
        self.conversation
            .iter()
            .map(|turn| {
                let speaker = match turn.role {
                    TurnRole::User => "User",
                    TurnRole::Assistant => "Assistant",
                };
                format!("{}: {}", speaker, turn.content)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_records_intent_as_first_turn() {
        let state = SessionState::new("plan tomorrow");
        assert_eq!(state.user_intent, "plan tomorrow");
        assert_eq!(state.conversation.len(), 1);
        assert_eq!(state.transcript(), "User: plan tomorrow");
        assert_eq!(state.cycle_count, 0);
        assert!(state.plan.is_empty());
    }

    #[test]
    fn test_caveats_are_deduplicated() {
        let mut state = SessionState::default();
        state.add_caveat("Calendar unavailable");
        state.add_caveat("Calendar unavailable");
        assert_eq!(state.caveats.len(), 1);
    }

    #[test]
    fn test_phase_wire_names_round_trip() {
        assert_eq!(Phase::AwaitingApproval.as_str(), "AWAITING_APPROVAL");
        assert_eq!(Phase::parse("AWAITING_APPROVAL"), Some(Phase::AwaitingApproval));
        assert_eq!(Phase::parse("nope"), None);
        assert_eq!(
            serde_json::to_string(&Phase::AwaitingApproval).unwrap(),
            "\"AWAITING_APPROVAL\""
        );
        assert!(Phase::Failed.is_terminal());
        assert!(!Phase::Clarifying.is_terminal());
    }
}
