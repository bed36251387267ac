//! Planning state machine
//!
//! Drives a [`PlanningSession`] through
//! `GATHERING → ASSESSING → (CLARIFYING ↺ ASSESSING) → PLANNING →
//! AWAITING_APPROVAL → COMMITTING → DONE`, with `FAILED` reachable from any
//! non-terminal phase.
//!
//! The machine is suspend/resume. [`Orchestrator::start`] runs until the
//! session needs the user (a pending clarification question, or approval of
//! proposed entries) or reaches a terminal phase. [`Orchestrator::answer`],
//! [`Orchestrator::approve`] and [`Orchestrator::decline`] resume it. Every
//! phase change goes through [`transition`], and each resumption is capped at
//! [`MAX_STEPS_PER_ADVANCE`] steps, so a misbehaving oracle cannot keep the
//! loop running.

use crate::orchestrator::commit::{validate_selection, CommitGate};
use crate::orchestrator::config::PlannerConfig;
use crate::orchestrator::constants::{MAX_CONSECUTIVE_MALFORMED, MAX_STEPS_PER_ADVANCE};
use crate::orchestrator::context::ContextAggregator;
use crate::orchestrator::error::OrchestratorError;
use crate::orchestrator::materializer::materialize;
use crate::orchestrator::oracle::{OracleContext, OracleError, ReasoningOracle};
use crate::orchestrator::state::{Phase, SessionState, TurnRole};
use crate::orchestrator::utils::{hash_intent, hash_plan};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Something that happened in the current phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Context aggregation finished (possibly degraded)
    ContextGathered,
    /// Confidence reached the threshold
    Confident,
    /// Confidence below threshold with clarifications left
    NeedsClarification,
    /// No clarifications left; planning proceeds on the latest assessment
    ClarificationLimitReached,
    /// Assessment output was unusable too many times in a row
    AssessmentFailed,
    /// The user answered the pending question
    Answered,
    /// A plan was produced and materialized
    PlanReady,
    /// The plan could not be produced
    PlanFailed,
    /// The user approved a non-empty selection
    Approved,
    /// The user declined to commit
    Declined,
    /// Approved entries were written (fully or partially)
    Committed,
    /// The reasoning service could not be reached
    OracleUnavailable,
    /// Any other unrecoverable error
    Aborted,
}

/// Transition table
///
/// # Returns
/// * `Some(Phase)` - Next phase
/// * `None` - The event is not valid in `phase`
pub fn transition(phase: Phase, event: Event) -> Option<Phase> {
    use Event::*;
    use Phase::*;

    match (phase, event) {
        (Gathering, ContextGathered) => Some(Assessing),
        (Assessing, Confident) | (Assessing, ClarificationLimitReached) => Some(Planning),
        (Assessing, NeedsClarification) => Some(Clarifying),
        (Assessing, AssessmentFailed) => Some(Failed),
        (Clarifying, Answered) => Some(Assessing),
        (Clarifying, ClarificationLimitReached) => Some(Planning),
        (Planning, PlanReady) => Some(AwaitingApproval),
        (Planning, PlanFailed) => Some(Failed),
        (AwaitingApproval, Approved) => Some(Committing),
        (AwaitingApproval, Declined) => Some(Done),
        (Committing, Committed) => Some(Done),
        (p, OracleUnavailable) | (p, Aborted) if !p.is_terminal() => Some(Failed),
        _ => None,
    }
}

/// Routing decision after an assessment
///
/// Confidence equal to the threshold proceeds to planning.
pub fn route(
    confidence: f64,
    threshold: f64,
    clarification_count: u32,
    max_clarifications: u32,
) -> Event {
    if confidence >= threshold {
        Event::Confident
    } else if clarification_count >= max_clarifications {
        Event::ClarificationLimitReached
    } else {
        Event::NeedsClarification
    }
}

/// One planning session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanningSession {
    /// Session id
    pub id: String,
    /// Current phase
    pub phase: Phase,
    /// Accumulated state
    pub state: SessionState,
    /// Configuration snapshot taken at creation
    pub config: PlannerConfig,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

impl PlanningSession {
    /// New session in `GATHERING`
    pub fn new(intent: impl Into<String>, config: PlannerConfig) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            phase: Phase::Gathering,
            state: SessionState::new(intent),
            config,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the session cannot progress without user input
    pub fn is_suspended(&self) -> bool {
        match self.phase {
            Phase::Clarifying => self.state.pending_question.is_some(),
            Phase::AwaitingApproval => true,
            p => p.is_terminal(),
        }
    }

    fn require_phase(&self, expected: Phase, operation: &'static str) -> Result<(), OrchestratorError> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(OrchestratorError::InvalidPhase {
                operation,
                phase: self.phase,
            })
        }
    }

    fn apply(&mut self, event: Event) {
        match transition(self.phase, event) {
            Some(next) => {
                tracing::debug!(
                    session_id = %self.id,
                    from = %self.phase,
                    to = %next,
                    event = ?event,
                    "Phase transition"
                );
                self.phase = next;
            }
            None => {
                let reason = format!("invalid transition: {:?} in {}", event, self.phase);
                tracing::error!(session_id = %self.id, %reason, "Rejected transition");
                self.fail(reason);
            }
        }
        self.updated_at = Utc::now();
    }

    /// Record that planning proceeds below the confidence threshold
    fn force_planning(&mut self) {
        self.state.low_confidence = true;
        let caveat = format!(
            "Plan built after {} clarification(s) with confidence {:.2}, below the {:.2} threshold",
            self.state.clarification_count, self.state.confidence, self.config.confidence_threshold
        );
        self.state.add_caveat(caveat);
    }

    fn fail_on(&mut self, event: Event, reason: String) {
        if transition(self.phase, event) != Some(Phase::Failed) {
            tracing::error!(
                session_id = %self.id,
                phase = %self.phase,
                event = ?event,
                "Failure event not in transition table"
            );
        }
        self.fail(reason);
    }

    fn fail(&mut self, reason: String) {
        tracing::error!(
            session_id = %self.id,
            phase = %self.phase,
            reason = %reason,
            "Planning session failed"
        );
        self.state
            .push_turn(TurnRole::Assistant, format!("Planning failed: {}", reason));
        self.state.failure = Some(reason);
        self.phase = Phase::Failed;
        self.updated_at = Utc::now();
    }
}

fn fallback_question(missing_info: &str) -> String {
    let detail = missing_info.trim().trim_end_matches(['.', '?', '!']);
    if detail.is_empty() {
        "Could you share more detail about what you want to plan, such as timing, duration or energy level?".to_string()
    } else {
        format!("Could you tell me more about this: {}?", detail)
    }
}

/// Drives planning sessions
#[derive(Clone)]
pub struct Orchestrator {
    oracle: Arc<dyn ReasoningOracle>,
    aggregator: ContextAggregator,
    commit_gate: CommitGate,
}

impl Orchestrator {
    /// Create an orchestrator; commits go to the aggregator's calendar
    pub fn new(oracle: Arc<dyn ReasoningOracle>, aggregator: ContextAggregator) -> Self {
        let commit_gate = CommitGate::new(aggregator.calendar().clone());
        Self {
            oracle,
            aggregator,
            commit_gate,
        }
    }

    /// Context aggregator used by this orchestrator
    pub fn aggregator(&self) -> &ContextAggregator {
        &self.aggregator
    }

    /// Create a session for `intent` and run it until it needs the user
    pub async fn start(&self, intent: &str, config: PlannerConfig) -> PlanningSession {
        let mut session = PlanningSession::new(intent.trim(), config);
        tracing::info!(
            session_id = %session.id,
            intent_hash = %hash_intent(&session.state.user_intent),
            "Planning session started"
        );
        self.advance(&mut session).await;
        session
    }

    /// Answer the pending clarification question and resume
    ///
    /// The answer that uses up the last clarification goes straight to
    /// planning on the latest assessment instead of being assessed again.
    ///
    /// # Errors
    /// * `OrchestratorError::InvalidPhase` - No question is pending
    pub async fn answer(
        &self,
        session: &mut PlanningSession,
        answer: &str,
    ) -> Result<(), OrchestratorError> {
        session.require_phase(Phase::Clarifying, "answer")?;
        if session.state.pending_question.is_none() {
            return Err(OrchestratorError::InvalidPhase {
                operation: "answer",
                phase: session.phase,
            });
        }

        let answer = answer.trim();
        let state = &mut session.state;
        state.push_turn(TurnRole::User, answer);
        state.user_intent = format!("{}\nAdditional detail: {}", state.user_intent, answer);
        state.pending_question = None;
        state.clarification_count += 1;

        tracing::info!(
            session_id = %session.id,
            clarification_count = state.clarification_count,
            intent_hash = %hash_intent(&state.user_intent),
            "Clarification answered"
        );

        if session.state.clarification_count >= session.config.max_clarifications {
            tracing::info!(
                session_id = %session.id,
                confidence = session.state.confidence,
                max_clarifications = session.config.max_clarifications,
                "Clarification limit reached, planning on latest assessment"
            );
            session.force_planning();
            session.apply(Event::ClarificationLimitReached);
        } else {
            session.apply(Event::Answered);
        }
        self.advance(session).await;
        Ok(())
    }

    /// Approve proposed entries and commit them
    ///
    /// The selection is validated before anything is written; a rejected
    /// selection leaves the session unchanged.
    ///
    /// # Errors
    /// * `OrchestratorError::InvalidPhase` - Nothing is awaiting approval
    /// * `OrchestratorError::EmptySelection` - `entry_ids` is empty
    /// * `OrchestratorError::UnknownEntries` - Some ids were never proposed
    pub async fn approve(
        &self,
        session: &mut PlanningSession,
        entry_ids: BTreeSet<String>,
    ) -> Result<(), OrchestratorError> {
        session.require_phase(Phase::AwaitingApproval, "approve")?;
        validate_selection(&entry_ids, &session.state.proposed_entries)?;

        let listed: Vec<&str> = entry_ids.iter().map(String::as_str).collect();
        session
            .state
            .push_turn(TurnRole::User, format!("Approved: {}", listed.join(", ")));
        session.state.approved_entry_ids = entry_ids;

        session.apply(Event::Approved);
        self.advance(session).await;
        Ok(())
    }

    /// Finish without committing anything
    ///
    /// # Errors
    /// * `OrchestratorError::InvalidPhase` - Nothing is awaiting approval
    pub async fn decline(&self, session: &mut PlanningSession) -> Result<(), OrchestratorError> {
        session.require_phase(Phase::AwaitingApproval, "decline")?;
        session.state.push_turn(TurnRole::User, "Declined to add events");
        session
            .state
            .push_turn(TurnRole::Assistant, "No events were added to your calendar.");
        session.apply(Event::Declined);
        tracing::info!(session_id = %session.id, "Commit declined");
        Ok(())
    }

    /// Run steps until the session is suspended or terminal
    pub async fn advance(&self, session: &mut PlanningSession) {
        for _ in 0..MAX_STEPS_PER_ADVANCE {
            if session.is_suspended() {
                return;
            }
            self.step(session).await;
        }
        if !session.is_suspended() {
            session.fail(format!(
                "exceeded {} steps without reaching a stable phase",
                MAX_STEPS_PER_ADVANCE
            ));
        }
    }

    async fn step(&self, session: &mut PlanningSession) {
        match session.phase {
            Phase::Gathering => self.gather(session).await,
            Phase::Assessing => self.assess(session).await,
            Phase::Clarifying => self.clarify(session).await,
            Phase::Planning => self.plan(session).await,
            Phase::Committing => self.commit(session).await,
            Phase::AwaitingApproval | Phase::Done | Phase::Failed => {}
        }
    }

    async fn gather(&self, session: &mut PlanningSession) {
        let snapshot = self
            .aggregator
            .gather(session.config.lookback_days, session.config.lookahead_days)
            .await;

        let state = &mut session.state;
        state.momentum_summary = snapshot.momentum_summary;
        state.constraint_summary = snapshot.constraint_summary;
        state.task_summary = snapshot.task_summary;
        for caveat in snapshot.caveats {
            state.add_caveat(caveat);
        }

        tracing::debug!(
            session_id = %session.id,
            degraded_sources = session.state.caveats.len(),
            "Context gathered"
        );
        session.apply(Event::ContextGathered);
    }

    async fn assess(&self, session: &mut PlanningSession) {
        session.state.cycle_count += 1;
        let ctx = OracleContext::from_state(&session.state);

        match self.oracle.assess(&ctx).await {
            Ok(assessment) => {
                let state = &mut session.state;
                state.consecutive_malformed = 0;
                state.confidence = assessment.confidence;
                state.analysis = assessment.analysis;
                state.missing_info = assessment.missing_info;
                state.raw_assessment = assessment.raw;
            }
            Err(OracleError::Malformed(message)) => {
                session.state.consecutive_malformed += 1;
                session.state.raw_assessment = message.clone();
                if session.state.consecutive_malformed >= MAX_CONSECUTIVE_MALFORMED {
                    session.fail_on(
                        Event::AssessmentFailed,
                        format!(
                            "assessment output was unreadable {} times in a row: {}",
                            MAX_CONSECUTIVE_MALFORMED, message
                        ),
                    );
                    return;
                }
                tracing::warn!(
                    session_id = %session.id,
                    error = %message,
                    "Malformed assessment, treating confidence as 0"
                );
                let state = &mut session.state;
                state.confidence = 0.0;
                state.analysis.clear();
                state.missing_info = "The assessment could not be read. What do you want to plan, and are there time or energy constraints?".to_string();
                state.add_caveat("An assessment could not be read and was treated as zero confidence");
            }
            Err(e @ OracleError::Unavailable { .. }) => {
                session.fail_on(Event::OracleUnavailable, e.to_string());
                return;
            }
        }

        let event = route(
            session.state.confidence,
            session.config.confidence_threshold,
            session.state.clarification_count,
            session.config.max_clarifications,
        );

        tracing::info!(
            session_id = %session.id,
            confidence = session.state.confidence,
            threshold = session.config.confidence_threshold,
            clarification_count = session.state.clarification_count,
            cycle_count = session.state.cycle_count,
            decision = ?event,
            "Assessment routed"
        );

        match event {
            Event::Confident => session.state.low_confidence = false,
            Event::ClarificationLimitReached => session.force_planning(),
            _ => session.state.pending_question = None,
        }
        session.apply(event);
    }

    async fn clarify(&self, session: &mut PlanningSession) {
        let ctx = OracleContext::from_state(&session.state);
        let missing_info = session.state.missing_info.clone();

        let question = match self.oracle.clarify(&missing_info, &ctx).await {
            Ok(question) => question,
            Err(OracleError::Malformed(message)) => {
                tracing::warn!(
                    session_id = %session.id,
                    error = %message,
                    "Malformed clarification, using fallback question"
                );
                fallback_question(&missing_info)
            }
            Err(e @ OracleError::Unavailable { .. }) => {
                session.fail_on(Event::OracleUnavailable, e.to_string());
                return;
            }
        };

        tracing::info!(
            session_id = %session.id,
            clarification_count = session.state.clarification_count,
            "Clarification question pending"
        );
        session.state.push_turn(TurnRole::Assistant, question.clone());
        session.state.pending_question = Some(question);
        session.updated_at = Utc::now();
    }

    async fn plan(&self, session: &mut PlanningSession) {
        let ctx = OracleContext::from_state(&session.state);
        let analysis = session.state.analysis.clone();

        let mut result = self.oracle.plan(&ctx, &analysis).await;
        if let Err(OracleError::Malformed(message)) = &result {
            tracing::warn!(
                session_id = %session.id,
                error = %message,
                "Malformed plan, retrying once"
            );
            result = self.oracle.plan(&ctx, &analysis).await;
        }

        let draft = match result {
            Ok(draft) => draft,
            Err(e) => {
                let event = match e {
                    OracleError::Malformed(_) => Event::PlanFailed,
                    OracleError::Unavailable { .. } => Event::OracleUnavailable,
                };
                session.fail_on(event, e.to_string());
                return;
            }
        };

        let state = &mut session.state;
        state.plan = draft.blocks;
        state.plan_metadata = draft.metadata;
        state.proposed_entries = materialize(&state.plan);
        if !state.low_confidence {
            state.missing_info.clear();
        }
        state.push_turn(
            TurnRole::Assistant,
            format!(
                "Proposed a schedule with {} block(s) and {} calendar entr{}.",
                state.plan.len(),
                state.proposed_entries.len(),
                if state.proposed_entries.len() == 1 { "y" } else { "ies" }
            ),
        );

        tracing::info!(
            session_id = %session.id,
            plan_hash = %hash_plan(&session.state.plan),
            blocks = session.state.plan.len(),
            proposed = session.state.proposed_entries.len(),
            low_confidence = session.state.low_confidence,
            "Plan ready for approval"
        );
        session.apply(Event::PlanReady);
    }

    async fn commit(&self, session: &mut PlanningSession) {
        let result = self
            .commit_gate
            .commit(
                &session.state.approved_entry_ids,
                &session.state.proposed_entries,
            )
            .await;

        let report = match result {
            Ok(report) => report,
            Err(e) => {
                session.fail_on(Event::Aborted, e.to_string());
                return;
            }
        };

        let summary = report.summary();
        tracing::info!(
            session_id = %session.id,
            written = report.written.len(),
            failed = report.failures.len(),
            "Commit finished"
        );

        let state = &mut session.state;
        if let Some(caveat) = &report.timezone_caveat {
            state.add_caveat(caveat.clone());
        }
        if !report.all_succeeded() {
            state.add_caveat(summary.clone());
        }
        state.push_turn(TurnRole::Assistant, summary);
        state.commit_report = Some(report);

        // refresh so later sessions see the new events; a failed refresh only degrades
        let refreshed = self
            .aggregator
            .refresh_calendar(session.config.lookback_days, session.config.lookahead_days)
            .await;
        let state = &mut session.state;
        state.momentum_summary = refreshed.momentum_summary;
        state.constraint_summary = refreshed.constraint_summary;
        for caveat in refreshed.caveats {
            state.add_caveat(caveat);
        }

        session.apply(Event::Committed);
    }
}
