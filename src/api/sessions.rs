//! Planning session handlers
//!
//! Create a session from an intent, answer clarification questions, approve
//! or decline proposed calendar entries, and read reports. Each operation runs
//! the state machine until it next needs the user, then returns the session.

use crate::api::utils::{find_session, persist_session, validate_text};
use crate::error::AppError;
use crate::orchestrator::report::{render_final_report, render_schedule};
use crate::orchestrator::{
    CommitReport, Phase, PlanningSession, ProposedEntry, ScheduleBlock, Turn,
};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::RwLock;

// Request types
#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub intent: String,
}

#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    pub answer: String,
}

#[derive(Debug, Deserialize)]
pub struct ApproveRequest {
    pub entry_ids: Vec<String>,
}

// Response types
#[derive(Debug, Serialize)]
pub struct SessionView {
    pub id: String,
    pub phase: Phase,
    pub user_intent: String,
    pub pending_question: Option<String>,
    pub analysis: String,
    pub confidence: f64,
    pub missing_info: String,
    pub low_confidence: bool,
    pub clarification_count: u32,
    pub cycle_count: u32,
    pub plan: Vec<ScheduleBlock>,
    pub plan_metadata: String,
    pub proposed_entries: Vec<ProposedEntry>,
    pub caveats: Vec<String>,
    pub commit_report: Option<CommitReport>,
    pub failure: Option<String>,
    pub conversation: Vec<Turn>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&PlanningSession> for SessionView {
    fn from(session: &PlanningSession) -> Self {
        let state = &session.state;
        Self {
            id: session.id.clone(),
            phase: session.phase,
            user_intent: state.user_intent.clone(),
            pending_question: state.pending_question.clone(),
            analysis: state.analysis.clone(),
            confidence: state.confidence,
            missing_info: state.missing_info.clone(),
            low_confidence: state.low_confidence,
            clarification_count: state.clarification_count,
            cycle_count: state.cycle_count,
            plan: state.plan.clone(),
            plan_metadata: state.plan_metadata.clone(),
            proposed_entries: state.proposed_entries.clone(),
            caveats: state.caveats.clone(),
            commit_report: state.commit_report.clone(),
            failure: state.failure.clone(),
            conversation: state.conversation.clone(),
            created_at: session.created_at,
            updated_at: session.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionSummary {
    pub id: String,
    pub phase: Phase,
    pub intent: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&PlanningSession> for SessionSummary {
    fn from(session: &PlanningSession) -> Self {
        Self {
            id: session.id.clone(),
            phase: session.phase,
            intent: session
                .state
                .user_intent
                .lines()
                .next()
                .unwrap_or_default()
                .to_string(),
            created_at: session.created_at,
            updated_at: session.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionsListResponse {
    pub sessions: Vec<SessionSummary>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
    pub status: String,
}

// POST /api/sessions - Start a planning session
pub async fn create_session(
    State(state): State<Arc<RwLock<AppState>>>,
    Json(request): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<SessionView>), AppError> {
    let (orchestrator, config, db) = {
        let state = state.read().await;
        (
            state.orchestrator().clone(),
            state.planner_config().clone(),
            state.db().cloned(),
        )
    };
    validate_text("Intent", &request.intent, config.max_intent_length)?;

    let session = orchestrator.start(&request.intent, config).await;
    persist_session(db.as_ref(), &session).await;

    let view = SessionView::from(&session);
    state.write().await.insert_session(session);

    tracing::info!(session_id = %view.id, phase = %view.phase, "Session created");
    Ok((StatusCode::CREATED, Json(view)))
}

// GET /api/sessions - List sessions, newest first
pub async fn list_sessions(
    State(state): State<Arc<RwLock<AppState>>>,
) -> Result<Json<SessionsListResponse>, AppError> {
    let handles: Vec<_> = state.read().await.sessions.values().cloned().collect();

    let mut sessions = Vec::with_capacity(handles.len());
    for handle in handles {
        sessions.push(SessionSummary::from(&*handle.lock().await));
    }
    sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    Ok(Json(SessionsListResponse {
        count: sessions.len(),
        sessions,
    }))
}

// GET /api/sessions/:id - Full session view
pub async fn get_session(
    State(state): State<Arc<RwLock<AppState>>>,
    Path(id): Path<String>,
) -> Result<Json<SessionView>, AppError> {
    let handle = find_session(&state, &id).await?;
    let session = handle.lock().await;
    Ok(Json(SessionView::from(&*session)))
}

// POST /api/sessions/:id/answer - Answer the pending clarification question
pub async fn answer_session(
    State(state): State<Arc<RwLock<AppState>>>,
    Path(id): Path<String>,
    Json(request): Json<AnswerRequest>,
) -> Result<Json<SessionView>, AppError> {
    let handle = find_session(&state, &id).await?;
    let (orchestrator, db) = {
        let state = state.read().await;
        (state.orchestrator().clone(), state.db().cloned())
    };

    let mut session = handle.lock().await;
    validate_text("Answer", &request.answer, session.config.max_intent_length)?;
    orchestrator.answer(&mut session, &request.answer).await?;
    persist_session(db.as_ref(), &session).await;

    Ok(Json(SessionView::from(&*session)))
}

// POST /api/sessions/:id/approve - Commit the selected entries
pub async fn approve_session(
    State(state): State<Arc<RwLock<AppState>>>,
    Path(id): Path<String>,
    Json(request): Json<ApproveRequest>,
) -> Result<Json<SessionView>, AppError> {
    let handle = find_session(&state, &id).await?;
    let (orchestrator, db) = {
        let state = state.read().await;
        (state.orchestrator().clone(), state.db().cloned())
    };

    let entry_ids: BTreeSet<String> = request
        .entry_ids
        .into_iter()
        .map(|id| id.trim().to_string())
        .collect();

    let mut session = handle.lock().await;
    orchestrator.approve(&mut session, entry_ids).await?;
    persist_session(db.as_ref(), &session).await;

    Ok(Json(SessionView::from(&*session)))
}

// POST /api/sessions/:id/decline - Finish without committing
pub async fn decline_session(
    State(state): State<Arc<RwLock<AppState>>>,
    Path(id): Path<String>,
) -> Result<Json<SessionView>, AppError> {
    let handle = find_session(&state, &id).await?;
    let (orchestrator, db) = {
        let state = state.read().await;
        (state.orchestrator().clone(), state.db().cloned())
    };

    let mut session = handle.lock().await;
    orchestrator.decline(&mut session).await?;
    persist_session(db.as_ref(), &session).await;

    Ok(Json(SessionView::from(&*session)))
}

// GET /api/sessions/:id/report - Markdown schedule or final report
pub async fn session_report(
    State(state): State<Arc<RwLock<AppState>>>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let handle = find_session(&state, &id).await?;
    let session = handle.lock().await;

    let markdown = if session.phase.is_terminal() {
        render_final_report(&session)
    } else {
        render_schedule(&session)
    };

    Ok((
        [(header::CONTENT_TYPE, "text/markdown; charset=utf-8")],
        markdown,
    )
        .into_response())
}

// DELETE /api/sessions/:id - Forget a session
pub async fn delete_session(
    State(state): State<Arc<RwLock<AppState>>>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    let db = {
        let mut state = state.write().await;
        state
            .remove_session(&id)
            .ok_or_else(|| AppError::SessionNotFound(id.clone()))?;
        state.db().cloned()
    };

    if let Some(db) = db {
        db.delete(&id).await?;
    }

    tracing::info!(session_id = %id, "Session deleted");
    Ok(Json(MessageResponse {
        message: format!("Session {} deleted", id),
        status: "ok".to_string(),
    }))
}
