//! API utility functions
//!
//! Contains helper functions used by API handlers for validation, session
//! lookup and persistence.

use crate::error::AppError;
use crate::orchestrator::PlanningSession;
use crate::state::{AppState, SessionDb, SessionHandle};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Validate free text supplied by the user (an intent or an answer)
///
/// # Arguments
/// * `field` - Field name used in the error message
/// * `text` - Text to validate
/// * `max_length` - Maximum length in characters
///
/// # Returns
/// * `Ok(())` - Text is valid
/// * `Err(AppError)` - Text is empty or too long
pub fn validate_text(field: &str, text: &str, max_length: usize) -> Result<(), AppError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidRequest(format!("{} cannot be empty", field)));
    }
    if trimmed.chars().count() > max_length {
        return Err(AppError::InvalidRequest(format!(
            "{} exceeds maximum length of {} characters",
            field, max_length
        )));
    }
    Ok(())
}

/// Look up a session handle without holding the registry lock afterwards
///
/// # Returns
/// * `Ok(SessionHandle)` - Handle to the session
/// * `Err(AppError::SessionNotFound)` - No such session
pub async fn find_session(
    state: &Arc<RwLock<AppState>>,
    id: &str,
) -> Result<SessionHandle, AppError> {
    state
        .read()
        .await
        .session(id)
        .ok_or_else(|| AppError::SessionNotFound(id.to_string()))
}

/// Write a session snapshot if persistence is enabled
///
/// A failed write is logged and does not fail the request: the in-memory
/// session has already moved on.
pub async fn persist_session(db: Option<&SessionDb>, session: &PlanningSession) {
    if let Some(db) = db {
        if let Err(e) = db.save(session).await {
            tracing::error!(session_id = %session.id, error = %e, "Failed to persist session");
        }
    }
}
