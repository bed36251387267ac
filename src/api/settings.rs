//! Planner settings handlers

use crate::error::AppError;
use crate::orchestrator::config::validate_and_apply_config_update;
use crate::orchestrator::{ConfigUpdateRequest, PlannerConfig};
use crate::state::AppState;
use axum::{extract::State, response::Json};
use std::sync::Arc;
use tokio::sync::RwLock;

// GET /api/config - Current planner configuration
pub async fn get_config(
    State(state): State<Arc<RwLock<AppState>>>,
) -> Result<Json<PlannerConfig>, AppError> {
    let state = state.read().await;
    Ok(Json(state.planner_config().clone()))
}

// POST /api/config - Apply a partial update; running sessions keep their snapshot
pub async fn update_config(
    State(state): State<Arc<RwLock<AppState>>>,
    Json(request): Json<ConfigUpdateRequest>,
) -> Result<Json<PlannerConfig>, AppError> {
    let mut state = state.write().await;
    let updated = validate_and_apply_config_update(state.planner_config().clone(), request)?;
    state.set_planner_config(updated.clone());

    tracing::info!(
        confidence_threshold = updated.confidence_threshold,
        max_clarifications = updated.max_clarifications,
        gemini_model = %updated.gemini_model,
        "Planner configuration updated"
    );
    Ok(Json(updated))
}
