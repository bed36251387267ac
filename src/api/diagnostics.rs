//! Source diagnostics
//!
//! Probes the calendar and task sources the way a planning session would and
//! reports what works. Shared by `GET /api/diagnostics` and the `diagnose`
//! binary.

use crate::error::AppError;
use crate::orchestrator::{ContextAggregator, PlannerConfig};
use crate::state::AppState;
use axum::{extract::State, response::Json};
use chrono::{Duration, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Outcome of one probe
#[derive(Debug, Clone, Serialize)]
pub struct ProbeResult {
    /// Whether the probe succeeded
    pub ok: bool,
    /// What was found, or why it failed
    pub detail: String,
}

impl ProbeResult {
    fn pass(detail: impl Into<String>) -> Self {
        Self {
            ok: true,
            detail: detail.into(),
        }
    }

    fn fail(detail: impl Into<String>) -> Self {
        Self {
            ok: false,
            detail: detail.into(),
        }
    }
}

/// Results of probing both data sources
#[derive(Debug, Clone, Serialize)]
pub struct SourceProbes {
    /// Calendar timezone lookup
    pub calendar_timezone: ProbeResult,
    /// Calendar events in the configured window
    pub calendar_events: ProbeResult,
    /// Task listing
    pub tasks: ProbeResult,
}

impl SourceProbes {
    /// Whether every probe passed
    pub fn all_ok(&self) -> bool {
        self.calendar_timezone.ok && self.calendar_events.ok && self.tasks.ok
    }
}

/// Probe the calendar and task sources behind `aggregator`
pub async fn probe_sources(aggregator: &ContextAggregator, config: &PlannerConfig) -> SourceProbes {
    let now = Utc::now();
    let window_start = now - Duration::days(i64::from(config.lookback_days));
    let window_end = now + Duration::days(i64::from(config.lookahead_days));

    let (timezone, events, tasks) = tokio::join!(
        aggregator.calendar().timezone(),
        aggregator.calendar().list_events(window_start, window_end),
        aggregator.tasks().list_tasks(),
    );

    SourceProbes {
        calendar_timezone: match timezone {
            Ok(tz) if tz.parse::<Tz>().is_ok() => ProbeResult::pass(tz),
            Ok(tz) => ProbeResult::fail(format!("'{}' is not a recognized timezone", tz)),
            Err(e) => ProbeResult::fail(e.to_string()),
        },
        calendar_events: match events {
            Ok(events) => {
                let past = events.iter().filter(|e| e.start < now).count();
                ProbeResult::pass(format!(
                    "{} event(s) in window ({} past, {} upcoming)",
                    events.len(),
                    past,
                    events.len() - past
                ))
            }
            Err(e) => ProbeResult::fail(e.to_string()),
        },
        tasks: match tasks {
            Ok(tasks) => {
                let dated = tasks.iter().filter(|t| t.due.is_some()).count();
                ProbeResult::pass(format!(
                    "{} task(s) ({} with a due date)",
                    tasks.len(),
                    dated
                ))
            }
            Err(e) => ProbeResult::fail(e.to_string()),
        },
    }
}

/// Oracle configuration as seen by new sessions
#[derive(Debug, Serialize)]
pub struct OracleStatus {
    /// Model new sessions will use
    pub model: String,
    /// Per-attempt timeout in seconds
    pub timeout_secs: u64,
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Whether an API key is configured (absent for non-Gemini oracles)
    pub api_key_configured: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct DiagnosticsResponse {
    pub sources: SourceProbes,
    pub oracle: OracleStatus,
    pub healthy: bool,
}

// GET /api/diagnostics - Probe data sources and report oracle settings
pub async fn diagnostics(
    State(state): State<Arc<RwLock<AppState>>>,
) -> Result<Json<DiagnosticsResponse>, AppError> {
    let (aggregator, config, api_key_configured) = {
        let state = state.read().await;
        (
            state.orchestrator().aggregator().clone(),
            state.planner_config().clone(),
            state.gemini_key_configured(),
        )
    };

    let sources = probe_sources(&aggregator, &config).await;
    if !sources.all_ok() {
        tracing::warn!(?sources, "Diagnostics found degraded sources");
    }

    Ok(Json(DiagnosticsResponse {
        healthy: sources.all_ok() && api_key_configured != Some(false),
        sources,
        oracle: OracleStatus {
            model: config.gemini_model,
            timeout_secs: config.oracle_timeout_secs,
            max_retries: config.oracle_max_retries,
            api_key_configured,
        },
    }))
}
