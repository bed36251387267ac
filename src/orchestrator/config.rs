//! Planner configuration
//!
//! Knobs for the planning state machine and the reasoning oracle. A session
//! snapshots this configuration when it is created, so updates only affect
//! sessions started afterwards.

use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::env;

/// Planner configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// Days of past calendar events used as momentum
    pub lookback_days: u32,
    /// Days of future calendar events used as constraints
    pub lookahead_days: u32,
    /// Minimum assessed confidence to proceed to planning
    pub confidence_threshold: f64,
    /// Clarification round-trips allowed before planning is forced
    pub max_clarifications: u32,
    /// Per-attempt timeout for oracle calls in seconds
    pub oracle_timeout_secs: u64,
    /// Retries after the first oracle attempt for transient failures
    pub oracle_max_retries: u32,
    /// Gemini model name
    pub gemini_model: String,
    /// Maximum intent or answer length in characters
    pub max_intent_length: usize,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            lookback_days: 3,
            lookahead_days: 7,
            confidence_threshold: 0.95,
            max_clarifications: 3,
            oracle_timeout_secs: 30,
            oracle_max_retries: 2,
            gemini_model: "gemini-2.5-flash".to_string(),
            max_intent_length: 10_000,
        }
    }
}

impl PlannerConfig {
    /// Load planner configuration from environment variables with defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            lookback_days: env_parse("PLANNER_LOOKBACK_DAYS").unwrap_or(defaults.lookback_days),
            lookahead_days: env_parse("PLANNER_LOOKAHEAD_DAYS")
                .unwrap_or(defaults.lookahead_days),
            confidence_threshold: env_parse("PLANNER_CONFIDENCE_THRESHOLD")
                .filter(|t: &f64| (0.0..=1.0).contains(t))
                .unwrap_or(defaults.confidence_threshold),
            max_clarifications: env_parse("PLANNER_MAX_CLARIFICATIONS")
                .unwrap_or(defaults.max_clarifications),
            oracle_timeout_secs: env_parse("ORACLE_TIMEOUT_SECS")
                .filter(|t| *t > 0)
                .unwrap_or(defaults.oracle_timeout_secs),
            oracle_max_retries: env_parse("ORACLE_MAX_RETRIES")
                .unwrap_or(defaults.oracle_max_retries),
            gemini_model: env::var("GEMINI_MODEL")
                .ok()
                .filter(|m| !m.trim().is_empty())
                .unwrap_or(defaults.gemini_model),
            max_intent_length: defaults.max_intent_length,
        }
    }

    /// Check that every value is usable
    ///
    /// # Returns
    /// * `Ok(())` - Configuration is valid
    /// * `Err(String)` - Description of the first invalid value
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(format!(
                "confidence_threshold must be between 0.0 and 1.0, got {}",
                self.confidence_threshold
            ));
        }
        if self.oracle_timeout_secs == 0 {
            return Err("oracle_timeout_secs must be > 0".to_string());
        }
        if self.max_intent_length == 0 {
            return Err("max_intent_length must be > 0".to_string());
        }
        if self.gemini_model.trim().is_empty() {
            return Err("gemini_model cannot be empty".to_string());
        }
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// Request body for updating planner configuration
#[derive(Debug, Default, Deserialize)]
pub struct ConfigUpdateRequest {
    /// Lookback window in days (optional)
    pub lookback_days: Option<u32>,
    /// Lookahead window in days (optional)
    pub lookahead_days: Option<u32>,
    /// Confidence threshold (optional)
    pub confidence_threshold: Option<f64>,
    /// Maximum clarification round-trips (optional)
    pub max_clarifications: Option<u32>,
    /// Oracle timeout in seconds (optional)
    pub oracle_timeout_secs: Option<u64>,
    /// Oracle retry count (optional)
    pub oracle_max_retries: Option<u32>,
    /// Gemini model name (optional)
    pub gemini_model: Option<String>,
    /// Maximum intent length (optional)
    pub max_intent_length: Option<usize>,
}

/// Validate and apply configuration updates
///
/// Fields absent from the request keep their current value. The update is
/// all-or-nothing: if the merged configuration is invalid, nothing changes.
///
/// # Arguments
/// * `config` - The current config to update
/// * `request` - The update request with optional fields
///
/// # Returns
/// * `Ok(PlannerConfig)` - The updated configuration
/// * `Err(AppError)` - If validation fails
pub fn validate_and_apply_config_update(
    mut config: PlannerConfig,
    request: ConfigUpdateRequest,
) -> Result<PlannerConfig, AppError> {
    if let Some(days) = request.lookback_days {
        config.lookback_days = days;
    }
    if let Some(days) = request.lookahead_days {
        config.lookahead_days = days;
    }
    if let Some(threshold) = request.confidence_threshold {
        config.confidence_threshold = threshold;
    }
    if let Some(max) = request.max_clarifications {
        config.max_clarifications = max;
    }
    if let Some(timeout) = request.oracle_timeout_secs {
        config.oracle_timeout_secs = timeout;
    }
    if let Some(retries) = request.oracle_max_retries {
        config.oracle_max_retries = retries;
    }
    if let Some(model) = request.gemini_model {
        config.gemini_model = model.trim().to_string();
    }
    if let Some(max_len) = request.max_intent_length {
        config.max_intent_length = max_len;
    }

    config.validate().map_err(AppError::InvalidConfig)?;
    Ok(config)
}
