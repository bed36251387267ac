//! Gemini-backed reasoning oracle
//!
//! Implements [`ReasoningOracle`] on top of [`GeminiClient`]. Each call is
//! bounded by a per-attempt timeout; transient failures are retried with
//! exponential backoff. Malformed output is returned to the caller as-is and
//! never retried here.

use crate::orchestrator::api_client::{GeminiApiError, GeminiClient};
use crate::orchestrator::config::PlannerConfig;
use crate::orchestrator::constants::ORACLE_INITIAL_BACKOFF_MS;
use crate::orchestrator::oracle::{
    parse_plan, single_question, Assessment, OracleContext, OracleError, ReasoningOracle,
};
use crate::orchestrator::plan_types::PlanDraft;
use crate::orchestrator::prompts;
use async_trait::async_trait;
use std::time::Duration;

/// Reasoning oracle backed by the Gemini API
#[derive(Debug, Clone)]
pub struct GeminiOracle {
    client: GeminiClient,
    timeout: Duration,
    max_retries: u32,
    initial_backoff: Duration,
}

impl GeminiOracle {
    /// Create an oracle with explicit retry settings
    pub fn new(client: GeminiClient, timeout: Duration, max_retries: u32) -> Self {
        Self {
            client,
            timeout,
            max_retries,
            initial_backoff: Duration::from_millis(ORACLE_INITIAL_BACKOFF_MS),
        }
    }

    /// Create an oracle using the model and retry settings from `config`
    pub fn from_config(http: reqwest::Client, api_key: String, config: &PlannerConfig) -> Self {
        let client = GeminiClient::new(http, api_key, config.gemini_model.clone());
        Self::new(
            client,
            Duration::from_secs(config.oracle_timeout_secs),
            config.oracle_max_retries,
        )
    }

    /// Override the initial retry backoff
    pub fn with_initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = backoff;
        self
    }

    /// Underlying API client
    pub fn client(&self) -> &GeminiClient {
        &self.client
    }

    /// Run one prompt through the retry loop
    ///
    /// # Returns
    /// * `Ok(String)` - Response text
    /// * `Err(OracleError::Unavailable)` - Retries exhausted or a non-transient failure
    pub async fn complete(
        &self,
        operation: &'static str,
        prompt: &str,
        force_json: bool,
    ) -> Result<String, OracleError> {
        let total_attempts = self.max_retries + 1;
        let mut last_error: Option<GeminiApiError> = None;

        for attempt in 0..total_attempts {
            if attempt > 0 {
                let backoff = self.initial_backoff * 2u32.pow(attempt - 1);
                tracing::warn!(
                    operation,
                    attempt = attempt + 1,
                    backoff_ms = backoff.as_millis() as u64,
                    error = ?last_error,
                    "Retrying oracle call after transient error"
                );
                tokio::time::sleep(backoff).await;
            }

            tracing::debug!(
                operation,
                attempt = attempt + 1,
                prompt_len = prompt.len(),
                "Calling reasoning oracle"
            );

            let result =
                match tokio::time::timeout(self.timeout, self.client.generate(prompt, force_json))
                    .await
                {
                    Ok(result) => result,
                    Err(_) => Err(GeminiApiError::Timeout(self.timeout)),
                };

            match result {
                Ok(text) => {
                    tracing::debug!(
                        operation,
                        attempt = attempt + 1,
                        response_len = text.len(),
                        "Oracle call succeeded"
                    );
                    return Ok(text);
                }
                Err(e) if e.is_retryable() => {
                    last_error = Some(e);
                }
                Err(e) => {
                    tracing::error!(operation, attempt = attempt + 1, error = %e, "Oracle call failed");
                    return Err(OracleError::Unavailable {
                        attempts: attempt + 1,
                        message: e.to_string(),
                    });
                }
            }
        }

        let message = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no attempts made".to_string());
        tracing::error!(
            operation,
            attempts = total_attempts,
            error = %message,
            "Oracle retries exhausted"
        );
        Err(OracleError::Unavailable {
            attempts: total_attempts,
            message,
        })
    }
}

#[async_trait]
impl ReasoningOracle for GeminiOracle {
    async fn assess(&self, ctx: &OracleContext) -> Result<Assessment, OracleError> {
        let prompt = prompts::assessment_prompt(ctx);
        let raw = self.complete("assess", &prompt, true).await?;
        Assessment::parse(&raw)
    }

    async fn clarify(
        &self,
        missing_info: &str,
        ctx: &OracleContext,
    ) -> Result<String, OracleError> {
        let prompt = prompts::clarification_prompt(missing_info, ctx);
        let raw = self.complete("clarify", &prompt, false).await?;
        single_question(&raw)
    }

    async fn plan(&self, ctx: &OracleContext, analysis: &str) -> Result<PlanDraft, OracleError> {
        let prompt = prompts::planning_prompt(ctx, analysis);
        let raw = self.complete("plan", &prompt, true).await?;
        parse_plan(&raw)
    }
}
