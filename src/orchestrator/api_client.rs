//! Gemini API client
//!
//! Direct HTTP client for the Gemini `generateContent` endpoint. One call is one
//! attempt; retry policy lives in [`crate::orchestrator::gemini_oracle`].

use crate::orchestrator::gemini_types::{
    GeminiApiRequest, GeminiApiResponse, GenerationConfig, RequestContent, RequestPart,
};
use std::time::Duration;
use thiserror::Error;

const GEMINI_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Errors from a single Gemini API call
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeminiApiError {
    /// No API key configured
    #[error("API key is empty")]
    MissingApiKey,

    /// The request could not be sent or the body could not be read
    #[error("Network error: {0}")]
    Network(String),

    /// The attempt exceeded its deadline
    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    /// Non-success HTTP status
    #[error("Gemini API returned error status {status}: {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Response body
        message: String,
    },

    /// The prompt was blocked by safety filters
    #[error("Gemini API blocked the prompt: {0}")]
    Blocked(String),

    /// The response was not in the expected shape
    #[error("Invalid response from Gemini API: {0}")]
    InvalidResponse(String),
}

impl GeminiApiError {
    /// Whether another attempt may succeed
    ///
    /// Network errors, timeouts, rate limits (429) and server errors (5xx) are
    /// transient; everything else is not.
    pub fn is_retryable(&self) -> bool {
        match self {
            GeminiApiError::Network(_) | GeminiApiError::Timeout(_) => true,
            GeminiApiError::Api { status, .. } => *status == 429 || *status >= 500,
            GeminiApiError::MissingApiKey
            | GeminiApiError::Blocked(_)
            | GeminiApiError::InvalidResponse(_) => false,
        }
    }
}

/// Gemini API client
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    /// Create a client for `model`
    ///
    /// # Arguments
    /// * `http` - Shared HTTP client (connection pooling)
    /// * `api_key` - Gemini API key
    /// * `model` - Model name (e.g. "gemini-2.5-flash")
    pub fn new(http: reqwest::Client, api_key: String, model: String) -> Self {
        Self {
            http,
            api_key,
            model,
            base_url: GEMINI_API_BASE_URL.to_string(),
        }
    }

    /// Point the client at a different API root (used in tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Model this client calls
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Whether an API key is configured
    pub fn has_api_key(&self) -> bool {
        !self.api_key.is_empty()
    }

    /// Send one prompt and return the text of the first candidate
    ///
    /// # Arguments
    /// * `prompt` - The prompt to send
    /// * `force_json` - If true, request a JSON response
    ///
    /// # Returns
    /// * `Ok(String)` - The text content from the API response
    /// * `Err(GeminiApiError)` - If the call failed; see [`GeminiApiError::is_retryable`]
    pub async fn generate(&self, prompt: &str, force_json: bool) -> Result<String, GeminiApiError> {
        if self.api_key.is_empty() {
            return Err(GeminiApiError::MissingApiKey);
        }

        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);

        let request_body = GeminiApiRequest {
            contents: vec![RequestContent {
                role: "user",
                parts: vec![RequestPart {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: force_json.then(|| GenerationConfig {
                response_mime_type: Some("application/json".to_string()),
            }),
        };

        tracing::debug!(
            model = %self.model,
            force_json = force_json,
            prompt_len = prompt.len(),
            "Calling Gemini API"
        );

        let response = self
            .http
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request_body)
            .send()
            .await
            .map_err(|e| GeminiApiError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error body".to_string());
            tracing::debug!(
                status_code = status.as_u16(),
                error_body = %error_body,
                "Gemini API returned error status"
            );
            return Err(GeminiApiError::Api {
                status: status.as_u16(),
                message: error_body,
            });
        }

        let response_body = response
            .text()
            .await
            .map_err(|e| GeminiApiError::Network(e.to_string()))?;

        let parsed: GeminiApiResponse = serde_json::from_str(&response_body).map_err(|e| {
            GeminiApiError::InvalidResponse(format!(
                "Failed to parse JSON response: {} - Response body: {}",
                e, response_body
            ))
        })?;

        if let Some(reason) = parsed
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_ref())
        {
            return Err(GeminiApiError::Blocked(reason.clone()));
        }

        if parsed.candidates.is_empty() {
            return Err(GeminiApiError::InvalidResponse(
                "response contains no candidates".to_string(),
            ));
        }

        let text = parsed.first_text().ok_or_else(|| {
            GeminiApiError::InvalidResponse("response candidate contains no text".to_string())
        })?;

        tracing::debug!(
            response_len = text.len(),
            "Successfully received response from Gemini API"
        );

        Ok(text)
    }
}
