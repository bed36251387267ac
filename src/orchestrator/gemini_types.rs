//! Gemini API wire types
//!
//! Structs that mirror the Gemini `generateContent` JSON format. The API
//! speaks camelCase; snake_case aliases are accepted on responses.

use serde::{Deserialize, Serialize};

/// Top-level Gemini API response
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct GeminiApiResponse {
    /// Candidate responses from the model
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    /// Feedback about the prompt (e.g., if it was blocked)
    #[serde(default, alias = "prompt_feedback")]
    pub prompt_feedback: Option<PromptFeedback>,
}

/// A single candidate response from the model
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    /// The content of this candidate
    #[serde(default)]
    pub content: Option<Content>,
    /// Why the model stopped generating
    #[serde(default, alias = "finish_reason")]
    pub finish_reason: Option<String>,
}

/// Content of a candidate
#[derive(Deserialize, Debug)]
pub struct Content {
    /// Content parts (typically one text part)
    #[serde(default)]
    pub parts: Vec<Part>,
}

/// A single part of content
#[derive(Deserialize, Debug)]
pub struct Part {
    /// Text content; absent for non-text parts
    #[serde(default)]
    pub text: Option<String>,
}

/// Feedback about the prompt
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    /// Reason the prompt was blocked
    #[serde(default, alias = "block_reason")]
    pub block_reason: Option<String>,
}

/// Request body for `generateContent`
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct GeminiApiRequest {
    /// Content items to send
    pub contents: Vec<RequestContent>,
    /// Generation configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

/// Content item for requests
#[derive(Serialize, Debug)]
pub struct RequestContent {
    /// Speaker role
    pub role: &'static str,
    /// Content parts
    pub parts: Vec<RequestPart>,
}

/// A single text part for requests
#[derive(Serialize, Debug)]
pub struct RequestPart {
    /// The text content
    pub text: String,
}

/// Generation configuration for requests
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    /// MIME type to force for the response (e.g., "application/json")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
}

impl GeminiApiResponse {
    /// Concatenated text of the first candidate, if any
    pub fn first_text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serializes_camel_case() {
        let request = GeminiApiRequest {
            contents: vec![RequestContent {
                role: "user",
                parts: vec![RequestPart {
                    text: "hi".to_string(),
                }],
            }],
            generation_config: Some(GenerationConfig {
                response_mime_type: Some("application/json".to_string()),
            }),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value["generationConfig"]["responseMimeType"],
            "application/json"
        );
        assert_eq!(value["contents"][0]["parts"][0]["text"], "hi");
    }

    #[test]
    fn test_response_accepts_both_casings() {
        let camel: GeminiApiResponse =
            serde_json::from_str(r#"{"candidates": [], "promptFeedback": {"blockReason": "SAFETY"}}"#)
                .unwrap();
        let snake: GeminiApiResponse =
            serde_json::from_str(r#"{"candidates": [], "prompt_feedback": {"block_reason": "SAFETY"}}"#)
                .unwrap();
        for parsed in [camel, snake] {
            assert_eq!(
                parsed.prompt_feedback.and_then(|f| f.block_reason).as_deref(),
                Some("SAFETY")
            );
        }
    }

    #[test]
    fn test_first_text_joins_parts() {
        let parsed: GeminiApiResponse = serde_json::from_str(
            r#"{"candidates": [{"content": {"parts": [{"text": "a"}, {"text": "b"}], "role": "model"}, "finishReason": "STOP"}]}"#,
        )
        .unwrap();
        assert_eq!(parsed.first_text().as_deref(), Some("ab"));
    }
}
