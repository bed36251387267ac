//! Reasoning oracle contract
//!
//! The planner treats the language model as a narrow three-capability oracle:
//! assess, clarify, plan. Implementations return text; the parsing helpers here
//! turn that text into typed values and reject anything structurally wrong, so
//! every implementation (and every test double) is held to the same contract.

use crate::orchestrator::plan_types::{PlanDraft, ScheduleBlock};
use crate::orchestrator::state::SessionState;
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Errors surfaced by the reasoning oracle
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OracleError {
    /// The service could not be reached after all retries
    #[error("Reasoning service unavailable after {attempts} attempt(s): {message}")]
    Unavailable {
        /// Attempts made, including the first
        attempts: u32,
        /// Last error seen
        message: String,
    },

    /// The response did not match the expected structure
    #[error("Malformed oracle output: {0}")]
    Malformed(String),
}

/// Inputs shared by all oracle capabilities
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OracleContext {
    /// Current planning goal
    pub user_intent: String,
    /// Past calendar events
    pub momentum_summary: String,
    /// Upcoming calendar events
    pub constraint_summary: String,
    /// Urgent and backlog tasks
    pub task_summary: String,
    /// Conversation so far, one `Speaker: text` line per turn
    pub conversation: String,
}

impl OracleContext {
    /// Snapshot the oracle inputs from session state
    pub fn from_state(state: &SessionState) -> Self {
        Self {
            user_intent: state.user_intent.clone(),
            momentum_summary: state.momentum_summary.clone(),
            constraint_summary: state.constraint_summary.clone(),
            task_summary: state.task_summary.clone(),
            conversation: state.transcript(),
        }
    }
}

/// Result of an assessment
#[derive(Debug, Clone, PartialEq)]
pub struct Assessment {
    /// Confidence in [0, 1] that a plan can be built now
    pub confidence: f64,
    /// Free-text reasoning
    pub analysis: String,
    /// What is missing; empty when confident
    pub missing_info: String,
    /// Unparsed response text
    pub raw: String,
}

/// A pluggable reasoning service
#[async_trait]
pub trait ReasoningOracle: Send + Sync {
    /// Judge whether the context is sufficient to plan
    async fn assess(&self, ctx: &OracleContext) -> Result<Assessment, OracleError>;

    /// Produce exactly one question that resolves `missing_info`
    async fn clarify(&self, missing_info: &str, ctx: &OracleContext)
        -> Result<String, OracleError>;

    /// Produce a schedule
    async fn plan(&self, ctx: &OracleContext, analysis: &str) -> Result<PlanDraft, OracleError>;
}

/// Remove a surrounding markdown code fence (```json ... ```)
///
/// A fenced block embedded in prose is extracted; unfenced text is returned trimmed.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(open) = trimmed.find("```") else {
        return trimmed;
    };
    let after_open = &trimmed[open + 3..];
    // skip the language tag line
    let body_start = after_open.find('\n').map(|i| i + 1).unwrap_or(0);
    let body = &after_open[body_start..];
    match body.find("```") {
        Some(close) => body[..close].trim(),
        None => body.trim(),
    }
}

fn parse_json(raw: &str) -> Result<Value, OracleError> {
    serde_json::from_str(strip_code_fences(raw))
        .map_err(|e| OracleError::Malformed(format!("response is not valid JSON: {}", e)))
}

fn text_field(obj: &serde_json::Map<String, Value>, key: &str) -> Result<String, OracleError> {
    match obj.get(key) {
        Some(Value::String(s)) => Ok(s.trim().to_string()),
        Some(Value::Null) => Ok(String::new()),
        Some(other) => Err(OracleError::Malformed(format!(
            "'{}' must be a string, got {}",
            key, other
        ))),
        None => Err(OracleError::Malformed(format!("missing '{}' field", key))),
    }
}

impl Assessment {
    /// Parse an assessment response
    ///
    /// Expects `{"confidence": <0..1>, "analysis": "...", "missing_info": "..."}`.
    pub fn parse(raw: &str) -> Result<Self, OracleError> {
        let value = parse_json(raw)?;
        let obj = value
            .as_object()
            .ok_or_else(|| OracleError::Malformed("assessment must be a JSON object".into()))?;

        let confidence = match obj.get("confidence") {
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
        .ok_or_else(|| OracleError::Malformed("missing or non-numeric 'confidence'".into()))?;

        if !(0.0..=1.0).contains(&confidence) {
            return Err(OracleError::Malformed(format!(
                "confidence {} is outside [0, 1]",
                confidence
            )));
        }

        Ok(Self {
            confidence,
            analysis: text_field(obj, "analysis")?,
            missing_info: text_field(obj, "missing_info")?,
            raw: raw.to_string(),
        })
    }
}

/// Reduce clarification output to a single question
///
/// Output with several questions is cut after the first `?`; output with none
/// is rejected.
pub fn single_question(raw: &str) -> Result<String, OracleError> {
    let text = strip_code_fences(raw).trim_matches(|c: char| c.is_whitespace() || c == '"');
    match text.find('?') {
        None => Err(OracleError::Malformed(
            "clarification contains no question".into(),
        )),
        Some(idx) => Ok(text[..=idx].trim().to_string()),
    }
}

fn render_metadata(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Object(map)) => map
            .iter()
            .map(|(k, v)| match v {
                Value::String(s) => format!("{}: {}", k, s),
                other => format!("{}: {}", k, other),
            })
            .collect::<Vec<_>>()
            .join("\n"),
        Some(other) => other.to_string(),
    }
}

/// Parse a plan response
///
/// Accepts `{"blocks": [...], "metadata": ...}` or a bare array of blocks.
/// Every block must deserialize and validate; an empty plan is rejected.
pub fn parse_plan(raw: &str) -> Result<PlanDraft, OracleError> {
    let value = parse_json(raw)?;
    let (blocks_value, metadata) = match value {
        Value::Array(items) => (items, String::new()),
        Value::Object(mut obj) => {
            let metadata = render_metadata(obj.get("metadata"));
            match obj.remove("blocks").or_else(|| obj.remove("schedule")) {
                Some(Value::Array(items)) => (items, metadata),
                _ => {
                    return Err(OracleError::Malformed(
                        "plan object has no 'blocks' array".into(),
                    ))
                }
            }
        }
        _ => {
            return Err(OracleError::Malformed(
                "plan must be a JSON object or array".into(),
            ))
        }
    };

    if blocks_value.is_empty() {
        return Err(OracleError::Malformed("plan contains no blocks".into()));
    }

    let mut blocks = Vec::with_capacity(blocks_value.len());
    for (idx, item) in blocks_value.into_iter().enumerate() {
        let block: ScheduleBlock = serde_json::from_value(item)
            .map_err(|e| OracleError::Malformed(format!("block {}: {}", idx + 1, e)))?;
        block
            .validate()
            .map_err(|e| OracleError::Malformed(format!("block {}: {}", idx + 1, e)))?;
        blocks.push(block);
    }

    Ok(PlanDraft { blocks, metadata })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fences("  {\"a\": 1}  "), "{\"a\": 1}");
        assert_eq!(
            strip_code_fences("Here you go:\n```\n[1]\n```\nThanks"),
            "[1]"
        );
    }

    #[test]
    fn test_assessment_parse() {
        let raw = "```json\n{\"confidence\": 0.97, \"analysis\": \"Clear day\", \"missing_info\": \"\"}\n```";
        let assessment = Assessment::parse(raw).unwrap();
        assert_eq!(assessment.confidence, 0.97);
        assert_eq!(assessment.analysis, "Clear day");
        assert!(assessment.missing_info.is_empty());
        assert_eq!(assessment.raw, raw);
    }

    #[test]
    fn test_assessment_rejects_out_of_range_confidence() {
        let err = Assessment::parse(
            r#"{"confidence": 1.2, "analysis": "x", "missing_info": ""}"#,
        )
        .unwrap_err();
        assert!(matches!(err, OracleError::Malformed(_)));
    }

    #[test]
    fn test_assessment_rejects_missing_fields_and_prose() {
        assert!(Assessment::parse(r#"{"confidence": 0.5}"#).is_err());
        assert!(Assessment::parse("I think you should plan the morning.").is_err());
    }

    #[test]
    fn test_single_question_keeps_first() {
        assert_eq!(
            single_question("How long will the training take? And when?").unwrap(),
            "How long will the training take?"
        );
        assert_eq!(
            single_question("\"Morning or afternoon?\"").unwrap(),
            "Morning or afternoon?"
        );
        assert!(single_question("Please tell me more.").is_err());
    }

    #[test]
    fn test_parse_plan_object_form() {
        let raw = r#"{
            "blocks": [
                {"start": "2026-10-19 09:00", "end": "2026-10-19 10:00", "title": "Deep work",
                 "priority": "P1", "category": "work", "energy_level": "high", "cognitive_load": "high"}
            ],
            "metadata": {"scheduling_strategy": "Front-load focus"}
        }"#;
        let draft = parse_plan(raw).unwrap();
        assert_eq!(draft.blocks.len(), 1);
        assert_eq!(draft.metadata, "scheduling_strategy: Front-load focus");
    }

    #[test]
    fn test_parse_plan_bare_array() {
        let raw = r#"[{"start_time": "2026-10-19 12:00", "end_time": "2026-10-19 12:30",
            "title": "Lunch", "priority": "P2", "type": "break",
            "energy_level": "low", "cognitive_load": "low"}]"#;
        let draft = parse_plan(raw).unwrap();
        assert!(draft.blocks[0].is_break());
        assert!(draft.metadata.is_empty());
    }

    #[test]
    fn test_parse_plan_rejects_empty_and_invalid_blocks() {
        assert!(parse_plan(r#"{"blocks": []}"#).is_err());
        let bad_enum = r#"[{"start": "2026-10-19 09:00", "end": "2026-10-19 10:00", "title": "x",
            "priority": "urgent", "category": "work", "energy_level": "high", "cognitive_load": "low"}]"#;
        let err = parse_plan(bad_enum).unwrap_err();
        assert!(err.to_string().contains("block 1"));
        let inverted = r#"[{"start": "2026-10-19 11:00", "end": "2026-10-19 10:00", "title": "x",
            "priority": "P1", "category": "work", "energy_level": "high", "cognitive_load": "low"}]"#;
        assert!(parse_plan(inverted).is_err());
    }
}
