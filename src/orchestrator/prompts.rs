//! Prompt templates for the Gemini oracle

use crate::orchestrator::oracle::OracleContext;

fn calendar_context(ctx: &OracleContext) -> String {
    format!("{}\n\n{}", ctx.momentum_summary, ctx.constraint_summary)
}

fn conversation(ctx: &OracleContext) -> &str {
    if ctx.conversation.trim().is_empty() {
        "(No previous conversation)"
    } else {
        &ctx.conversation
    }
}

/// Prompt asking for a confidence assessment as JSON
pub fn assessment_prompt(ctx: &OracleContext) -> String {
    format!(
        r#"You are an executive strategist helping someone plan their day with attention to energy management and cognitive load. Judge whether the context below is enough to build a concrete, actionable schedule.

**User Intent:**
{intent}

**Calendar Context (Past/Future Events):**
{calendar}

**Task Context (Urgent/Backlog Tasks):**
{tasks}

**Conversation History:**
{conversation}

Consider energy constraints, task priorities (P1-P4), conflicts with fixed calendar events, specificity (what, when, how long) and whether the load is realistic.
If the user already stated a priority for a task, do not ask about it again. Do not repeat questions already asked in the conversation.

Return ONLY a JSON object with this exact structure:
{{
    "confidence": <number between 0.0 and 1.0>,
    "analysis": "<reasoning about energy, priorities, constraints and feasibility>",
    "missing_info": "<specific details still needed, or an empty string if confident>"
}}"#,
        intent = ctx.user_intent,
        calendar = calendar_context(ctx),
        tasks = ctx.task_summary,
        conversation = conversation(ctx),
    )
}

/// Prompt asking for exactly one clarifying question
pub fn clarification_prompt(missing_info: &str, ctx: &OracleContext) -> String {
    format!(
        r#"You are helping someone plan their day. Ask ONE concise, specific question that resolves the missing information below.

**Missing Information:**
{missing_info}

**User's Intent:**
{intent}

**Conversation History:**
{conversation}

Ask about actionable details such as preferred time, duration or energy needs. Do not ask anything already answered in the conversation. Do not re-confirm stated priorities.

Reply with the question only, on a single line."#,
        missing_info = missing_info,
        intent = ctx.user_intent,
        conversation = conversation(ctx),
    )
}

/// Prompt asking for a schedule as JSON
pub fn planning_prompt(ctx: &OracleContext, analysis: &str) -> String {
    format!(
        r#"You are an executive planner. Build a realistic schedule that respects energy levels and cognitive load.

**User Intent:**
{intent}

**Calendar Context:**
{calendar}

**Task Context:**
{tasks}

**Strategic Analysis:**
{analysis}

**Conversation History:**
{conversation}

Principles:
- Put P1 work in peak energy windows, then P2, then P3; P4 only if there is room.
- Calendar events are fixed; never overlap them.
- Use the same local time as the calendar event times above; do not convert timezones.
- Group similar work, put decision-heavy work early, leave transition time.
- Include breaks and buffers. Under-schedule rather than over-schedule.

Return ONLY a JSON object with this exact structure:
{{
    "blocks": [
        {{
            "start": "YYYY-MM-DD HH:MM",
            "end": "YYYY-MM-DD HH:MM",
            "title": "<what happens>",
            "priority": "P1" | "P2" | "P3" | "P4",
            "category": "work" | "meeting" | "break" | "personal",
            "energy_level": "high" | "medium" | "low",
            "cognitive_load": "high" | "medium" | "low",
            "tags": ["<tag>"],
            "rationale": "<why this block is placed here>"
        }}
    ],
    "metadata": "<overall scheduling strategy>"
}}"#,
        intent = ctx.user_intent,
        calendar = calendar_context(ctx),
        tasks = ctx.task_summary,
        analysis = analysis,
        conversation = conversation(ctx),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> OracleContext {
        OracleContext {
            user_intent: "plan tomorrow".to_string(),
            momentum_summary: "**Past Events (Momentum - Last 3 days):**".to_string(),
            constraint_summary: "- 2026-10-19 09:00: Standup".to_string(),
            task_summary: "**URGENT TASKS:**\n- File taxes [P1]".to_string(),
            conversation: String::new(),
        }
    }

    #[test]
    fn test_assessment_prompt_includes_context_and_schema() {
        let prompt = assessment_prompt(&ctx());
        assert!(prompt.contains("plan tomorrow"));
        assert!(prompt.contains("2026-10-19 09:00: Standup"));
        assert!(prompt.contains("File taxes"));
        assert!(prompt.contains("(No previous conversation)"));
        assert!(prompt.contains("\"missing_info\""));
    }

    #[test]
    fn test_clarification_prompt_includes_missing_info() {
        let prompt = clarification_prompt("duration of the training", &ctx());
        assert!(prompt.contains("duration of the training"));
        assert!(prompt.contains("ONE"));
    }

    #[test]
    fn test_planning_prompt_includes_analysis_and_enums() {
        let prompt = planning_prompt(&ctx(), "Morning is free");
        assert!(prompt.contains("Morning is free"));
        assert!(prompt.contains("\"blocks\""));
        assert!(prompt.contains("\"break\""));
    }
}
