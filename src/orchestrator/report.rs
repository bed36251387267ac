//! Markdown rendering of plans and commit outcomes

use crate::orchestrator::machine::PlanningSession;
use crate::orchestrator::plan_types::{Priority, ScheduleBlock};
use crate::orchestrator::state::Phase;

fn time_range(block: &ScheduleBlock) -> String {
    let end_format = if block.start.date() == block.end.date() {
        "%I:%M %p"
    } else {
        "%Y-%m-%d %I:%M %p"
    };
    format!(
        "{} - {}",
        block.start.format("%Y-%m-%d %I:%M %p"),
        block.end.format(end_format)
    )
}

/// Render the plan as a markdown schedule
pub fn render_schedule(session: &PlanningSession) -> String {
    let state = &session.state;
    if state.plan.is_empty() {
        return "No schedule generated.".to_string();
    }

    let mut out = vec!["## Schedule Overview".to_string(), String::new()];
    if !state.plan_metadata.trim().is_empty() {
        out.push(format!("**Strategy:** {}", state.plan_metadata.trim()));
        out.push(String::new());
    }

    let total_minutes: i64 = state
        .plan
        .iter()
        .filter(|b| !b.is_break())
        .map(ScheduleBlock::duration_minutes)
        .sum();
    let high_priority = state
        .plan
        .iter()
        .filter(|b| b.priority == Priority::P1)
        .count();
    let breaks = state.plan.iter().filter(|b| b.is_break()).count();
    out.push(format!(
        "{:.1} hours scheduled · {} P1 block(s) · {} break(s)",
        total_minutes as f64 / 60.0,
        high_priority,
        breaks
    ));

    if state.low_confidence {
        out.push(String::new());
        out.push(format!(
            "> **Low confidence:** this plan was built after {} clarification(s) with confidence {:.2}. Review it carefully.",
            state.clarification_count, state.confidence
        ));
    }

    out.push(String::new());
    out.push("## Your Schedule".to_string());

    for block in &state.plan {
        out.push(String::new());
        out.push(format!("### {}", time_range(block)));
        out.push(format!("**{}** ({})", block.title, block.category));
        let mut meta = vec![
            format!("Priority: {}", block.priority),
            format!("Energy: {}", block.energy_level),
            format!("Cognitive load: {}", block.cognitive_load),
        ];
        if !block.tags.is_empty() {
            meta.push(format!("Tags: {}", block.tags.join(", ")));
        }
        out.push(format!("*{}*", meta.join(" · ")));
        if !block.rationale.trim().is_empty() {
            out.push(format!("> {}", block.rationale.trim()));
        }
    }

    out.join("\n")
}

/// Render the final report: outcome, calendar writes and the condensed schedule
pub fn render_final_report(session: &PlanningSession) -> String {
    let state = &session.state;
    let mut out = vec!["# Final Schedule Report".to_string(), String::new()];
    out.push(format!("**Status:** {}", session.phase));

    if let Some(reason) = &state.failure {
        out.push(format!("**Failure:** {}", reason));
    }

    if !state.caveats.is_empty() {
        out.push(String::new());
        out.push("## Caveats".to_string());
        out.extend(state.caveats.iter().map(|c| format!("- {}", c)));
    }

    if let Some(report) = &state.commit_report {
        out.push(String::new());
        out.push(format!(
            "## Added to Calendar ({} event(s))",
            report.written.len()
        ));
        for written in &report.written {
            let start = state
                .proposed_entries
                .iter()
                .find(|e| e.id == written.entry_id)
                .map(|e| e.start.format("%Y-%m-%d %I:%M %p").to_string())
                .unwrap_or_default();
            out.push(format!("- **{}** {}", start, written.title));
        }
        for failure in &report.failures {
            out.push(format!("- Failed: {} ({})", failure.title, failure.reason));
        }
        out.push(String::new());
        out.push(report.summary());
    } else if session.phase == Phase::Done {
        out.push(String::new());
        out.push("No events were added to your calendar.".to_string());
    }

    if !state.plan.is_empty() {
        let written_ids: Vec<&str> = state
            .commit_report
            .iter()
            .flat_map(|r| r.written.iter().map(|w| w.entry_id.as_str()))
            .collect();

        out.push(String::new());
        out.push("## Complete Schedule".to_string());
        for (idx, block) in state.plan.iter().enumerate() {
            let entry_id = format!(
                "{}{}",
                crate::orchestrator::constants::ENTRY_ID_PREFIX,
                idx + 1
            );
            let marker = if written_ids.contains(&entry_id.as_str()) {
                " (in calendar)"
            } else {
                ""
            };
            out.push(format!(
                "- **{}** [{}] {}{}",
                time_range(block),
                block.priority,
                block.title,
                marker
            ));
        }
    }

    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::commit::{CommitFailure, CommitReport, WrittenEntry};
    use crate::orchestrator::config::PlannerConfig;
    use crate::orchestrator::materializer::materialize;
    use crate::orchestrator::plan_types::{Category, Level};
    use chrono::NaiveDate;

    fn block(hour: u32, title: &str, category: Category) -> ScheduleBlock {
        let day = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        ScheduleBlock {
            start: day.and_hms_opt(hour, 0, 0).unwrap(),
            end: day.and_hms_opt(hour + 1, 0, 0).unwrap(),
            title: title.to_string(),
            priority: Priority::P1,
            category,
            energy_level: Level::High,
            cognitive_load: Level::Medium,
            tags: vec![],
            rationale: "Peak energy".to_string(),
        }
    }

    fn session_with_plan() -> PlanningSession {
        let mut session = PlanningSession::new("plan tomorrow", PlannerConfig::default());
        session.state.plan = vec![
            block(9, "Deep work", Category::Work),
            block(10, "Walk", Category::Break),
        ];
        session.state.plan_metadata = "Front-load focus".to_string();
        session.state.proposed_entries = materialize(&session.state.plan);
        session
    }

    #[test]
    fn test_render_schedule_lists_blocks() {
        let rendered = render_schedule(&session_with_plan());
        assert!(rendered.contains("**Strategy:** Front-load focus"));
        assert!(rendered.contains("### 2026-10-19 09:00 AM - 10:00 AM"));
        assert!(rendered.contains("**Deep work** (work)"));
        assert!(rendered.contains("> Peak energy"));
        assert!(rendered.contains("1.0 hours scheduled"));
        assert!(!rendered.contains("Low confidence"));
    }

    #[test]
    fn test_render_schedule_flags_low_confidence() {
        let mut session = session_with_plan();
        session.state.low_confidence = true;
        session.state.confidence = 0.4;
        session.state.clarification_count = 2;
        let rendered = render_schedule(&session);
        assert!(rendered.contains("**Low confidence:**"));
        assert!(rendered.contains("0.40"));
    }

    #[test]
    fn test_render_schedule_without_plan() {
        let session = PlanningSession::new("plan", PlannerConfig::default());
        assert_eq!(render_schedule(&session), "No schedule generated.");
    }

    #[test]
    fn test_final_report_marks_written_entries() {
        let mut session = session_with_plan();
        session.phase = Phase::Done;
        session.state.commit_report = Some(CommitReport {
            written: vec![WrittenEntry {
                entry_id: "evt_1".to_string(),
                event_id: "g-1".to_string(),
                title: "Deep work".to_string(),
            }],
            failures: vec![CommitFailure {
                entry_id: "evt_3".to_string(),
                title: "Review".to_string(),
                reason: "HTTP 500".to_string(),
            }],
            timezone: "UTC".to_string(),
            timezone_caveat: None,
        });

        let report = render_final_report(&session);
        assert!(report.contains("**Status:** DONE"));
        assert!(report.contains("## Added to Calendar (1 event(s))"));
        assert!(report.contains("Deep work (in calendar)"));
        assert!(report.contains("- Failed: Review (HTTP 500)"));
        assert!(report.contains("Added 1 of 2 events"));
    }
}
