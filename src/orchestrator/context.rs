//! Context Aggregator
//!
//! Fetches calendar events and tasks and renders them as the three text
//! summaries the oracle reasons over:
//!
//! - **momentum**: calendar events that started before now
//! - **constraints**: calendar events at or after now
//! - **tasks**: urgent (due today or overdue) and backlog (no due date)
//!
//! Event times are rendered in the calendar's own timezone, and "now" and
//! "today" are taken in that zone too, so the oracle plans in the same
//! wall-clock time approved entries are written in.
//!
//! Tasks due in the future belong to neither bucket. Source failures never
//! propagate: the affected summary carries an error marker and a caveat is
//! recorded so the session can continue degraded.

use crate::integrations::parsers::parse_event_title;
use crate::integrations::{CalendarEvent, CalendarSource, Task, TaskSource};
use crate::orchestrator::constants::{
    CALENDAR_ERROR_PREFIX, EVENT_DESCRIPTION_LIMIT, TASKS_ERROR_PREFIX, TASK_DESCRIPTION_LIMIT,
};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use std::sync::Arc;

/// Which task bucket a task falls into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskBucket {
    /// Due today or overdue
    Urgent,
    /// No due date
    Backlog,
    /// Due after today; left out of the summary
    Excluded,
}

/// Classify a task relative to `today`
pub fn classify_task(task: &Task, today: NaiveDate) -> TaskBucket {
    match task.due {
        Some(due) if due <= today => TaskBucket::Urgent,
        Some(_) => TaskBucket::Excluded,
        None => TaskBucket::Backlog,
    }
}

/// Calendar half of the context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarSnapshot {
    /// Past events
    pub momentum_summary: String,
    /// Upcoming events
    pub constraint_summary: String,
    /// Zone the summaries are rendered in
    pub timezone: Tz,
    /// One entry per degradation (unreadable events or timezone)
    pub caveats: Vec<String>,
}

/// Full aggregated context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextSnapshot {
    /// Past events
    pub momentum_summary: String,
    /// Upcoming events
    pub constraint_summary: String,
    /// Urgent and backlog tasks
    pub task_summary: String,
    /// One entry per degraded source
    pub caveats: Vec<String>,
}

/// Aggregates calendar and task context
#[derive(Clone)]
pub struct ContextAggregator {
    calendar: Arc<dyn CalendarSource>,
    tasks: Arc<dyn TaskSource>,
}

impl ContextAggregator {
    /// Create an aggregator over the given sources
    pub fn new(calendar: Arc<dyn CalendarSource>, tasks: Arc<dyn TaskSource>) -> Self {
        Self { calendar, tasks }
    }

    /// Calendar source
    pub fn calendar(&self) -> &Arc<dyn CalendarSource> {
        &self.calendar
    }

    /// Task source
    pub fn tasks(&self) -> &Arc<dyn TaskSource> {
        &self.tasks
    }

    /// Gather context for the window around the current time
    pub async fn gather(&self, lookback_days: u32, lookahead_days: u32) -> ContextSnapshot {
        self.gather_at(Utc::now(), lookback_days, lookahead_days)
            .await
    }

    /// Gather context relative to an explicit `now`
    ///
    /// Event times and "today" are taken in the calendar's timezone, the same
    /// zone approved entries are written in. The calendar and task fetches run
    /// concurrently; results are merged by source, so the output does not
    /// depend on completion order.
    pub async fn gather_at(
        &self,
        now: DateTime<Utc>,
        lookback_days: u32,
        lookahead_days: u32,
    ) -> ContextSnapshot {
        let (calendar, tasks) = tokio::join!(
            self.refresh_calendar_at(now, lookback_days, lookahead_days),
            self.tasks.list_tasks(),
        );

        let today = now.with_timezone(&calendar.timezone).date_naive();
        let (task_summary, task_caveat) = match tasks {
            Ok(tasks) => (summarize_tasks(&tasks, today), None),
            Err(e) => {
                tracing::warn!(error = %e, "Task source unavailable, continuing degraded");
                (
                    format!("{} {}", TASKS_ERROR_PREFIX, e),
                    Some(format!("Task data unavailable: {}", e)),
                )
            }
        };

        let caveats = calendar.caveats.into_iter().chain(task_caveat).collect();

        ContextSnapshot {
            momentum_summary: calendar.momentum_summary,
            constraint_summary: calendar.constraint_summary,
            task_summary,
            caveats,
        }
    }

    /// Re-read only the calendar half of the context
    pub async fn refresh_calendar(
        &self,
        lookback_days: u32,
        lookahead_days: u32,
    ) -> CalendarSnapshot {
        self.refresh_calendar_at(Utc::now(), lookback_days, lookahead_days)
            .await
    }

    /// Re-read only the calendar half relative to an explicit `now`
    pub async fn refresh_calendar_at(
        &self,
        now: DateTime<Utc>,
        lookback_days: u32,
        lookahead_days: u32,
    ) -> CalendarSnapshot {
        let window_start = now - Duration::days(i64::from(lookback_days));
        let window_end = now + Duration::days(i64::from(lookahead_days));

        let (timezone, events) = tokio::join!(
            self.calendar_timezone(),
            self.calendar.list_events(window_start, window_end),
        );

        match events {
            Ok(events) => {
                let (timezone, caveat) = timezone;
                let (momentum_summary, constraint_summary) =
                    summarize_calendar(&events, now, timezone, lookback_days, lookahead_days);
                CalendarSnapshot {
                    momentum_summary,
                    constraint_summary,
                    timezone,
                    caveats: caveat.into_iter().collect(),
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Calendar source unavailable, continuing degraded");
                let marker = format!("{} {}", CALENDAR_ERROR_PREFIX, e);
                CalendarSnapshot {
                    momentum_summary: marker.clone(),
                    constraint_summary: marker,
                    timezone: timezone.0,
                    caveats: vec![format!("Calendar data unavailable: {}", e)],
                }
            }
        }
    }

    /// Calendar timezone, falling back to UTC with a caveat
    async fn calendar_timezone(&self) -> (Tz, Option<String>) {
        let name = match self.calendar.timezone().await {
            Ok(name) => name,
            Err(e) => {
                tracing::warn!(error = %e, "Calendar timezone unavailable, rendering in UTC");
                return (
                    Tz::UTC,
                    Some(format!(
                        "Calendar timezone unavailable ({}); event times are shown in UTC",
                        e
                    )),
                );
            }
        };
        match name.parse::<Tz>() {
            Ok(tz) => (tz, None),
            Err(_) => {
                tracing::warn!(timezone = %name, "Unknown calendar timezone, rendering in UTC");
                (
                    Tz::UTC,
                    Some(format!(
                        "Calendar timezone '{}' is not recognized; event times are shown in UTC",
                        name
                    )),
                )
            }
        }
    }
}

fn truncate(text: &str, limit: usize) -> String {
    if text.chars().count() > limit {
        let cut: String = text.chars().take(limit).collect();
        format!("{}...", cut)
    } else {
        text.to_string()
    }
}

fn format_event(event: &CalendarEvent, tz: Tz) -> String {
    let parsed = parse_event_title(&event.title);
    let when = if event.all_day {
        format!("{} (all day)", event.start.date_naive().format("%Y-%m-%d"))
    } else {
        event
            .start
            .with_timezone(&tz)
            .format("%Y-%m-%d %H:%M")
            .to_string()
    };
    let mut line = format!("- {}: ", when);
    if let Some(category) = &parsed.category {
        line.push_str(&format!("[{}] ", category));
    }
    line.push_str(&parsed.text);
    if let Some(location) = &event.location {
        line.push_str(&format!(" @ {}", location));
    }
    if let Some(description) = &event.description {
        line.push_str(&format!(
            " | {}",
            truncate(description, EVENT_DESCRIPTION_LIMIT)
        ));
    }
    line
}

/// Render calendar events into momentum and constraint summaries
///
/// Timed events starting before `now` go to momentum, the rest to
/// constraints. All-day events dated before today (in `tz`) are momentum.
/// Times are wall-clock times in `tz`. Output depends only on the inputs.
pub fn summarize_calendar(
    events: &[CalendarEvent],
    now: DateTime<Utc>,
    tz: Tz,
    lookback_days: u32,
    lookahead_days: u32,
) -> (String, String) {
    let today = now.with_timezone(&tz).date_naive();
    let mut sorted: Vec<&CalendarEvent> = events.iter().collect();
    sorted.sort_by_key(|e| e.start);

    let (past, future): (Vec<&CalendarEvent>, Vec<&CalendarEvent>) =
        sorted.into_iter().partition(|e| {
            if e.all_day {
                e.start.date_naive() < today
            } else {
                e.start < now
            }
        });

    let mut momentum = vec![format!(
        "**Past Events (Momentum - Last {} days, {} time):**",
        lookback_days,
        tz.name()
    )];
    if past.is_empty() {
        momentum.push("No past events.".to_string());
    } else {
        momentum.extend(past.into_iter().map(|e| format_event(e, tz)));
    }

    let mut constraints = vec![format!(
        "**Future Events (Constraints - Next {} days, {} time):**",
        lookahead_days,
        tz.name()
    )];
    if future.is_empty() {
        constraints.push("No upcoming events.".to_string());
    } else {
        constraints.extend(future.into_iter().map(|e| format_event(e, tz)));
    }

    (momentum.join("\n"), constraints.join("\n"))
}

fn format_task(task: &Task, today: NaiveDate) -> String {
    let mut line = format!("- {}", task.content);
    if task.priority > 1 {
        line.push_str(&format!(" [{}]", task.priority_label()));
    }
    if !task.labels.is_empty() {
        let labels: Vec<String> = task.labels.iter().map(|l| format!("#{}", l)).collect();
        line.push_str(&format!(" {}", labels.join(", ")));
    }
    if let Some(description) = &task.description {
        line.push_str(&format!(
            " | {}",
            truncate(description, TASK_DESCRIPTION_LIMIT)
        ));
    }
    match task.due {
        Some(due) => {
            let days = (due - today).num_days();
            if days < 0 {
                let overdue = -days;
                let unit = if overdue == 1 { "day" } else { "days" };
                line.push_str(&format!(" [OVERDUE by {} {}]", overdue, unit));
            } else if days == 0 {
                line.push_str(" [Due TODAY]");
            } else {
                line.push_str(&format!(" [Due: {}]", due));
            }
        }
        None => line.push_str(" [No due date]"),
    }
    line
}

/// Render tasks into the urgent/backlog summary
///
/// Tasks keep their source order within each bucket.
pub fn summarize_tasks(tasks: &[Task], today: NaiveDate) -> String {
    let mut urgent = Vec::new();
    let mut backlog = Vec::new();
    for task in tasks {
        match classify_task(task, today) {
            TaskBucket::Urgent => urgent.push(format_task(task, today)),
            TaskBucket::Backlog => backlog.push(format_task(task, today)),
            TaskBucket::Excluded => {}
        }
    }

    let mut out = vec!["**Urgent Tasks (Due Today or Overdue):**".to_string()];
    if urgent.is_empty() {
        out.push("No urgent tasks.".to_string());
    } else {
        out.extend(urgent);
    }
    out.push(String::new());
    out.push("**Backlog Tasks (No Due Date):**".to_string());
    if backlog.is_empty() {
        out.push("No backlog tasks.".to_string());
    } else {
        out.extend(backlog);
    }
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrations::IntegrationError;
    use crate::integrations::NewCalendarEvent;
    use async_trait::async_trait;
    use chrono::TimeZone;

    struct FixedCalendar(Result<Vec<CalendarEvent>, IntegrationError>);

    #[async_trait]
    impl CalendarSource for FixedCalendar {
        async fn list_events(
            &self,
            _start: DateTime<Utc>,
            _end: DateTime<Utc>,
        ) -> Result<Vec<CalendarEvent>, IntegrationError> {
            self.0.clone()
        }

        async fn timezone(&self) -> Result<String, IntegrationError> {
            Ok("UTC".to_string())
        }

        async fn create_event(&self, _event: &NewCalendarEvent) -> Result<String, IntegrationError> {
            Ok("id".to_string())
        }
    }

    /// Calendar with no events in the given zone
    struct ZonedCalendar(&'static str);

    #[async_trait]
    impl CalendarSource for ZonedCalendar {
        async fn list_events(
            &self,
            _start: DateTime<Utc>,
            _end: DateTime<Utc>,
        ) -> Result<Vec<CalendarEvent>, IntegrationError> {
            Ok(Vec::new())
        }

        async fn timezone(&self) -> Result<String, IntegrationError> {
            Ok(self.0.to_string())
        }

        async fn create_event(&self, _event: &NewCalendarEvent) -> Result<String, IntegrationError> {
            Ok("id".to_string())
        }
    }

    struct FixedTasks(Result<Vec<Task>, IntegrationError>);

    #[async_trait]
    impl TaskSource for FixedTasks {
        async fn list_tasks(&self) -> Result<Vec<Task>, IntegrationError> {
            self.0.clone()
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
    }

    fn event(day: u32, hour: u32, title: &str) -> CalendarEvent {
        CalendarEvent {
            start: Utc.with_ymd_and_hms(2026, 10, day, hour, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2026, 10, day, hour + 1, 0, 0).unwrap(),
            title: title.to_string(),
            description: None,
            location: None,
            all_day: false,
        }
    }

    #[test]
    fn test_classify_task_boundaries() {
        let due_today = Task::new("a").due_on(today());
        let overdue = Task::new("b").due_on(today().pred_opt().unwrap());
        let tomorrow = Task::new("c").due_on(today().succ_opt().unwrap());
        let undated = Task::new("d");

        assert_eq!(classify_task(&due_today, today()), TaskBucket::Urgent);
        assert_eq!(classify_task(&overdue, today()), TaskBucket::Urgent);
        assert_eq!(classify_task(&tomorrow, today()), TaskBucket::Excluded);
        assert_eq!(classify_task(&undated, today()), TaskBucket::Backlog);
    }

    #[test]
    fn test_summarize_calendar_splits_on_now() {
        let mut meeting = event(19, 9, "[meeting] Design sync");
        meeting.location = Some("Room 4".to_string());
        let events = vec![meeting, event(17, 15, "WORK: Report")];

        let (momentum, constraints) = summarize_calendar(&events, now(), Tz::UTC, 3, 7);

        assert_eq!(
            momentum,
            "**Past Events (Momentum - Last 3 days, UTC time):**\n- 2026-10-17 15:00: [work] Report"
        );
        assert_eq!(
            constraints,
            "**Future Events (Constraints - Next 7 days, UTC time):**\n- 2026-10-19 09:00: [meeting] Design sync @ Room 4"
        );
    }

    #[test]
    fn test_event_at_now_is_a_constraint() {
        let events = vec![event(18, 12, "Lunch")];
        let (momentum, constraints) = summarize_calendar(&events, now(), Tz::UTC, 3, 7);
        assert!(momentum.contains("No past events."));
        assert!(constraints.contains("Lunch"));
    }

    #[test]
    fn test_event_times_render_in_calendar_timezone() {
        // 16:00 UTC is 09:00 in Los Angeles (PDT, UTC-7)
        let events = vec![event(19, 16, "MEETING: Team sync")];
        let (_, constraints) =
            summarize_calendar(&events, now(), chrono_tz::America::Los_Angeles, 3, 7);
        assert_eq!(
            constraints,
            "**Future Events (Constraints - Next 7 days, America/Los_Angeles time):**\n- 2026-10-19 09:00: [meeting] Team sync"
        );
    }

    #[test]
    fn test_all_day_events_split_on_local_date() {
        let mut yesterday = event(17, 0, "Offsite");
        yesterday.all_day = true;
        let mut today_event = event(18, 0, "Conference");
        today_event.all_day = true;

        let (momentum, constraints) =
            summarize_calendar(&[yesterday, today_event], now(), Tz::UTC, 3, 7);

        assert!(momentum.contains("- 2026-10-17 (all day): Offsite"));
        assert!(constraints.contains("- 2026-10-18 (all day): Conference"));
    }

    #[test]
    fn test_long_event_description_is_truncated() {
        let mut e = event(19, 9, "Review");
        e.description = Some("x".repeat(150));
        let (_, constraints) = summarize_calendar(&[e], now(), Tz::UTC, 3, 7);
        assert!(constraints.ends_with(&format!(" | {}...", "x".repeat(100))));
    }

    #[test]
    fn test_summarize_tasks_formats_buckets() {
        let mut urgent = Task::new("File taxes").due_on(today());
        urgent.priority = 4;
        urgent.labels = vec!["admin".to_string(), "money".to_string()];
        let overdue = Task::new("Return library book").due_on(NaiveDate::from_ymd_opt(2026, 10, 15).unwrap());
        let future = Task::new("Dentist").due_on(NaiveDate::from_ymd_opt(2026, 10, 19).unwrap());
        let mut backlog = Task::new("Learn Rust");
        backlog.description = Some("Chapter 4".to_string());

        let summary = summarize_tasks(&[urgent, overdue, future, backlog], today());

        assert!(summary.contains("- File taxes [P1] #admin, #money [Due TODAY]"));
        assert!(summary.contains("- Return library book [OVERDUE by 3 days]"));
        assert!(summary.contains("- Learn Rust | Chapter 4 [No due date]"));
        assert!(!summary.contains("Dentist"));
    }

    #[tokio::test]
    async fn test_gather_is_idempotent() {
        let aggregator = ContextAggregator::new(
            Arc::new(FixedCalendar(Ok(vec![event(19, 9, "Standup")]))),
            Arc::new(FixedTasks(Ok(vec![Task::new("Write").due_on(today())]))),
        );
        let first = aggregator.gather_at(now(), 3, 7).await;
        let second = aggregator.gather_at(now(), 3, 7).await;
        assert_eq!(first, second);
        assert!(first.caveats.is_empty());
    }

    #[tokio::test]
    async fn test_source_failures_degrade_to_markers() {
        let aggregator = ContextAggregator::new(
            Arc::new(FixedCalendar(Err(IntegrationError::SourceUnavailable(
                "timeout".to_string(),
            )))),
            Arc::new(FixedTasks(Err(IntegrationError::MissingCredentials(
                "TODOIST_API_TOKEN",
            )))),
        );
        let snapshot = aggregator.gather_at(now(), 3, 7).await;

        assert!(snapshot
            .momentum_summary
            .starts_with("Error fetching calendar events:"));
        assert_eq!(snapshot.momentum_summary, snapshot.constraint_summary);
        assert!(snapshot.task_summary.starts_with("Error fetching tasks:"));
        assert_eq!(snapshot.caveats.len(), 2);
        assert!(snapshot.caveats[0].starts_with("Calendar"));
    }

    #[tokio::test]
    async fn test_today_is_taken_in_calendar_timezone() {
        // 12:00 UTC on the 18th is already the 19th in Auckland
        let tomorrow_utc = today().succ_opt().unwrap();
        let aggregator = ContextAggregator::new(
            Arc::new(ZonedCalendar("Pacific/Auckland")),
            Arc::new(FixedTasks(Ok(vec![Task::new("Pay rent").due_on(tomorrow_utc)]))),
        );

        let snapshot = aggregator.gather_at(now(), 3, 7).await;

        assert!(snapshot.task_summary.contains("- Pay rent [Due TODAY]"));
        assert!(snapshot
            .constraint_summary
            .contains("Pacific/Auckland time"));
        assert!(snapshot.caveats.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_timezone_renders_in_utc_with_caveat() {
        let aggregator = ContextAggregator::new(
            Arc::new(ZonedCalendar("Mars/Olympus_Mons")),
            Arc::new(FixedTasks(Ok(Vec::new()))),
        );

        let snapshot = aggregator.refresh_calendar_at(now(), 3, 7).await;

        assert_eq!(snapshot.timezone, Tz::UTC);
        assert_eq!(snapshot.caveats.len(), 1);
        assert!(snapshot.caveats[0].contains("Mars/Olympus_Mons"));
    }
}
