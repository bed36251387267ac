//! Shared test doubles
//!
//! A scripted reasoning oracle and in-memory calendar/task sources. The
//! oracle feeds its canned text through the same parsers the Gemini oracle
//! uses, so malformed scripts behave exactly like malformed model output.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use day_planner::integrations::{
    CalendarEvent, CalendarSource, IntegrationError, NewCalendarEvent, Task, TaskSource,
};
use day_planner::orchestrator::oracle::{parse_plan, single_question};
use day_planner::orchestrator::{
    Assessment, ContextAggregator, OracleContext, OracleError, Orchestrator, PlanDraft,
    ReasoningOracle,
};
use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};

/// One scripted oracle reply
#[derive(Debug, Clone)]
pub enum Reply {
    /// Raw response text
    Text(String),
    /// The service is down
    Unavailable,
}

/// Which capability was called
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    Assess,
    Clarify,
    Plan,
}

#[derive(Default)]
struct Script {
    assess: VecDeque<Reply>,
    clarify: VecDeque<Reply>,
    plan: VecDeque<Reply>,
    calls: Vec<(Call, OracleContext)>,
}

/// Oracle that replays queued replies per capability
///
/// When a queue has one reply left it is repeated for every later call.
#[derive(Clone, Default)]
pub struct ScriptedOracle {
    script: Arc<Mutex<Script>>,
}

impl ScriptedOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assess_with(self, reply: Reply) -> Self {
        self.script.lock().unwrap().assess.push_back(reply);
        self
    }

    pub fn clarify_with(self, reply: Reply) -> Self {
        self.script.lock().unwrap().clarify.push_back(reply);
        self
    }

    pub fn plan_with(self, reply: Reply) -> Self {
        self.script.lock().unwrap().plan.push_back(reply);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.script
            .lock()
            .unwrap()
            .calls
            .iter()
            .map(|(call, _)| *call)
            .collect()
    }

    pub fn contexts(&self, kind: Call) -> Vec<OracleContext> {
        self.script
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|(call, _)| *call == kind)
            .map(|(_, ctx)| ctx.clone())
            .collect()
    }

    pub fn count(&self, kind: Call) -> usize {
        self.calls().into_iter().filter(|c| *c == kind).count()
    }

    fn next(&self, kind: Call, ctx: &OracleContext) -> Result<String, OracleError> {
        let mut script = self.script.lock().unwrap();
        script.calls.push((kind, ctx.clone()));
        let queue = match kind {
            Call::Assess => &mut script.assess,
            Call::Clarify => &mut script.clarify,
            Call::Plan => &mut script.plan,
        };
        let reply = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        };
        match reply {
            Some(Reply::Text(text)) => Ok(text),
            Some(Reply::Unavailable) => Err(OracleError::Unavailable {
                attempts: 3,
                message: "HTTP 503".to_string(),
            }),
            None => panic!("no scripted reply for {:?}", kind),
        }
    }
}

#[async_trait]
impl ReasoningOracle for ScriptedOracle {
    async fn assess(&self, ctx: &OracleContext) -> Result<Assessment, OracleError> {
        let raw = self.next(Call::Assess, ctx)?;
        Assessment::parse(&raw)
    }

    async fn clarify(
        &self,
        _missing_info: &str,
        ctx: &OracleContext,
    ) -> Result<String, OracleError> {
        let raw = self.next(Call::Clarify, ctx)?;
        single_question(&raw)
    }

    async fn plan(&self, ctx: &OracleContext, _analysis: &str) -> Result<PlanDraft, OracleError> {
        let raw = self.next(Call::Plan, ctx)?;
        parse_plan(&raw)
    }
}

/// Assessment reply JSON
pub fn assessment(confidence: f64, missing_info: &str) -> Reply {
    Reply::Text(
        serde_json::json!({
            "confidence": confidence,
            "analysis": format!("Assessed at {}", confidence),
            "missing_info": missing_info,
        })
        .to_string(),
    )
}

/// Plan reply JSON; each block is `(start, end, title, category)`
pub fn plan_reply(blocks: &[(String, String, &str, &str)]) -> Reply {
    let blocks: Vec<_> = blocks
        .iter()
        .map(|(start, end, title, category)| {
            serde_json::json!({
                "start": start,
                "end": end,
                "title": title,
                "priority": "P1",
                "category": category,
                "energy_level": "high",
                "cognitive_load": "medium",
                "tags": ["focus"],
                "rationale": "Fits the morning",
            })
        })
        .collect();
    Reply::Text(
        serde_json::json!({ "blocks": blocks, "metadata": "Front-load deep work" }).to_string(),
    )
}

#[derive(Default)]
struct CalendarInner {
    events: Vec<CalendarEvent>,
    written: Vec<NewCalendarEvent>,
    list_calls: usize,
}

/// In-memory calendar
#[derive(Clone, Default)]
pub struct MemoryCalendar {
    inner: Arc<Mutex<CalendarInner>>,
    timezone: Option<String>,
    unavailable: bool,
    reject_titles: Arc<HashSet<String>>,
}

impl MemoryCalendar {
    pub fn new() -> Self {
        Self {
            timezone: Some(CALENDAR_TZ.name().to_string()),
            ..Default::default()
        }
    }

    pub fn with_event(self, event: CalendarEvent) -> Self {
        self.inner.lock().unwrap().events.push(event);
        self
    }

    /// Writes of entries with these titles fail
    pub fn rejecting(mut self, titles: &[&str]) -> Self {
        self.reject_titles = Arc::new(titles.iter().map(|t| t.to_string()).collect());
        self
    }

    pub fn without_timezone(mut self) -> Self {
        self.timezone = None;
        self
    }

    pub fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }

    pub fn written(&self) -> Vec<NewCalendarEvent> {
        self.inner.lock().unwrap().written.clone()
    }

    pub fn list_calls(&self) -> usize {
        self.inner.lock().unwrap().list_calls
    }
}

#[async_trait]
impl CalendarSource for MemoryCalendar {
    async fn list_events(
        &self,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>, IntegrationError> {
        let mut inner = self.inner.lock().unwrap();
        inner.list_calls += 1;
        if self.unavailable {
            return Err(IntegrationError::SourceUnavailable(
                "calendar offline".to_string(),
            ));
        }
        let mut events: Vec<_> = inner
            .events
            .iter()
            .filter(|e| e.end >= window_start && e.start <= window_end)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.start);
        Ok(events)
    }

    async fn timezone(&self) -> Result<String, IntegrationError> {
        self.timezone
            .clone()
            .ok_or_else(|| IntegrationError::SourceUnavailable("no settings".to_string()))
    }

    async fn create_event(&self, event: &NewCalendarEvent) -> Result<String, IntegrationError> {
        if self.reject_titles.contains(&event.title) {
            return Err(IntegrationError::CalendarWrite(format!(
                "Google Calendar returned HTTP 500: could not create '{}'",
                event.title
            )));
        }
        let mut inner = self.inner.lock().unwrap();
        inner.written.push(event.clone());
        Ok(format!("gcal-{}", inner.written.len()))
    }
}

/// In-memory task list
#[derive(Clone, Default)]
pub struct MemoryTasks {
    tasks: Vec<Task>,
    unavailable: bool,
}

impl MemoryTasks {
    pub fn new(tasks: Vec<Task>) -> Self {
        Self {
            tasks,
            unavailable: false,
        }
    }

    pub fn unavailable() -> Self {
        Self {
            tasks: Vec::new(),
            unavailable: true,
        }
    }
}

#[async_trait]
impl TaskSource for MemoryTasks {
    async fn list_tasks(&self) -> Result<Vec<Task>, IntegrationError> {
        if self.unavailable {
            Err(IntegrationError::SourceUnavailable(
                "Todoist returned HTTP 401: unauthorized".to_string(),
            ))
        } else {
            Ok(self.tasks.clone())
        }
    }
}

/// Event tomorrow between the given local hours
pub fn event_tomorrow(title: &str, start_hour: u32, end_hour: u32) -> CalendarEvent {
    let tomorrow = Utc::now().date_naive() + Duration::days(1);
    let at = |hour: u32| tomorrow.and_hms_opt(hour, 0, 0).unwrap().and_utc();
    CalendarEvent {
        start: at(start_hour),
        end: at(end_hour),
        title: title.to_string(),
        description: None,
        location: None,
        all_day: false,
    }
}

/// Zone [`MemoryCalendar::new`] reports
pub const CALENDAR_TZ: chrono_tz::Tz = chrono_tz::Europe::Berlin;

/// Task due today in the calendar's timezone
pub fn task_due_today(content: &str) -> Task {
    let today = Utc::now().with_timezone(&CALENDAR_TZ).date_naive();
    let mut task = Task::new(content).due_on(today);
    task.priority = 4;
    task
}

/// `YYYY-MM-DD HH:MM` for tomorrow at `hour`, calendar-local
pub fn tomorrow_at(hour: u32) -> String {
    let tomorrow = Utc::now().with_timezone(&CALENDAR_TZ).date_naive() + Duration::days(1);
    let time: NaiveDateTime = tomorrow.and_hms_opt(hour, 0, 0).unwrap();
    time.format("%Y-%m-%d %H:%M").to_string()
}

/// Orchestrator over the given doubles
pub fn orchestrator(
    oracle: &ScriptedOracle,
    calendar: &MemoryCalendar,
    tasks: &MemoryTasks,
) -> Orchestrator {
    let aggregator = ContextAggregator::new(Arc::new(calendar.clone()), Arc::new(tasks.clone()));
    Orchestrator::new(Arc::new(oracle.clone()), aggregator)
}
