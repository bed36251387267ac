//! Orchestrator constants
//!
//! Centralized constants used throughout the orchestrator module.

/// Prefix for proposed calendar entry ids
/// Format: "{ENTRY_ID_PREFIX}{1-based block index}"
pub const ENTRY_ID_PREFIX: &str = "evt_";

/// Maximum characters of an event description shown in calendar summaries
pub const EVENT_DESCRIPTION_LIMIT: usize = 100;

/// Maximum characters of a task description shown in task summaries
pub const TASK_DESCRIPTION_LIMIT: usize = 80;

/// Marker placed in calendar summaries when the calendar cannot be read
pub const CALENDAR_ERROR_PREFIX: &str = "Error fetching calendar events:";

/// Marker placed in the task summary when tasks cannot be read
pub const TASKS_ERROR_PREFIX: &str = "Error fetching tasks:";

/// Timezone used for commits when the calendar timezone cannot be read
pub const FALLBACK_TIMEZONE: &str = "UTC";

/// Upper bound on state machine steps per resumption
///
/// A full pass is gather, assess, clarify or plan; the cap leaves headroom
/// for the forced-planning and malformed-output retry paths.
pub const MAX_STEPS_PER_ADVANCE: usize = 16;

/// Assessment failures in a row before the session fails
pub const MAX_CONSECUTIVE_MALFORMED: u32 = 2;

/// Initial backoff between oracle retries in milliseconds (doubles per retry)
pub const ORACLE_INITIAL_BACKOFF_MS: u64 = 500;
