//! Orchestrator module
//!
//! The confidence-gated planning loop: gather calendar and task context, ask
//! the reasoning oracle how confident it is, clarify until confident (or out of
//! clarifications), plan, materialize proposed calendar entries and commit the
//! subset the user approves.
//!
//! The oracle sits behind [`ReasoningOracle`] and the data sources behind the
//! traits in [`crate::integrations`], so the state machine can be driven with
//! scripted doubles.

pub mod api_client;
pub mod commit;
pub mod config;
pub mod constants;
pub mod context;
pub mod error;
pub mod gemini_oracle;
pub mod gemini_types;
pub mod machine;
pub mod materializer;
pub mod oracle;
pub mod plan_types;
pub mod prompts;
pub mod report;
pub mod state;
pub mod utils;

pub use commit::{CommitGate, CommitReport};
pub use config::{ConfigUpdateRequest, PlannerConfig};
pub use context::ContextAggregator;
pub use error::OrchestratorError;
pub use gemini_oracle::GeminiOracle;
pub use machine::{Event, Orchestrator, PlanningSession};
pub use materializer::ProposedEntry;
pub use oracle::{Assessment, OracleContext, OracleError, ReasoningOracle};
pub use plan_types::{PlanDraft, ScheduleBlock};
pub use state::{Phase, SessionState, Turn, TurnRole};
