//! Orchestrator error types
//!
//! Errors returned to callers of the planning session API. Oracle and source
//! failures are not here: the state machine absorbs them into the session
//! (caveats or the `FAILED` phase).

use crate::orchestrator::state::Phase;
use thiserror::Error;

/// Errors raised when a session operation is rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OrchestratorError {
    /// The operation is not valid in the session's current phase
    #[error("Cannot {operation} while session is {phase}")]
    InvalidPhase {
        /// Attempted operation
        operation: &'static str,
        /// Phase the session was in
        phase: Phase,
    },

    /// An approval named no entries
    #[error("Approval must select at least one entry; decline to finish without committing")]
    EmptySelection,

    /// An approval named entries that were never proposed
    #[error("Unknown entry ids: {}", .0.join(", "))]
    UnknownEntries(Vec<String>),
}
