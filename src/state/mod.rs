// State management module
// Handles the session registry and session persistence

pub mod app_state;
pub mod persistence;

pub use app_state::{AppState, GeminiSettings, SessionHandle, SessionId};
pub use persistence::{PersistenceError, SessionDb};
