//! API module
//!
//! Contains HTTP request handlers for planning sessions, planner settings
//! and source diagnostics

pub mod diagnostics;
pub mod sessions;
pub mod settings;
pub mod utils;
