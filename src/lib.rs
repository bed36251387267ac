//! Day Planner Backend Library
//!
//! This library exposes modules for testing and external use.
//! The main binary is in `src/main.rs`.

pub mod api;
pub mod config;
pub mod error;
pub mod integrations;
pub mod orchestrator;
/// Application state management
///
/// Handles the planning session registry and its SQLite persistence.
pub mod state;
