//! Application configuration
//!
//! Centralized configuration management with environment variable support
//! and sensible defaults.

use crate::orchestrator::PlannerConfig;
use std::env;
use std::fmt;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
    /// Persistence configuration
    pub persistence: PersistenceConfig,
    /// External service credentials
    pub credentials: Credentials,
    /// Planner knobs
    pub planner: PlannerConfig,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to bind the server to
    pub port: u16,
    /// Host address to bind to
    pub host: String,
}

/// Persistence configuration
#[derive(Debug, Clone)]
pub struct PersistenceConfig {
    /// SQLite database file for planning sessions
    pub database_path: String,
}

/// Credentials for the oracle, calendar and task services
///
/// Empty strings mean "not configured"; the affected source degrades instead
/// of failing startup.
#[derive(Clone, Default)]
pub struct Credentials {
    /// Gemini API key
    pub gemini_api_key: String,
    /// Google Calendar OAuth access token
    pub google_calendar_token: String,
    /// Google Calendar id
    pub google_calendar_id: String,
    /// Todoist API token
    pub todoist_api_token: String,
}

// Keep secrets out of the startup log
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mask = |s: &str| if s.is_empty() { "<unset>" } else { "<set>" };
        f.debug_struct("Credentials")
            .field("gemini_api_key", &mask(&self.gemini_api_key))
            .field("google_calendar_token", &mask(&self.google_calendar_token))
            .field("google_calendar_id", &self.google_calendar_id)
            .field("todoist_api_token", &mask(&self.todoist_api_token))
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        Self {
            server: ServerConfig {
                port: env::var("PORT")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(8080),
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            },
            persistence: PersistenceConfig {
                database_path: env::var("DATABASE_PATH").unwrap_or_else(|_| {
                    if let Some(home) = env::var_os("HOME") {
                        format!("{}/.day-planner/sessions.db", home.to_string_lossy())
                    } else {
                        ".day-planner/sessions.db".to_string()
                    }
                }),
            },
            credentials: Credentials {
                gemini_api_key: env::var("GEMINI_API_KEY").unwrap_or_default(),
                google_calendar_token: env::var("GOOGLE_CALENDAR_TOKEN").unwrap_or_default(),
                google_calendar_id: env::var("GOOGLE_CALENDAR_ID")
                    .unwrap_or_else(|_| "primary".to_string()),
                todoist_api_token: env::var("TODOIST_API_TOKEN").unwrap_or_default(),
            },
            planner: PlannerConfig::from_env(),
        }
    }

    /// Get the server address as a string
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_from_env_defaults_and_overrides() {
        env::remove_var("PORT");
        env::remove_var("HOST");
        env::set_var("DATABASE_PATH", "/tmp/planner-test.db");
        env::remove_var("GOOGLE_CALENDAR_ID");

        let config = Config::from_env();
        assert_eq!(config.server_addr(), "0.0.0.0:8080");
        assert_eq!(config.persistence.database_path, "/tmp/planner-test.db");
        assert_eq!(config.credentials.google_calendar_id, "primary");

        env::remove_var("DATABASE_PATH");
    }

    #[test]
    fn test_credentials_debug_masks_secrets() {
        let credentials = Credentials {
            gemini_api_key: "secret-key".to_string(),
            ..Default::default()
        };
        let rendered = format!("{:?}", credentials);
        assert!(!rendered.contains("secret-key"));
        assert!(rendered.contains("<set>"));
        assert!(rendered.contains("<unset>"));
    }
}
