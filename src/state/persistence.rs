//! Session persistence
//!
//! Stores each planning session as a JSON snapshot in SQLite. Snapshots are
//! rewritten after every operation and reloaded at startup.

use crate::orchestrator::{Phase, PlanningSession};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Error types for persistence operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PersistenceError {
    /// Database connection or query error
    #[error("Database error: {0}")]
    Database(String),
    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(String),
    /// File I/O error
    #[error("IO error: {0}")]
    Io(String),
}

impl From<sqlx::Error> for PersistenceError {
    fn from(e: sqlx::Error) -> Self {
        PersistenceError::Database(e.to_string())
    }
}

/// SQLite store for planning sessions
#[derive(Debug, Clone)]
pub struct SessionDb {
    pool: SqlitePool,
}

impl SessionDb {
    /// Open (or create) the session database
    ///
    /// # Arguments
    /// * `db_path` - Path to the SQLite database file
    ///
    /// # Returns
    /// * `Ok(SessionDb)` if successful
    /// * `Err(PersistenceError)` if the database could not be opened or migrated
    pub async fn new(db_path: &str) -> Result<Self, PersistenceError> {
        if let Some(parent) = PathBuf::from(db_path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    PersistenceError::Io(format!("Failed to create db directory: {}", e))
                })?;
            }
        }

        let connection_string = if db_path.starts_with("sqlite:") {
            db_path.to_string()
        } else {
            format!("sqlite:{}", db_path)
        };

        let options = SqliteConnectOptions::from_str(&connection_string)?.create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        info!("Connected to session database at: {}", db_path);

        let db = Self { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    async fn run_migrations(&self) -> Result<(), PersistenceError> {
        let migration_sql = include_str!("../../migrations/001_create_sessions.sql");

        let mut cleaned_sql = String::new();
        for line in migration_sql.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with("--") {
                continue;
            }
            let without_comment = match trimmed.find("--") {
                Some(pos) => &trimmed[..pos],
                None => trimmed,
            };
            cleaned_sql.push_str(without_comment.trim());
            cleaned_sql.push(' ');
        }

        for statement in cleaned_sql.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    PersistenceError::Database(format!(
                        "Migration failed: {} - Statement: {}",
                        e,
                        statement.chars().take(100).collect::<String>()
                    ))
                })?;
        }

        debug!("Session database migrations completed");
        Ok(())
    }

    /// Insert or replace a session snapshot
    pub async fn save(&self, session: &PlanningSession) -> Result<(), PersistenceError> {
        let state_json =
            serde_json::to_string(session).map_err(|e| PersistenceError::Json(e.to_string()))?;

        sqlx::query(
            "INSERT INTO planning_sessions (id, phase, intent, state_json, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?) \
             ON CONFLICT(id) DO UPDATE SET phase = excluded.phase, intent = excluded.intent, \
             state_json = excluded.state_json, updated_at = excluded.updated_at",
        )
        .bind(&session.id)
        .bind(session.phase.as_str())
        .bind(&session.state.user_intent)
        .bind(&state_json)
        .bind(session.created_at.timestamp())
        .bind(session.updated_at.timestamp())
        .execute(&self.pool)
        .await?;

        debug!(session_id = %session.id, phase = %session.phase, "Saved session snapshot");
        Ok(())
    }

    /// Load every stored session, oldest first
    ///
    /// Rows with an unknown phase, a snapshot that no longer deserializes, or
    /// a snapshot whose phase disagrees with the `phase` column are skipped
    /// with a warning.
    pub async fn load_all(&self) -> Result<Vec<PlanningSession>, PersistenceError> {
        let rows = sqlx::query(
            "SELECT id, phase, state_json FROM planning_sessions ORDER BY created_at",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut sessions = Vec::with_capacity(rows.len());
        for row in rows {
            let id: String = row.try_get("id")?;
            let phase_name: String = row.try_get("phase")?;
            let state_json: String = row.try_get("state_json")?;

            let Some(phase) = Phase::parse(&phase_name) else {
                warn!(session_id = %id, phase = %phase_name, "Skipping session with unknown phase");
                continue;
            };
            match serde_json::from_str::<PlanningSession>(&state_json) {
                Ok(session) if session.phase == phase => sessions.push(session),
                Ok(session) => warn!(
                    session_id = %id,
                    column_phase = %phase,
                    snapshot_phase = %session.phase,
                    "Skipping session whose snapshot disagrees with its phase"
                ),
                Err(e) => warn!(session_id = %id, error = %e, "Skipping unreadable session snapshot"),
            }
        }
        Ok(sessions)
    }

    /// Delete a session snapshot
    pub async fn delete(&self, id: &str) -> Result<(), PersistenceError> {
        sqlx::query("DELETE FROM planning_sessions WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
