//! Application state
//!
//! Session registry shared by the HTTP handlers. Each session sits behind its
//! own async mutex, so a slow oracle call in one session never blocks another;
//! the registry lock is only held to look sessions up or insert them.

use crate::orchestrator::{
    ContextAggregator, GeminiOracle, Orchestrator, PlannerConfig, PlanningSession,
    ReasoningOracle,
};
use crate::state::persistence::{PersistenceError, SessionDb};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Unique identifier for a planning session
pub type SessionId = String;

/// Shared handle to one session
pub type SessionHandle = Arc<Mutex<PlanningSession>>;

/// Settings used to rebuild the Gemini oracle when the planner config changes
#[derive(Clone)]
pub struct GeminiSettings {
    /// Shared HTTP client
    pub http: reqwest::Client,
    /// Gemini API key
    pub api_key: String,
}

/// Main application state
#[derive(Clone)]
pub struct AppState {
    /// Sessions by id
    pub sessions: HashMap<SessionId, SessionHandle>,
    orchestrator: Orchestrator,
    planner_config: PlannerConfig,
    gemini: Option<GeminiSettings>,
    db: Option<SessionDb>,
}

impl AppState {
    /// Create state around an orchestrator
    pub fn new(orchestrator: Orchestrator, planner_config: PlannerConfig) -> Self {
        Self {
            sessions: HashMap::new(),
            orchestrator,
            planner_config,
            gemini: None,
            db: None,
        }
    }

    /// Build state backed by the Gemini oracle
    pub fn with_gemini(
        settings: GeminiSettings,
        aggregator: ContextAggregator,
        planner_config: PlannerConfig,
    ) -> Self {
        let oracle = GeminiOracle::from_config(
            settings.http.clone(),
            settings.api_key.clone(),
            &planner_config,
        );
        let orchestrator = Orchestrator::new(Arc::new(oracle), aggregator);
        let mut state = Self::new(orchestrator, planner_config);
        state.gemini = Some(settings);
        state
    }

    /// Attach a session database
    pub fn with_db(mut self, db: SessionDb) -> Self {
        self.db = Some(db);
        self
    }

    /// Orchestrator driving sessions
    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    /// Session database, if persistence is enabled
    pub fn db(&self) -> Option<&SessionDb> {
        self.db.as_ref()
    }

    /// Whether a Gemini API key is set; `None` when the oracle is not Gemini-backed
    pub fn gemini_key_configured(&self) -> Option<bool> {
        self.gemini.as_ref().map(|g| !g.api_key.trim().is_empty())
    }

    /// Planner configuration new sessions will snapshot
    pub fn planner_config(&self) -> &PlannerConfig {
        &self.planner_config
    }

    /// Replace the planner configuration
    ///
    /// Running sessions keep their snapshot. When the oracle is Gemini-backed
    /// it is rebuilt so model, timeout and retry changes take effect.
    pub fn set_planner_config(&mut self, config: PlannerConfig) {
        if let Some(settings) = &self.gemini {
            let oracle: Arc<dyn ReasoningOracle> = Arc::new(GeminiOracle::from_config(
                settings.http.clone(),
                settings.api_key.clone(),
                &config,
            ));
            self.orchestrator = Orchestrator::new(oracle, self.orchestrator.aggregator().clone());
        }
        self.planner_config = config;
    }

    /// Register a session, returning its handle
    pub fn insert_session(&mut self, session: PlanningSession) -> SessionHandle {
        let id = session.id.clone();
        let handle = Arc::new(Mutex::new(session));
        self.sessions.insert(id, handle.clone());
        handle
    }

    /// Look up a session handle
    pub fn session(&self, id: &str) -> Option<SessionHandle> {
        self.sessions.get(id).cloned()
    }

    /// Remove a session from the registry
    pub fn remove_session(&mut self, id: &str) -> Option<SessionHandle> {
        self.sessions.remove(id)
    }

    /// Reload persisted sessions into the registry
    ///
    /// # Returns
    /// * `Ok(usize)` - Number of sessions loaded
    /// * `Err(PersistenceError)` - The database could not be read
    pub async fn load_sessions(&mut self) -> Result<usize, PersistenceError> {
        let Some(db) = &self.db else {
            return Ok(0);
        };
        let sessions = db.load_all().await?;
        let count = sessions.len();
        for session in sessions {
            self.insert_session(session);
        }
        Ok(count)
    }
}
