//! Day Planner Backend
//!
//! A REST API server for confidence-gated daily planning: it reads calendar
//! and task context, asks clarifying questions until the reasoning oracle is
//! confident, proposes a schedule and writes the approved entries back to the
//! calendar.

use axum::{
    extract::Request,
    middleware::Next,
    response::Response,
    routing::{get, post},
    Json, Router,
};
use day_planner::api;
use day_planner::config::Config;
use day_planner::integrations::{GoogleCalendarClient, TodoistClient};
use day_planner::orchestrator::ContextAggregator;
use day_planner::state::{AppState, GeminiSettings, SessionDb};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    message: String,
}

/// Request ID middleware - adds unique ID to each request for tracing
async fn request_id_middleware(request: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let span = info_span!(
        "request",
        request_id = %request_id,
        method = %method,
        uri = %uri,
    );

    let response = next.run(request).instrument(span).await;

    let duration = start.elapsed();
    info!(
        request_id = %request_id,
        method = %method,
        uri = %uri,
        status = %response.status().as_u16(),
        duration_ms = duration.as_millis(),
        "Request completed"
    );

    response
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load configuration
    let config = Config::from_env();
    config
        .planner
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid planner configuration: {}", e))?;
    info!("Configuration loaded: {:?}", config);

    if config.credentials.gemini_api_key.is_empty() {
        warn!("GEMINI_API_KEY is not set; planning sessions will fail at assessment");
    }

    // Data sources and oracle share one HTTP client
    let http = reqwest::Client::new();
    let calendar = GoogleCalendarClient::new(
        http.clone(),
        config.credentials.google_calendar_token.clone(),
        config.credentials.google_calendar_id.clone(),
    );
    let tasks = TodoistClient::new(http.clone(), config.credentials.todoist_api_token.clone());
    let aggregator = ContextAggregator::new(Arc::new(calendar), Arc::new(tasks));

    let mut app_state = AppState::with_gemini(
        GeminiSettings {
            http,
            api_key: config.credentials.gemini_api_key.clone(),
        },
        aggregator,
        config.planner.clone(),
    );

    // Persisted sessions survive restarts; without a database they live in memory only
    match SessionDb::new(&config.persistence.database_path).await {
        Ok(db) => {
            app_state = app_state.with_db(db);
            match app_state.load_sessions().await {
                Ok(count) => info!(
                    "Loaded {} sessions from {}",
                    count, config.persistence.database_path
                ),
                Err(e) => warn!("Failed to load sessions: {}", e),
            }
        }
        Err(e) => warn!("Session persistence disabled: {}", e),
    }

    let app_state = Arc::new(RwLock::new(app_state));

    // Build our application with routes
    let app = Router::new()
        .route("/api/health", get(health_check))
        // Planning sessions
        .route(
            "/api/sessions",
            get(api::sessions::list_sessions).post(api::sessions::create_session),
        )
        .route(
            "/api/sessions/:id",
            get(api::sessions::get_session).delete(api::sessions::delete_session),
        )
        .route(
            "/api/sessions/:id/answer",
            post(api::sessions::answer_session),
        )
        .route(
            "/api/sessions/:id/approve",
            post(api::sessions::approve_session),
        )
        .route(
            "/api/sessions/:id/decline",
            post(api::sessions::decline_session),
        )
        .route(
            "/api/sessions/:id/report",
            get(api::sessions::session_report),
        )
        // Settings
        .route(
            "/api/config",
            get(api::settings::get_config).post(api::settings::update_config),
        )
        .route("/api/diagnostics", get(api::diagnostics::diagnostics))
        // Middleware (order matters - request_id should be first)
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }),
        )
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Bind to address from config
    let addr: SocketAddr = config
        .server_addr()
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid server address: {}", e))?;

    info!("🚀 Server running on http://{}", addr);
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    // Setup graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Handle graceful shutdown signals (Ctrl+C, SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down gracefully...");
        },
        _ = terminate => {
            info!("Received SIGTERM, shutting down gracefully...");
        },
    }
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        message: "Day planner is healthy".to_string(),
    })
}
