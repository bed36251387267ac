//! Diagnostic binary for checking the planner's external services
//! This is a utility binary, not part of the main application

use day_planner::api::diagnostics::{probe_sources, ProbeResult};
use day_planner::config::Config;
use day_planner::integrations::{GoogleCalendarClient, TodoistClient};
use day_planner::orchestrator::ContextAggregator;
use day_planner::orchestrator::GeminiOracle;
use std::sync::Arc;

fn report(step: usize, label: &str, result: &ProbeResult) {
    println!("\n{}. {}...", step, label);
    if result.ok {
        println!("   ✓ {}", result.detail);
    } else {
        eprintln!("   ✗ {}", result.detail);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::from_env();
    println!("Checking day planner services...");
    println!("   Calendar: {}", config.credentials.google_calendar_id);
    println!(
        "   Window: {} day(s) back, {} day(s) ahead",
        config.planner.lookback_days, config.planner.lookahead_days
    );

    let http = reqwest::Client::new();
    let aggregator = ContextAggregator::new(
        Arc::new(GoogleCalendarClient::new(
            http.clone(),
            config.credentials.google_calendar_token.clone(),
            config.credentials.google_calendar_id.clone(),
        )),
        Arc::new(TodoistClient::new(
            http.clone(),
            config.credentials.todoist_api_token.clone(),
        )),
    );

    let probes = probe_sources(&aggregator, &config.planner).await;
    report(1, "Reading calendar timezone", &probes.calendar_timezone);
    report(2, "Listing calendar events", &probes.calendar_events);
    report(3, "Listing tasks", &probes.tasks);

    let oracle = GeminiOracle::from_config(
        http,
        config.credentials.gemini_api_key.clone(),
        &config.planner,
    );
    println!("\n4. Sending a test prompt to {}...", oracle.client().model());
    let oracle_ok = if !oracle.client().has_api_key() {
        eprintln!("   ⚠ GEMINI_API_KEY not found in environment");
        false
    } else {
        match oracle
            .complete("diagnose", "Reply with the single word: ready", false)
            .await
        {
            Ok(text) => {
                println!("   ✓ Response: {}", text.trim());
                true
            }
            Err(e) => {
                eprintln!("   ✗ {}", e);
                false
            }
        }
    };

    if probes.all_ok() && oracle_ok {
        println!("\n✓ All checks passed");
        Ok(())
    } else {
        Err(anyhow::anyhow!("One or more checks failed"))
    }
}
