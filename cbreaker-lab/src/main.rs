use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod simulation;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = config::Config::load()?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        breaker = %config.breaker_name,
        failure_threshold = config.breaker.failure_threshold,
        open_timeout_ms = config.breaker.open_timeout_ms(),
        retry_threshold = config.breaker.retry_threshold,
        "Configuration loaded"
    );

    let summary = simulation::run(&config).await?;

    tracing::info!(
        calls = summary.calls,
        succeeded = summary.succeeded,
        failed = summary.failed,
        short_circuited = summary.short_circuited,
        dependency_requests = summary.dependency_requests,
        transitions = summary.transitions.len(),
        final_state = %summary.final_state,
        "Simulation complete"
    );

    Ok(())
}
