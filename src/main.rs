//! lead-rotator server entry point.
//!
//! Starts the Axum HTTP server with REST and WebSocket endpoints.

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use lead_rotator::api;
use lead_rotator::app_state::AppState;
use lead_rotator::config::{LogFormat, RotatorConfig};
use lead_rotator::domain::EventBus;
use lead_rotator::persistence::PostgresStore;
use lead_rotator::service::AssignmentService;
use lead_rotator::store::{MemoryStore, RotationStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = RotatorConfig::from_env()?;
    init_tracing(config.log_format);
    tracing::info!(addr = %config.listen_addr, "starting lead-rotator");

    let store: Arc<dyn RotationStore> = if config.persistence_enabled {
        let store = PostgresStore::connect(&config)
            .await
            .context("connecting to PostgreSQL")?;
        tracing::info!("using PostgreSQL store");
        Arc::new(store)
    } else {
        tracing::info!("persistence disabled, using in-memory store");
        Arc::new(MemoryStore::with_cursor_lock_timeout(
            config.cursor_lock_timeout(),
        ))
    };

    let event_bus = EventBus::new(config.event_bus_capacity);
    let assignment_service = AssignmentService::new(Arc::clone(&store), event_bus.clone())
        .with_lead_write_retry(config.lead_write_max_attempts, config.lead_write_backoff());
    let app_state =
        AppState::new(store, event_bus).with_assignment_service(assignment_service);

    let app = api::build_app(app_state, config.request_timeout());

    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
    }
}
