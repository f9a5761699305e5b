//! Liveness endpoint.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::app_state::AppState;

/// Body of `GET /health`.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// `"healthy"` whenever the process answers.
    pub status: String,
    /// Server time.
    pub timestamp: DateTime<Utc>,
    /// Crate version.
    pub version: String,
    /// Open event-feed connections.
    pub feed_connections: usize,
}

/// `GET /health` — Liveness and feed load.
#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    summary = "Health check",
    description = "Answers while the process is up, with the crate version and the number of open event-feed connections.",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse),
    )
)]
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        feed_connections: state.event_bus.receiver_count(),
    })
}

/// Root-level system routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health_handler))
}
