use axum::extract::State;
use axum::{routing::get, Json, Router};
use rkids_core::types::Timestamp;
use serde::Serialize;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// `ok` when the database answers, `degraded` otherwise.
    pub status: &'static str,
    pub timestamp: Timestamp,
    /// `connected` or `disconnected`.
    pub database: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
}

/// GET /health -- returns service and database health.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let db_healthy = rkids_db::health_check(&state.pool).await.is_ok();
    if !db_healthy {
        tracing::warn!("Health check could not reach the database");
    }

    Json(HealthResponse {
        status: if db_healthy { "ok" } else { "degraded" },
        timestamp: chrono::Utc::now(),
        database: if db_healthy { "connected" } else { "disconnected" },
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Mount the health check. Served at `/api/health` alongside the API tree.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
