use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Overall service status.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    /// Whether the database is reachable.
    pub db_healthy: bool,
    /// Whether a marketplace endpoint is configured.
    pub marketplace_configured: bool,
    /// Whether an email channel is configured.
    pub email_configured: bool,
}

/// GET /health -- returns service, database and integration health.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let db_healthy = millwright_db::health_check(&state.pool).await.is_ok();

    let status = if db_healthy { "ok" } else { "degraded" };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        db_healthy,
        marketplace_configured: state.marketplace.is_configured(),
        email_configured: state.email.is_some(),
    })
}

/// Mount health check routes (intended for root-level, NOT under `/api/v1`).
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
