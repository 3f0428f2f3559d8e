//! Liveness and readiness reporting.

use axum::{extract::State, response::Json, routing::get, Router};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::AppState;

/// Component health status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Up,
    Down,
}

/// Health check payload.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub version: String,
    pub database: ComponentStatus,
    /// Number of marketplaces with configured credentials
    pub marketplaces: usize,
    pub timestamp: String,
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

/// Service health: reports overall and per-component status. Always
/// returns 200; consumers read the body for degraded components.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health report", body = HealthResponse)
    ),
    tag = "Health"
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = match crate::db::check_connection(&state.db).await {
        Ok(()) => ComponentStatus::Up,
        Err(_) => ComponentStatus::Down,
    };

    Json(HealthResponse {
        status: database,
        version: env!("CARGO_PKG_VERSION").to_string(),
        database,
        marketplaces: state.pipeline.marketplace_count(),
        timestamp: Utc::now().to_rfc3339(),
    })
}
