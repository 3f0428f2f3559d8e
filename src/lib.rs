//! arbitrage-api: liquidation manifest analysis pipeline.
//!
//! Ingests supplier manifest CSVs in heterogeneous layouts, normalizes
//! them, attaches an AI-or-heuristic resale assessment and live
//! marketplace pricing per item, and aggregates the results into a
//! manifest-level financial summary behind a small axum surface.

pub mod analysis;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod ingest;
pub mod marketplace;
pub mod migrator;
pub mod pipeline;
pub mod services;

use std::sync::Arc;

use axum::{Json, Router};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use utoipa::ToSchema;

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub pipeline: Arc<pipeline::Pipeline>,
}

/// Standard success envelope returned by every endpoint.
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub timestamp: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

/// All v1 API routes, to be nested under `/api/v1`.
pub fn api_v1_routes() -> Router<AppState> {
    Router::new().nest("/manifests", handlers::manifest_routes())
}

/// Builds the pipeline from configuration: AI backend when a key is
/// present, marketplaces when credentials are present, heuristics always.
pub fn build_pipeline(cfg: &config::AppConfig) -> pipeline::Pipeline {
    let backend = analysis::ChatCompletionsBackend::from_config(&cfg.ai)
        .map(|b| Arc::new(b) as Arc<dyn analysis::AiBackend>);
    let engine = analysis::AnalysisEngine::new(backend, &cfg.ai);
    let enricher = marketplace::MarketplaceEnricher::from_config(&cfg.marketplace);
    pipeline::Pipeline::new(engine, enricher, &cfg.pipeline)
}

/// Composes the full application router over the given state.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .merge(handlers::health_routes())
        .nest("/api/v1", api_v1_routes())
        .with_state(state)
}
