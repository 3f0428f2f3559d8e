//! HTTP surface for the manifest analysis pipeline.

use std::collections::BTreeMap;
use std::str::FromStr;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::analysis::{Assessment, AssessmentSource, Demand};
use crate::entities::manifest_item;
use crate::errors::ServiceError;
use crate::ingest::{FormatId, Item, ItemFlags, RawManifest, SkippedRow};
use crate::pipeline::{aggregator, file_hash, AnalyzedItem, ChartData, ManifestSummary};
use crate::services::manifests::StoredAnalysis;
use crate::services::ManifestService;
use crate::{ApiResponse, ApiResult, AppState};

/// Build the manifest Router scoped under `/api/v1/manifests`.
pub fn manifest_routes() -> Router<AppState> {
    Router::new()
        .route("/analyze", post(analyze_manifest))
        .route("/:id", get(get_manifest).delete(delete_manifest))
}

/// Upload payload handed over by the transport layer.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AnalyzeManifestRequest {
    /// Raw CSV content
    #[validate(length(min = 1, message = "file content must not be empty"))]
    pub file: String,

    /// Original filename, for bookkeeping only
    #[validate(length(min = 1, message = "filename must not be empty"))]
    pub filename: String,
}

/// Completed analysis payload: summary, per-item results, and chart data.
#[derive(Debug, Serialize, ToSchema)]
pub struct ManifestAnalysisResponse {
    pub manifest_id: Uuid,
    pub filename: String,
    /// Detected supplier layout; absent when the response was rebuilt from
    /// storage (the mapping is not persisted)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<FormatId>,
    pub summary: ManifestSummary,
    pub items: Vec<AnalyzedItem>,
    pub charts: ChartData,
    pub skipped_rows: Vec<SkippedRow>,
    /// True when the run deadline expired and only a subset of items
    /// finished
    pub partial: bool,
    /// True when the response was served from a previously stored analysis
    /// of the same file content
    pub cached: bool,
    pub processed_at: DateTime<Utc>,
}

/// Analyze an uploaded manifest CSV end to end.
#[utoipa::path(
    post,
    path = "/api/v1/manifests/analyze",
    request_body = AnalyzeManifestRequest,
    responses(
        (status = 200, description = "Manifest analyzed successfully", body = ApiResponse<ManifestAnalysisResponse>),
        (status = 400, description = "Unrecognized or unreadable manifest", body = crate::errors::ErrorResponse)
    ),
    tag = "Manifests"
)]
pub async fn analyze_manifest(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeManifestRequest>,
) -> ApiResult<ManifestAnalysisResponse> {
    request.validate()?;

    let service = ManifestService::new(state.db.clone());
    let hash = file_hash(&request.file);

    if let Some(stored) = service.find_by_file_hash(&hash).await? {
        info!(filename = %request.filename, "answering manifest analysis from stored result");
        let response = response_from_stored(stored, &state, true);
        return Ok(Json(ApiResponse::success(response)));
    }

    let raw = RawManifest {
        content: request.file,
        filename: request.filename.clone(),
    };
    let output = state.pipeline.run(&raw).await?;
    let manifest_id = service
        .save_analysis(&output, &request.filename, &hash)
        .await?;

    Ok(Json(ApiResponse::success(ManifestAnalysisResponse {
        manifest_id,
        filename: request.filename,
        format: Some(output.mapping.format_id),
        summary: output.summary,
        items: output.items,
        charts: output.charts,
        skipped_rows: output.skipped,
        partial: output.partial,
        cached: false,
        processed_at: Utc::now(),
    })))
}

/// Retrieve a stored manifest analysis.
#[utoipa::path(
    get,
    path = "/api/v1/manifests/{id}",
    params(("id" = Uuid, Path, description = "Manifest identifier")),
    responses(
        (status = 200, description = "Stored analysis retrieved", body = ApiResponse<ManifestAnalysisResponse>),
        (status = 404, description = "Manifest not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Manifests"
)]
pub async fn get_manifest(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<ManifestAnalysisResponse> {
    let service = ManifestService::new(state.db.clone());
    let stored = service.get_analysis(id).await?;
    Ok(Json(ApiResponse::success(response_from_stored(
        stored, &state, true,
    ))))
}

/// Delete a manifest together with its items.
#[utoipa::path(
    delete,
    path = "/api/v1/manifests/{id}",
    params(("id" = Uuid, Path, description = "Manifest identifier")),
    responses(
        (status = 204, description = "Manifest deleted"),
        (status = 404, description = "Manifest not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Manifests"
)]
pub async fn delete_manifest(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    let service = ManifestService::new(state.db.clone());
    service.delete_manifest(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Rebuilds the response payload from stored rows. The summary and charts
/// are recomputed rather than stored; marketplace data is not persisted, so
/// cached responses carry empty marketplace maps.
fn response_from_stored(
    stored: StoredAnalysis,
    state: &AppState,
    cached: bool,
) -> ManifestAnalysisResponse {
    let items: Vec<AnalyzedItem> = stored.items.into_iter().map(analyzed_from_row).collect();
    let fraction = state.config.pipeline.purchase_cost_fraction();
    let summary = aggregator::summarize(&items, fraction);
    let charts = aggregator::charts(&items);

    ManifestAnalysisResponse {
        manifest_id: stored.manifest.id,
        filename: stored.filename.unwrap_or_default(),
        format: None,
        summary,
        items,
        charts,
        skipped_rows: Vec::new(),
        partial: stored.partial,
        cached,
        processed_at: stored.manifest.created_at,
    }
}

fn analyzed_from_row(row: manifest_item::Model) -> AnalyzedItem {
    // Stored tiers come from our own Display impls; anything else is old
    // data and degrades to the neutral tier.
    let demand = Demand::from_str(&row.demand).unwrap_or(Demand::Medium);
    let source = AssessmentSource::from_str(&row.assessment_source)
        .unwrap_or(AssessmentSource::Heuristic);

    AnalyzedItem {
        item: Item {
            item_number: row.item_number,
            title: row.title,
            msrp: row.msrp,
            quantity: row.quantity,
            pallet: row.pallet,
            notes: row.notes,
            flags: ItemFlags::default(),
        },
        assessment: Assessment {
            demand,
            estimated_sale_price: row.estimated_sale_price,
            sales_time: row.sales_time,
            reasoning: row.reasoning,
            source,
        },
        marketplace: BTreeMap::new(),
        profit: row.profit,
    }
}
