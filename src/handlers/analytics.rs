use axum::{
    Json,
    extract::{Path, Query, State},
};
use tracing::{error, info};

use crate::AppState;
use crate::entities::analysis_results;
use crate::models::analytics::{
    AnalyzeResponse, PrescriptionEntry, PrescriptionListResponse, PrescriptionResponse,
    RecentAnalysisQuery,
};
use crate::models::error::ApiError;

/// POST /api/analytics/analyze
///
/// Runs the external analysis to completion, then returns the record it wrote.
pub async fn run_analysis(
    State(state): State<AppState>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let run = state.analytics.run().await.map_err(|e| {
        error!(error = %e, "Analytics run failed");
        ApiError::from(e)
    })?;
    info!(stdout_bytes = run.stdout.len(), "Analytics run finished");

    let latest = state.analytics.latest_result().await?.ok_or_else(|| {
        ApiError::NotFound("Analysis completed but no result was stored".to_string())
    })?;

    Ok(Json(AnalyzeResponse {
        success: true,
        message: "Analysis completed successfully".to_string(),
        data: PrescriptionEntry::from(latest),
    }))
}

/// GET /api/analytics/latest-prescription
pub async fn get_latest_prescription(
    State(state): State<AppState>,
) -> Result<Json<PrescriptionResponse>, ApiError> {
    let latest = state
        .analytics
        .latest_result()
        .await?
        .ok_or_else(|| ApiError::NotFound("No prescription available".to_string()))?;

    Ok(Json(PrescriptionResponse {
        success: true,
        data: PrescriptionEntry::from(latest),
    }))
}

/// GET /api/analytics/unnotified-prescriptions
pub async fn get_unnotified_prescriptions(
    State(state): State<AppState>,
) -> Result<Json<PrescriptionListResponse>, ApiError> {
    let rows = state.analytics.unnotified().await?;
    Ok(Json(listing(rows)))
}

/// PATCH /api/analytics/prescriptions/{id}/notified
pub async fn mark_prescription_notified(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<PrescriptionResponse>, ApiError> {
    let updated = state.analytics.mark_notified(id).await?;

    Ok(Json(PrescriptionResponse {
        success: true,
        data: PrescriptionEntry::from(updated),
    }))
}

fn listing(rows: Vec<analysis_results::Model>) -> PrescriptionListResponse {
    let data: Vec<PrescriptionEntry> = rows.into_iter().map(PrescriptionEntry::from).collect();
    PrescriptionListResponse {
        success: true,
        count: data.len(),
        data,
    }
}

/// GET /api/corn-analysis/all
pub async fn list_all_analyses(
    State(state): State<AppState>,
) -> Result<Json<PrescriptionListResponse>, ApiError> {
    let rows = state.analytics.all_results().await?;
    Ok(Json(listing(rows)))
}

/// GET /api/corn-analysis/field/{field_id}
pub async fn list_field_analyses(
    State(state): State<AppState>,
    Path(field_id): Path<String>,
) -> Result<Json<PrescriptionListResponse>, ApiError> {
    let rows = state.analytics.results_for_field(&field_id).await?;
    Ok(Json(listing(rows)))
}

/// GET /api/corn-analysis/recent?fieldId=...
pub async fn get_recent_analysis(
    State(state): State<AppState>,
    Query(query): Query<RecentAnalysisQuery>,
) -> Result<Json<PrescriptionResponse>, ApiError> {
    let field_id = query.field_id.as_deref().filter(|f| !f.is_empty());
    let record = state
        .analytics
        .most_recent(field_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("No analysis found".to_string()))?;

    Ok(Json(PrescriptionResponse {
        success: true,
        data: PrescriptionEntry::from(record),
    }))
}
