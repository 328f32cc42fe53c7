use axum::{
    Json,
    extract::{Path, Query, State},
};
use chrono::Duration;
use tracing::{error, info, warn};

use crate::AppState;
use crate::models::error::ApiError;
use crate::models::sensor::{
    FieldPoint, FieldQuery, FieldResponse, HistoricalReadingsQuery, JobStatus, LatestResponse,
    ReadingsResponse, SensorDataEntry, StatusResponse, SyncResponse,
};
use crate::services::sync_status;
use crate::services::telemetry_sync::farm_now;
use crate::services::thingspeak::parse_channel_value;

/// Highest channel field exposed over HTTP
const MAX_HTTP_FIELD: u8 = 5;

/// Best-effort freshness sync ahead of a read; failures only get logged
async fn refresh_latest(state: &AppState) {
    if let Err(e) = state.sync.sync_latest().await {
        warn!(error = %e, "Freshness sync failed, serving stored readings");
    }
}

/// GET /api/sensors/latest
pub async fn get_latest_reading(
    State(state): State<AppState>,
) -> Result<Json<LatestResponse>, ApiError> {
    refresh_latest(&state).await;

    let latest = state.readings.latest().await.map_err(|e| {
        error!(error = %e, "Failed to load latest reading");
        ApiError::from(e)
    })?;

    let reading =
        latest.ok_or_else(|| ApiError::NotFound("No sensor data available".to_string()))?;

    Ok(Json(LatestResponse {
        success: true,
        data: SensorDataEntry::from(reading),
    }))
}

/// GET /api/sensors/historical?minutes=N
pub async fn get_historical_readings(
    State(state): State<AppState>,
    Query(query): Query<HistoricalReadingsQuery>,
) -> Result<Json<ReadingsResponse>, ApiError> {
    refresh_latest(&state).await;

    let minutes = query.window_minutes();
    // Windows past the representable range just mean "everything"
    let from = Duration::try_minutes(minutes)
        .and_then(|window| farm_now().checked_sub_signed(window))
        .unwrap_or_default();

    let readings = state.readings.since(from).await.map_err(|e| {
        error!(error = %e, minutes, "Failed to load historical readings");
        ApiError::from(e)
    })?;

    info!(minutes, count = readings.len(), "Serving historical readings");

    Ok(Json(ReadingsResponse {
        success: true,
        data: readings.into_iter().map(SensorDataEntry::from).collect(),
    }))
}

/// GET /api/sensors/field/{fieldNumber}?results=N
pub async fn get_field_series(
    State(state): State<AppState>,
    Path(field_number): Path<String>,
    Query(query): Query<FieldQuery>,
) -> Result<Json<FieldResponse>, ApiError> {
    let field = field_number
        .parse::<u8>()
        .ok()
        .filter(|n| (1..=MAX_HTTP_FIELD).contains(n))
        .ok_or_else(|| {
            ApiError::BadRequest(format!(
                "Invalid field number '{}'. Must be between 1 and {}.",
                field_number, MAX_HTTP_FIELD
            ))
        })?;

    refresh_latest(&state).await;

    let results = query.results();
    let feeds = state
        .telemetry
        .fetch_field(field, results)
        .await
        .map_err(|e| {
            error!(error = %e, field, "Failed to fetch field series");
            ApiError::from(e)
        })?;

    let data = feeds
        .iter()
        .map(|entry| FieldPoint {
            timestamp: entry.created_at_utc(),
            value: parse_channel_value(entry.field(field)),
        })
        .collect();

    Ok(Json(FieldResponse {
        success: true,
        field,
        results,
        data,
    }))
}

/// POST /api/sensors/sync
pub async fn trigger_sync(State(state): State<AppState>) -> Result<Json<SyncResponse>, ApiError> {
    let saved_count = state.sync.sync_recent().await.map_err(|e| {
        error!(error = %e, "Manual sync failed");
        ApiError::from(e)
    })?;

    info!(saved_count, "Manual sync completed");

    Ok(Json(SyncResponse {
        success: true,
        message: format!("Synced {} new readings", saved_count),
        saved_count,
    }))
}

/// GET /api/sensors/status
pub async fn get_sync_status(
    State(state): State<AppState>,
) -> Result<Json<StatusResponse>, ApiError> {
    let jobs = sync_status::all_statuses(&state.db).await.map_err(|e| {
        error!(error = %e, "Failed to load sync status");
        ApiError::Internal(format!("Database error: {}", e))
    })?;

    let latest = state.readings.latest().await?;

    Ok(Json(StatusResponse {
        success: true,
        latest_reading_at: latest.map(|r| r.timestamp),
        jobs: jobs.into_iter().map(JobStatus::from).collect(),
    }))
}
