use axum::{
    Json,
    extract::{Path, Query, State},
};
use tracing::{error, info};

use crate::AppState;
use crate::models::error::ApiError;
use crate::models::historical::{
    AggregatedPeriodEntry, AggregationPeriod, CalculateRequest, CalculateResponse,
    HistoricalQuery, HistoricalResponse,
};

/// GET /api/historical/{period}?limit=N
pub async fn get_period_history(
    State(state): State<AppState>,
    Path(period): Path<String>,
    Query(query): Query<HistoricalQuery>,
) -> Result<Json<HistoricalResponse>, ApiError> {
    let period = AggregationPeriod::parse(&period).map_err(ApiError::BadRequest)?;
    let limit = query.limit();

    let rows = state.aggregation.history(period, limit).await.map_err(|e| {
        error!(error = %e, period = period.as_str(), "Failed to load aggregated history");
        ApiError::from(e)
    })?;

    Ok(Json(HistoricalResponse {
        success: true,
        period: period.as_str().to_string(),
        data: rows.into_iter().map(AggregatedPeriodEntry::from).collect(),
    }))
}

/// POST /api/historical/calculate
pub async fn calculate_period(
    State(state): State<AppState>,
    Json(request): Json<CalculateRequest>,
) -> Result<Json<CalculateResponse>, ApiError> {
    let period = AggregationPeriod::parse(&request.period).map_err(ApiError::BadRequest)?;

    let stored = state.aggregation.calculate(period).await.map_err(|e| {
        error!(error = %e, period = period.as_str(), "Aggregation failed");
        ApiError::from(e)
    })?;

    let Some(stored) = stored else {
        info!(period = period.as_str(), "No readings in window; nothing calculated");
        return Err(ApiError::NotFound(
            "No data available for calculation".to_string(),
        ));
    };

    info!(period = period.as_str(), "Manual aggregation completed");

    Ok(Json(CalculateResponse {
        success: true,
        data: AggregatedPeriodEntry::from(stored),
    }))
}
