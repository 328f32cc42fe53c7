use axum::{Json, extract::State};
use serde::Serialize;
use tracing::warn;

use crate::AppState;
use crate::models::sensor::JobStatus;
use crate::services::sync_status::{self, jobs};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
    pub last_sync: Option<JobStatus>,
}

/// GET /health; always 200, degraded state is reported in the body
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let database_up = match state.db.ping().await {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "Database ping failed");
            false
        }
    };

    let last_sync = if database_up {
        sync_status::get_status(&state.db, jobs::TELEMETRY_LATEST)
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, "Failed to read sync status");
                None
            })
    } else {
        None
    };

    Json(HealthResponse {
        status: if database_up { "ok" } else { "degraded" },
        database: if database_up { "up" } else { "down" },
        last_sync: last_sync.map(JobStatus::from),
    })
}
