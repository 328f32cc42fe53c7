//! Sensor endpoint request/response models
//!
//! Shapes consumed by the dashboard under /api/sensors.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::sync_status;
use crate::services::reading_store::SensorReading;

pub const DEFAULT_HISTORY_MINUTES: i64 = 60;
pub const DEFAULT_FIELD_RESULTS: u32 = 10;

/// Flattened reading as returned to clients
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorDataEntry {
    /// Farm-local time
    pub timestamp: NaiveDateTime,
    pub temperature: f64,
    pub humidity: f64,
    pub soil_moisture: f64,
    pub soil_ph: f64,
    pub light_intensity: f64,
}

impl From<SensorReading> for SensorDataEntry {
    fn from(reading: SensorReading) -> Self {
        let m = reading.measurements;
        Self {
            timestamp: reading.timestamp,
            temperature: m.temperature,
            humidity: m.humidity,
            soil_moisture: m.soil_moisture,
            soil_ph: m.soil_ph,
            light_intensity: m.light_intensity,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LatestResponse {
    pub success: bool,
    pub data: SensorDataEntry,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReadingsResponse {
    pub success: bool,
    pub data: Vec<SensorDataEntry>,
}

/// Query for GET /api/sensors/historical; lenient like the dashboard expects
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoricalReadingsQuery {
    pub minutes: Option<String>,
}

impl HistoricalReadingsQuery {
    /// Requested window; missing, unparseable or non-positive values mean 60
    pub fn window_minutes(&self) -> i64 {
        self.minutes
            .as_deref()
            .and_then(|m| m.trim().parse::<i64>().ok())
            .filter(|m| *m > 0)
            .unwrap_or(DEFAULT_HISTORY_MINUTES)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FieldQuery {
    pub results: Option<String>,
}

impl FieldQuery {
    /// Requested entry count, defaulting to 10 and clamped to 1..=8000
    pub fn results(&self) -> u32 {
        self.results
            .as_deref()
            .and_then(|r| r.trim().parse::<i64>().ok())
            .filter(|r| *r != 0)
            .map(|r| r.clamp(1, 8000) as u32)
            .unwrap_or(DEFAULT_FIELD_RESULTS)
    }
}

/// One point of a raw provider field series
#[derive(Debug, Clone, Serialize)]
pub struct FieldPoint {
    /// Provider time (UTC), as reported by the channel
    pub timestamp: Option<DateTime<Utc>>,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct FieldResponse {
    pub success: bool,
    pub field: u8,
    pub results: u32,
    pub data: Vec<FieldPoint>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResponse {
    pub success: bool,
    pub message: String,
    pub saved_count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatus {
    pub job_name: String,
    pub last_success_at: Option<NaiveDateTime>,
    pub last_attempt_at: Option<NaiveDateTime>,
    pub last_error: Option<String>,
    pub last_outcome: Option<String>,
    pub last_saved_count: i32,
    pub success_count: i64,
    pub error_count: i64,
    pub total_saved: i64,
}

impl From<sync_status::Model> for JobStatus {
    fn from(model: sync_status::Model) -> Self {
        Self {
            job_name: model.job_name,
            last_success_at: model.last_success_at,
            last_attempt_at: model.last_attempt_at,
            last_error: model.last_error,
            last_outcome: model.last_outcome,
            last_saved_count: model.last_saved_count,
            success_count: model.success_count,
            error_count: model.error_count,
            total_saved: model.total_saved,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub success: bool,
    pub latest_reading_at: Option<NaiveDateTime>,
    pub jobs: Vec<JobStatus>,
}
