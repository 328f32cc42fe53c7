use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::entities::analysis_results;

/// Stored analysis record as returned to clients
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrescriptionEntry {
    pub id: i32,
    pub created_at: NaiveDateTime,
    pub field_id: Option<String>,
    pub prescription: Value,
    pub is_notified: bool,
    pub notified_at: Option<NaiveDateTime>,
}

impl From<analysis_results::Model> for PrescriptionEntry {
    fn from(model: analysis_results::Model) -> Self {
        Self {
            id: model.id,
            created_at: model.created_at,
            field_id: model.field_id,
            prescription: model.payload,
            is_notified: model.is_notified,
            notified_at: model.notified_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalyzeResponse {
    pub success: bool,
    pub message: String,
    pub data: PrescriptionEntry,
}

#[derive(Debug, Clone, Serialize)]
pub struct PrescriptionResponse {
    pub success: bool,
    pub data: PrescriptionEntry,
}

#[derive(Debug, Clone, Serialize)]
pub struct PrescriptionListResponse {
    pub success: bool,
    pub count: usize,
    pub data: Vec<PrescriptionEntry>,
}

/// `GET /api/corn-analysis/recent?fieldId=...`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentAnalysisQuery {
    pub field_id: Option<String>,
}
