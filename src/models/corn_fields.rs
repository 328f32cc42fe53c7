//! Corn field request/response models
//!
//! Requests arrive with every property optional so missing values can be
//! reported together as a 400 instead of an extractor rejection.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::entities::corn_fields;
use crate::services::corn_fields::{CornFieldChanges, NewCornField};

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp
pub fn parse_planting_date(raw: &str) -> Result<NaiveDate, String> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| DateTime::parse_from_rfc3339(raw).map(|dt| dt.date_naive()))
        .map_err(|_| format!("Invalid plantingDate: '{}'", raw))
}

/// Blank strings count as absent
fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterCornFieldRequest {
    pub user_id: Option<String>,
    pub field_name: Option<String>,
    pub location: Option<String>,
    pub soil_type: Option<String>,
    pub corn_variety: Option<String>,
    pub planting_date: Option<String>,
    pub growth_stage: Option<String>,
}

impl RegisterCornFieldRequest {
    /// Check required properties; returns the claimed owner and the new field
    pub fn validate(self) -> Result<(String, NewCornField), String> {
        let user_id = non_blank(self.user_id);
        let field_name = non_blank(self.field_name);
        let location = non_blank(self.location);
        let soil_type = non_blank(self.soil_type);
        let corn_variety = non_blank(self.corn_variety);
        let planting_date = non_blank(self.planting_date);

        let missing: Vec<&str> = [
            ("userId", user_id.is_none()),
            ("fieldName", field_name.is_none()),
            ("location", location.is_none()),
            ("soilType", soil_type.is_none()),
            ("cornVariety", corn_variety.is_none()),
            ("plantingDate", planting_date.is_none()),
        ]
        .into_iter()
        .filter_map(|(name, absent)| absent.then_some(name))
        .collect();

        match (user_id, field_name, location, soil_type, corn_variety, planting_date) {
            (
                Some(user_id),
                Some(field_name),
                Some(location),
                Some(soil_type),
                Some(corn_variety),
                Some(planting_date),
            ) => Ok((
                user_id,
                NewCornField {
                    field_name,
                    location,
                    soil_type,
                    corn_variety,
                    planting_date: parse_planting_date(&planting_date)?,
                    growth_stage: non_blank(self.growth_stage),
                },
            )),
            _ => Err(format!("Missing required fields: {}", missing.join(", "))),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCornFieldRequest {
    pub field_name: Option<String>,
    pub location: Option<String>,
    pub soil_type: Option<String>,
    pub corn_variety: Option<String>,
    pub planting_date: Option<String>,
    pub growth_stage: Option<String>,
}

impl UpdateCornFieldRequest {
    pub fn into_changes(self) -> Result<CornFieldChanges, String> {
        let planting_date = non_blank(self.planting_date)
            .map(|raw| parse_planting_date(&raw))
            .transpose()?;

        Ok(CornFieldChanges {
            field_name: non_blank(self.field_name),
            location: non_blank(self.location),
            soil_type: non_blank(self.soil_type),
            corn_variety: non_blank(self.corn_variety),
            planting_date,
            growth_stage: non_blank(self.growth_stage),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CornFieldEntry {
    pub id: i32,
    pub user_id: String,
    pub field_name: String,
    pub location: String,
    pub soil_type: String,
    pub corn_variety: String,
    pub planting_date: NaiveDate,
    pub growth_stage: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<corn_fields::Model> for CornFieldEntry {
    fn from(model: corn_fields::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            field_name: model.field_name,
            location: model.location,
            soil_type: model.soil_type,
            corn_variety: model.corn_variety,
            planting_date: model.planting_date,
            growth_stage: model.growth_stage,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CornFieldResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: CornFieldEntry,
}

#[derive(Debug, Clone, Serialize)]
pub struct CornFieldListResponse {
    pub success: bool,
    pub count: usize,
    pub data: Vec<CornFieldEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}
