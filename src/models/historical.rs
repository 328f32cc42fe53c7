//! Aggregated history request/response models
//!
//! Models for GET /api/historical/{period} and POST /api/historical/calculate.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::entities::aggregated_periods;

/// Aggregation windows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregationPeriod {
    Daily,
    Weekly,
    Monthly,
}

impl AggregationPeriod {
    pub const ALL: [AggregationPeriod; 3] = [
        AggregationPeriod::Daily,
        AggregationPeriod::Weekly,
        AggregationPeriod::Monthly,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AggregationPeriod::Daily => "daily",
            AggregationPeriod::Weekly => "weekly",
            AggregationPeriod::Monthly => "monthly",
        }
    }

    pub fn parse(s: &str) -> Result<Self, String> {
        match s {
            "daily" => Ok(AggregationPeriod::Daily),
            "weekly" => Ok(AggregationPeriod::Weekly),
            "monthly" => Ok(AggregationPeriod::Monthly),
            _ => Err(format!(
                "Invalid period: '{}'. Must be daily, weekly, or monthly.",
                s
            )),
        }
    }
}

/// Number of periods returned when `limit` is absent, zero or unparseable
pub const DEFAULT_HISTORY_LIMIT: u64 = 7;

/// Upper bound on `limit`
pub const MAX_HISTORY_LIMIT: u64 = 365;

/// Query parameters for the history listing
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoricalQuery {
    /// Raw value so that bad input falls back to the default instead of a 400
    pub limit: Option<String>,
}

impl HistoricalQuery {
    /// Requested period count, clamped to `1..=365`
    pub fn limit(&self) -> u64 {
        match self
            .limit
            .as_deref()
            .and_then(|raw| raw.trim().parse::<i64>().ok())
        {
            Some(0) | None => DEFAULT_HISTORY_LIMIT,
            Some(n) => n.clamp(1, MAX_HISTORY_LIMIT as i64) as u64,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CalculateRequest {
    pub period: String,
}

/// Channel averages over one period
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedPeriodEntry {
    pub period: String,
    pub period_start: NaiveDateTime,
    pub period_end: NaiveDateTime,
    pub count: i32,
    pub averages: ChannelAverages,
    pub computed_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelAverages {
    pub temperature: f64,
    pub humidity: f64,
    pub soil_moisture: f64,
    pub soil_ph: f64,
    pub light_intensity: f64,
}

impl From<aggregated_periods::Model> for AggregatedPeriodEntry {
    fn from(model: aggregated_periods::Model) -> Self {
        Self {
            period: model.period,
            period_start: model.period_start,
            period_end: model.period_end,
            count: model.reading_count,
            averages: ChannelAverages {
                temperature: model.avg_temperature,
                humidity: model.avg_humidity,
                soil_moisture: model.avg_soil_moisture,
                soil_ph: model.avg_soil_ph,
                light_intensity: model.avg_light_intensity,
            },
            computed_at: model.computed_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoricalResponse {
    pub success: bool,
    pub period: String,
    pub data: Vec<AggregatedPeriodEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CalculateResponse {
    pub success: bool,
    pub data: AggregatedPeriodEntry,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_parse_valid() {
        for period in AggregationPeriod::ALL {
            assert_eq!(AggregationPeriod::parse(period.as_str()), Ok(period));
        }
    }

    #[test]
    fn test_period_parse_invalid() {
        let result = AggregationPeriod::parse("hourly");
        assert!(result.unwrap_err().contains("Invalid period"));
    }

    fn query(limit: &str) -> HistoricalQuery {
        HistoricalQuery {
            limit: Some(limit.to_string()),
        }
    }

    #[test]
    fn test_limit_defaults() {
        let absent: HistoricalQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.limit(), 7);
        assert_eq!(query("0").limit(), 7);
        assert_eq!(query("abc").limit(), 7);
        assert_eq!(query("").limit(), 7);
        assert_eq!(query("2.5").limit(), 7);
    }

    #[test]
    fn test_limit_clamped() {
        assert_eq!(query("-1").limit(), 1);
        assert_eq!(query("30").limit(), 30);
        assert_eq!(query("10000").limit(), 365);
    }
}
