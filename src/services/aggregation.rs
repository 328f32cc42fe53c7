//! Aggregation Service
//!
//! Rescans raw readings over the current day, week or month (farm time)
//! and stores channel-wise averages:
//! - daily: today 00:00 → tomorrow 00:00
//! - weekly: Sunday 00:00 → next Sunday 00:00
//! - monthly: 1st 00:00 → 1st of next month 00:00
//!
//! One row per (period, period_start); reruns overwrite it.

use chrono::{Datelike, Duration, Months, NaiveDateTime, NaiveTime, Utc};
use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::entities::{aggregated_periods, prelude::AggregatedPeriods};
use crate::models::historical::AggregationPeriod;
use crate::services::reading_store::{Measurements, ReadingStore, SensorReading, StoreError};
use crate::services::telemetry_sync::farm_now;

#[derive(Error, Debug)]
pub enum AggregationError {
    #[error("Failed to read sensor data: {0}")]
    Store(#[from] StoreError),

    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    #[error("Cannot compute {0} window for {1}")]
    Window(&'static str, NaiveDateTime),
}

/// `[start, end)` of the period containing `now`
pub fn period_window(
    period: AggregationPeriod,
    now: NaiveDateTime,
) -> Option<(NaiveDateTime, NaiveDateTime)> {
    let today = now.date();

    let (start, end) = match period {
        AggregationPeriod::Daily => (today, today + Duration::days(1)),
        AggregationPeriod::Weekly => {
            let start = today - Duration::days(i64::from(today.weekday().num_days_from_sunday()));
            (start, start + Duration::days(7))
        }
        AggregationPeriod::Monthly => {
            let start = today.with_day(1)?;
            (start, start.checked_add_months(Months::new(1))?)
        }
    };

    Some((start.and_time(NaiveTime::MIN), end.and_time(NaiveTime::MIN)))
}

/// Arithmetic mean of every channel; `None` for an empty slice
pub fn average(readings: &[SensorReading]) -> Option<Measurements> {
    if readings.is_empty() {
        return None;
    }

    let sum = readings.iter().fold(Measurements::default(), |acc, r| {
        let m = r.measurements;
        Measurements {
            temperature: acc.temperature + m.temperature,
            humidity: acc.humidity + m.humidity,
            soil_moisture: acc.soil_moisture + m.soil_moisture,
            soil_ph: acc.soil_ph + m.soil_ph,
            light_intensity: acc.light_intensity + m.light_intensity,
        }
    });

    let n = readings.len() as f64;
    Some(Measurements {
        temperature: sum.temperature / n,
        humidity: sum.humidity / n,
        soil_moisture: sum.soil_moisture / n,
        soil_ph: sum.soil_ph / n,
        light_intensity: sum.light_intensity / n,
    })
}

#[derive(Clone)]
pub struct AggregationService {
    store: Arc<dyn ReadingStore>,
    db: DatabaseConnection,
}

impl AggregationService {
    pub fn new(store: Arc<dyn ReadingStore>, db: DatabaseConnection) -> Self {
        Self { store, db }
    }

    /// Aggregate the period containing the current farm time
    pub async fn calculate(
        &self,
        period: AggregationPeriod,
    ) -> Result<Option<aggregated_periods::Model>, AggregationError> {
        self.calculate_at(period, farm_now()).await
    }

    /// Aggregate the period containing `now` and upsert the result.
    ///
    /// Returns `None` when the window holds no readings.
    pub async fn calculate_at(
        &self,
        period: AggregationPeriod,
        now: NaiveDateTime,
    ) -> Result<Option<aggregated_periods::Model>, AggregationError> {
        let (start, end) =
            period_window(period, now).ok_or(AggregationError::Window(period.as_str(), now))?;

        let readings = self.store.between(start, end).await?;
        let Some(averages) = average(&readings) else {
            info!(period = period.as_str(), %start, "No readings in window, nothing to aggregate");
            return Ok(None);
        };

        let count = i32::try_from(readings.len()).unwrap_or(i32::MAX);
        let record = aggregated_periods::ActiveModel {
            period: Set(period.as_str().to_string()),
            period_start: Set(start),
            period_end: Set(end),
            reading_count: Set(count),
            avg_temperature: Set(averages.temperature),
            avg_humidity: Set(averages.humidity),
            avg_soil_moisture: Set(averages.soil_moisture),
            avg_soil_ph: Set(averages.soil_ph),
            avg_light_intensity: Set(averages.light_intensity),
            computed_at: Set(Utc::now().naive_utc()),
            ..Default::default()
        };

        AggregatedPeriods::insert(record)
            .on_conflict(
                OnConflict::columns([
                    aggregated_periods::Column::Period,
                    aggregated_periods::Column::PeriodStart,
                ])
                .update_columns([
                    aggregated_periods::Column::PeriodEnd,
                    aggregated_periods::Column::ReadingCount,
                    aggregated_periods::Column::AvgTemperature,
                    aggregated_periods::Column::AvgHumidity,
                    aggregated_periods::Column::AvgSoilMoisture,
                    aggregated_periods::Column::AvgSoilPh,
                    aggregated_periods::Column::AvgLightIntensity,
                    aggregated_periods::Column::ComputedAt,
                ])
                .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;

        info!(
            period = period.as_str(),
            %start,
            count,
            avg_temperature = averages.temperature,
            "Aggregated period stored"
        );

        let stored = AggregatedPeriods::find()
            .filter(aggregated_periods::Column::Period.eq(period.as_str()))
            .filter(aggregated_periods::Column::PeriodStart.eq(start))
            .one(&self.db)
            .await?;

        Ok(stored)
    }

    /// Newest `limit` aggregates for a period, newest first
    pub async fn history(
        &self,
        period: AggregationPeriod,
        limit: u64,
    ) -> Result<Vec<aggregated_periods::Model>, AggregationError> {
        let rows = AggregatedPeriods::find()
            .filter(aggregated_periods::Column::Period.eq(period.as_str()))
            .order_by_desc(aggregated_periods::Column::PeriodStart)
            .limit(limit)
            .all(&self.db)
            .await?;

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn reading(temperature: f64, light_intensity: f64) -> SensorReading {
        SensorReading {
            timestamp: at(2024, 1, 1, 0),
            field_id: "maize_field_1".to_string(),
            measurements: Measurements {
                temperature,
                humidity: 50.0,
                soil_moisture: 30.0,
                soil_ph: 6.0,
                light_intensity,
            },
        }
    }

    #[test]
    fn test_daily_window() {
        let (start, end) = period_window(AggregationPeriod::Daily, at(2024, 3, 14, 17)).unwrap();
        assert_eq!(start, at(2024, 3, 14, 0));
        assert_eq!(end, at(2024, 3, 15, 0));
    }

    #[test]
    fn test_weekly_window_starts_sunday() {
        // 2024-03-14 is a Thursday
        let (start, end) = period_window(AggregationPeriod::Weekly, at(2024, 3, 14, 17)).unwrap();
        assert_eq!(start, at(2024, 3, 10, 0));
        assert_eq!(end, at(2024, 3, 17, 0));

        // A Sunday is its own week start
        let (start, _) = period_window(AggregationPeriod::Weekly, at(2024, 3, 10, 1)).unwrap();
        assert_eq!(start, at(2024, 3, 10, 0));
    }

    #[test]
    fn test_monthly_window_covers_whole_month() {
        let (start, end) = period_window(AggregationPeriod::Monthly, at(2024, 2, 29, 23)).unwrap();
        assert_eq!(start, at(2024, 2, 1, 0));
        assert_eq!(end, at(2024, 3, 1, 0));

        let (start, end) = period_window(AggregationPeriod::Monthly, at(2024, 12, 5, 8)).unwrap();
        assert_eq!(start, at(2024, 12, 1, 0));
        assert_eq!(end, at(2025, 1, 1, 0));
    }

    #[test]
    fn test_average_of_empty_is_none() {
        assert!(average(&[]).is_none());
    }

    #[test]
    fn test_average_per_channel() {
        let avg = average(&[reading(20.0, 1000.0), reading(30.0, 0.0)]).unwrap();
        assert_eq!(avg.temperature, 25.0);
        assert_eq!(avg.light_intensity, 500.0);
        assert_eq!(avg.humidity, 50.0);
        assert_eq!(avg.soil_ph, 6.0);
    }
}
