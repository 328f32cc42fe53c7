//! Time-indexed store of raw sensor readings
//!
//! Readings are append-only: the ingestion path inserts, nothing updates or
//! deletes. `timestamp` is unique at the storage level, so
//! [`ReadingStore::insert_if_absent`] is the authoritative dedup guard even
//! when two syncs race on the same entry.

use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::entities::{prelude::SensorReadings, sensor_readings};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// The five measurement channels of a reading
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Measurements {
    /// °C, plausible range 0-50
    pub temperature: f64,
    /// %, 0-100
    pub humidity: f64,
    /// %, 0-100
    pub soil_moisture: f64,
    /// 0-14
    pub soil_ph: f64,
    /// lux, 0-150000
    pub light_intensity: f64,
}

impl Measurements {
    /// Names of channels whose value falls outside the plausible sensor range
    pub fn out_of_range_channels(&self) -> Vec<&'static str> {
        let checks = [
            ("temperature", self.temperature, 0.0, 50.0),
            ("humidity", self.humidity, 0.0, 100.0),
            ("soil_moisture", self.soil_moisture, 0.0, 100.0),
            ("soil_ph", self.soil_ph, 0.0, 14.0),
            ("light_intensity", self.light_intensity, 0.0, 150_000.0),
        ];

        checks
            .into_iter()
            .filter(|(_, value, min, max)| value < min || value > max)
            .map(|(name, ..)| name)
            .collect()
    }
}

/// A stored reading; `timestamp` is farm-local wall-clock time
#[derive(Debug, Clone, PartialEq)]
pub struct SensorReading {
    pub timestamp: NaiveDateTime,
    pub field_id: String,
    pub measurements: Measurements,
}

impl From<sensor_readings::Model> for SensorReading {
    fn from(model: sensor_readings::Model) -> Self {
        Self {
            timestamp: model.timestamp,
            field_id: model.field_id,
            measurements: Measurements {
                temperature: model.temperature,
                humidity: model.humidity,
                soil_moisture: model.soil_moisture,
                soil_ph: model.soil_ph,
                light_intensity: model.light_intensity,
            },
        }
    }
}

#[async_trait]
pub trait ReadingStore: Send + Sync {
    /// Whether a reading exists at exactly `timestamp`
    async fn exists_at(&self, timestamp: NaiveDateTime) -> Result<bool, StoreError>;

    /// Insert unless a reading already exists at the same timestamp.
    /// Returns `false` when the insert was ignored as a duplicate.
    async fn insert_if_absent(&self, reading: SensorReading) -> Result<bool, StoreError>;

    /// Newest reading by timestamp
    async fn latest(&self) -> Result<Option<SensorReading>, StoreError>;

    /// Readings with `timestamp >= from`, ascending
    async fn since(&self, from: NaiveDateTime) -> Result<Vec<SensorReading>, StoreError>;

    /// Readings in `[start, end)`, ascending
    async fn between(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<SensorReading>, StoreError>;
}

/// SeaORM-backed store over the `sensor_readings` table
#[derive(Clone)]
pub struct SeaOrmReadingStore {
    db: DatabaseConnection,
}

impl SeaOrmReadingStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ReadingStore for SeaOrmReadingStore {
    async fn exists_at(&self, timestamp: NaiveDateTime) -> Result<bool, StoreError> {
        let existing = SensorReadings::find()
            .filter(sensor_readings::Column::Timestamp.eq(timestamp))
            .one(&self.db)
            .await?;

        Ok(existing.is_some())
    }

    async fn insert_if_absent(&self, reading: SensorReading) -> Result<bool, StoreError> {
        let m = reading.measurements;
        let model = sensor_readings::ActiveModel {
            timestamp: Set(reading.timestamp),
            field_id: Set(reading.field_id),
            temperature: Set(m.temperature),
            humidity: Set(m.humidity),
            soil_moisture: Set(m.soil_moisture),
            soil_ph: Set(m.soil_ph),
            light_intensity: Set(m.light_intensity),
            created_at: Set(Utc::now().naive_utc()),
            ..Default::default()
        };

        let inserted = SensorReadings::insert(model)
            .on_conflict(
                OnConflict::column(sensor_readings::Column::Timestamp)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;

        Ok(inserted > 0)
    }

    async fn latest(&self) -> Result<Option<SensorReading>, StoreError> {
        let newest = SensorReadings::find()
            .order_by_desc(sensor_readings::Column::Timestamp)
            .one(&self.db)
            .await?;

        Ok(newest.map(SensorReading::from))
    }

    async fn since(&self, from: NaiveDateTime) -> Result<Vec<SensorReading>, StoreError> {
        let rows = SensorReadings::find()
            .filter(sensor_readings::Column::Timestamp.gte(from))
            .order_by_asc(sensor_readings::Column::Timestamp)
            .all(&self.db)
            .await?;

        Ok(rows.into_iter().map(SensorReading::from).collect())
    }

    async fn between(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<SensorReading>, StoreError> {
        let rows = SensorReadings::find()
            .filter(sensor_readings::Column::Timestamp.gte(start))
            .filter(sensor_readings::Column::Timestamp.lt(end))
            .order_by_asc(sensor_readings::Column::Timestamp)
            .all(&self.db)
            .await?;

        Ok(rows.into_iter().map(SensorReading::from).collect())
    }
}
