//! `SeaORM` Entity for sensor_readings table

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sensor_readings")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Farm-local wall-clock time (UTC+8); unique dedup key
    #[sea_orm(unique)]
    pub timestamp: DateTime,
    pub field_id: String,
    pub temperature: f64,
    pub humidity: f64,
    pub soil_moisture: f64,
    pub soil_ph: f64,
    pub light_intensity: f64,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
