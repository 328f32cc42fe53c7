//! SeaORM Entity for per-period channel averages

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "aggregated_periods")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// 'daily', 'weekly' or 'monthly'
    pub period: String,
    pub period_start: DateTime,
    pub period_end: DateTime,
    pub reading_count: i32,
    pub avg_temperature: f64,
    pub avg_humidity: f64,
    pub avg_soil_moisture: f64,
    pub avg_soil_ph: f64,
    pub avg_light_intensity: f64,
    pub computed_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
