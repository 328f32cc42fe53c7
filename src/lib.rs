// src/lib.rs

use sea_orm::DatabaseConnection;
use std::sync::Arc;

use auth::JwtVerifier;
use services::{
    aggregation::AggregationService, analytics::AnalyticsService, reading_store::ReadingStore,
    telemetry_sync::TelemetrySyncService, thingspeak::FeedSource,
};

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub sync: Arc<TelemetrySyncService>,
    pub telemetry: Arc<dyn FeedSource>,
    pub readings: Arc<dyn ReadingStore>,
    pub aggregation: AggregationService,
    pub analytics: AnalyticsService,
    pub auth: JwtVerifier,
}

pub mod entities {
    pub mod prelude;
    pub mod aggregated_periods;
    pub mod analysis_results;
    pub mod corn_fields;
    pub mod sensor_readings;
    pub mod sync_status;
}

pub mod services {
    pub mod thingspeak;
    pub mod reading_store;
    pub mod telemetry_sync;
    pub mod sync_status;
    pub mod aggregation;
    pub mod analytics;
    pub mod corn_fields;
}

pub mod models {
    pub mod error;
    pub mod sensor;
    pub mod historical;
    pub mod analytics;
    pub mod corn_fields;
}

pub mod handlers {
    pub mod health;
    pub mod sensors;
    pub mod historical;
    pub mod analytics;
    pub mod corn_fields;
}

pub mod jobs {
    pub mod telemetry_sync_job;
    pub mod aggregation_job;
}

pub mod auth;
pub mod config;
pub mod routes;
