#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use jsonwebtoken::{EncodingKey, Header, encode};
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;
use serde_json::Value;
use std::sync::{Arc, Mutex};

use maizewatch_backend::AppState;
use maizewatch_backend::auth::{Claims, JwtVerifier};
use maizewatch_backend::routes::build_router;
use maizewatch_backend::services::{
    aggregation::AggregationService,
    analytics::AnalyticsService,
    reading_store::{ReadingStore, SeaOrmReadingStore},
    telemetry_sync::TelemetrySyncService,
    thingspeak::{FeedEntry, FeedSource, TelemetryError},
};

pub const TEST_JWT_SECRET: &str = "test-secret";
pub const TEST_FIELD_ID: &str = "maize_field_1";
pub const TEST_USER_ID: &str = "farmer-1";

/// Fresh in-memory SQLite database with all migrations applied.
/// A single pooled connection keeps every query on the same database.
pub async fn setup_test_db() -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);

    let db = Database::connect(options).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

/// Build a feed entry from provider-shaped JSON
pub fn feed(value: Value) -> FeedEntry {
    serde_json::from_value(value).expect("valid feed entry json")
}

/// Scripted channel; `latest` and `recent` can be swapped between calls
#[derive(Default)]
pub struct FakeChannel {
    pub latest: Mutex<Option<FeedEntry>>,
    pub recent: Mutex<Vec<FeedEntry>>,
    pub field_series: Mutex<Vec<FeedEntry>>,
    pub unreachable: Mutex<bool>,
}

impl FakeChannel {
    pub fn set_latest(&self, entry: Option<FeedEntry>) {
        *self.latest.lock().unwrap() = entry;
    }

    pub fn set_recent(&self, entries: Vec<FeedEntry>) {
        *self.recent.lock().unwrap() = entries;
    }

    pub fn set_unreachable(&self, unreachable: bool) {
        *self.unreachable.lock().unwrap() = unreachable;
    }

    fn check_reachable(&self) -> Result<(), TelemetryError> {
        if *self.unreachable.lock().unwrap() {
            Err(TelemetryError::Status {
                status: 503,
                body: "channel unavailable".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl FeedSource for FakeChannel {
    async fn fetch_latest(&self) -> Result<Option<FeedEntry>, TelemetryError> {
        self.check_reachable()?;
        Ok(self.latest.lock().unwrap().clone())
    }

    async fn fetch_recent(&self, count: u32) -> Result<Vec<FeedEntry>, TelemetryError> {
        self.check_reachable()?;
        let recent = self.recent.lock().unwrap();
        let skip = recent.len().saturating_sub(count as usize);
        Ok(recent[skip..].to_vec())
    }

    async fn fetch_field(&self, field: u8, _results: u32) -> Result<Vec<FeedEntry>, TelemetryError> {
        self.check_reachable()?;
        if !(1..=8).contains(&field) {
            return Err(TelemetryError::InvalidField(field));
        }
        Ok(self.field_series.lock().unwrap().clone())
    }
}

pub struct TestApp {
    pub state: AppState,
    pub channel: Arc<FakeChannel>,
}

impl TestApp {
    pub fn router(&self) -> Router {
        build_router(self.state.clone())
    }
}

pub async fn setup_test_app() -> TestApp {
    let db = setup_test_db().await.expect("Failed to set up test DB");
    let channel = Arc::new(FakeChannel::default());

    let telemetry: Arc<dyn FeedSource> = channel.clone();
    let readings: Arc<dyn ReadingStore> = Arc::new(SeaOrmReadingStore::new(db.clone()));
    let sync = Arc::new(TelemetrySyncService::new(
        telemetry.clone(),
        readings.clone(),
        TEST_FIELD_ID,
    ));

    let state = AppState {
        aggregation: AggregationService::new(readings.clone(), db.clone()),
        analytics: AnalyticsService::new(None, db.clone()),
        auth: JwtVerifier::new(TEST_JWT_SECRET),
        db,
        sync,
        telemetry,
        readings,
    };

    TestApp { state, channel }
}

/// Signed bearer token for [`TEST_USER_ID`], valid for one hour
pub fn bearer_token() -> String {
    bearer_token_for(TEST_USER_ID)
}

/// Signed bearer token for an arbitrary user, valid for one hour
pub fn bearer_token_for(user_id: &str) -> String {
    let claims = Claims {
        user_id: user_id.to_string(),
        role: Some("farmer".to_string()),
        exp: (chrono::Utc::now().timestamp() + 3600) as usize,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
    )
    .expect("token encodes");

    format!("Bearer {}", token)
}
