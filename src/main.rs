use sea_orm::{ConnectOptions, Database};
use sea_orm_migration::MigratorTrait;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use maizewatch_backend::AppState;
use maizewatch_backend::auth::JwtVerifier;
use maizewatch_backend::config::Config;
use maizewatch_backend::jobs::{aggregation_job, telemetry_sync_job::TelemetryScheduler};
use maizewatch_backend::routes::build_router;
use maizewatch_backend::services::{
    aggregation::AggregationService,
    analytics::AnalyticsService,
    reading_store::{ReadingStore, SeaOrmReadingStore},
    telemetry_sync::TelemetrySyncService,
    thingspeak::{FeedSource, ThingSpeakClient},
};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,maizewatch_backend=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            std::process::exit(1);
        }
    };

    // Connect to database
    tracing::info!("Connecting to database...");
    let mut options = ConnectOptions::new(config.database_url.clone());
    options
        .connect_timeout(Duration::from_secs(10))
        .sqlx_logging(false);
    let db = match Database::connect(options).await {
        Ok(db) => db,
        Err(e) => {
            tracing::error!(error = %e, "Failed to connect to database");
            std::process::exit(1);
        }
    };

    // Run migrations
    tracing::info!("Running migrations...");
    if let Err(e) = migration::Migrator::up(&db, None).await {
        tracing::error!(error = %e, "Failed to run migrations");
        std::process::exit(1);
    }

    let client = match ThingSpeakClient::new(&config.thingspeak) {
        Ok(client) => client,
        Err(e) => {
            tracing::error!(error = %e, "Failed to build ThingSpeak client");
            std::process::exit(1);
        }
    };
    let telemetry: Arc<dyn FeedSource> = Arc::new(client);
    let readings: Arc<dyn ReadingStore> = Arc::new(SeaOrmReadingStore::new(db.clone()));
    let sync = Arc::new(TelemetrySyncService::new(
        telemetry.clone(),
        readings.clone(),
        config.field_id.clone(),
    ));
    let aggregation = AggregationService::new(readings.clone(), db.clone());
    let analytics = AnalyticsService::new(config.analytics.clone(), db.clone());

    if !analytics.is_configured() {
        tracing::warn!("ANALYTICS_COMMAND not set - analysis endpoints will return 503");
    }

    // Background jobs
    TelemetryScheduler::new(
        sync.clone(),
        db.clone(),
        Duration::from_secs(config.fetch_interval_secs),
        Duration::from_secs(config.reconcile_interval_secs),
    )
    .start();
    aggregation_job::start_aggregation_job(
        aggregation.clone(),
        db.clone(),
        Duration::from_secs(config.aggregation_interval_secs),
    );

    let state = AppState {
        db,
        sync,
        telemetry,
        readings,
        aggregation,
        analytics,
        auth: JwtVerifier::new(&config.jwt_secret),
    };

    let app = build_router(state);

    // Start server
    let listener = match tokio::net::TcpListener::bind(config.bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, addr = %config.bind_addr, "Failed to bind");
            std::process::exit(1);
        }
    };

    tracing::info!(addr = %config.bind_addr, "Server listening");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %e, "Server error");
    }

    tracing::info!("Server stopped");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}
