//! Telemetry Sync Jobs
//!
//! Two independent loops share one sync service:
//! - latest: every FETCH_INTERVAL_SECONDS, first tick immediately (startup sync)
//! - reconcile: every RECONCILE_INTERVAL_SECONDS, first tick after one period
//!
//! Overlap between the loops and manual syncs is safe because the store
//! ignores duplicate timestamps. Both loops stop on ctrl-c.

use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant, MissedTickBehavior, interval, interval_at};
use tracing::{debug, error, info};

use crate::services::sync_status::{self, jobs};
use crate::services::telemetry_sync::{SyncError, SyncOutcome, SyncRun, TelemetrySyncService};

pub struct TelemetryScheduler {
    sync: Arc<TelemetrySyncService>,
    db: DatabaseConnection,
    latest_every: Duration,
    reconcile_every: Duration,
}

impl TelemetryScheduler {
    pub fn new(
        sync: Arc<TelemetrySyncService>,
        db: DatabaseConnection,
        latest_every: Duration,
        reconcile_every: Duration,
    ) -> Self {
        Self {
            sync,
            db,
            latest_every,
            reconcile_every,
        }
    }

    /// Spawn both loops; returns the latest and reconcile task handles
    pub fn start(self) -> (JoinHandle<()>, JoinHandle<()>) {
        info!(
            latest_secs = self.latest_every.as_secs(),
            reconcile_secs = self.reconcile_every.as_secs(),
            "Starting telemetry sync jobs"
        );

        let latest = {
            let sync = self.sync.clone();
            let db = self.db.clone();
            let every = self.latest_every;
            tokio::spawn(async move {
                let mut ticker = interval(every);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

                loop {
                    tokio::select! {
                        _ = tokio::signal::ctrl_c() => {
                            info!("Shutdown signal received, stopping latest telemetry sync");
                            break;
                        }
                        _ = ticker.tick() => {
                            // Errors are logged and recorded inside; next tick retries
                            let _ = run_latest_tick(&sync, &db).await;
                        }
                    }
                }

                info!("Latest telemetry sync job stopped");
            })
        };

        let reconcile = {
            let sync = self.sync;
            let db = self.db;
            let every = self.reconcile_every;
            tokio::spawn(async move {
                let mut ticker = interval_at(Instant::now() + every, every);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

                loop {
                    tokio::select! {
                        _ = tokio::signal::ctrl_c() => {
                            info!("Shutdown signal received, stopping telemetry reconcile");
                            break;
                        }
                        _ = ticker.tick() => {
                            let _ = run_reconcile_tick(&sync, &db).await;
                        }
                    }
                }

                info!("Telemetry reconcile job stopped");
            })
        };

        (latest, reconcile)
    }
}

/// One freshness sync with status bookkeeping
pub async fn run_latest_tick(
    sync: &TelemetrySyncService,
    db: &DatabaseConnection,
) -> Result<bool, SyncError> {
    match sync.sync_latest().await {
        Ok(saved) => {
            if saved {
                info!("Stored new latest reading");
            } else {
                debug!("No new latest reading");
            }
            if let Err(e) =
                sync_status::record_success(db, jobs::TELEMETRY_LATEST, usize::from(saved), SyncOutcome::Success)
                    .await
            {
                error!(error = %e, job = jobs::TELEMETRY_LATEST, "Failed to record sync status");
            }
            Ok(saved)
        }
        Err(e) => {
            error!(error = %e, "Latest telemetry sync failed");
            if let Err(db_err) =
                sync_status::record_failure(db, jobs::TELEMETRY_LATEST, &e.to_string()).await
            {
                error!(error = %db_err, job = jobs::TELEMETRY_LATEST, "Failed to record sync status");
            }
            Err(e)
        }
    }
}

/// One reconcile run with status bookkeeping
pub async fn run_reconcile_tick(
    sync: &TelemetrySyncService,
    db: &DatabaseConnection,
) -> Result<SyncRun, SyncError> {
    match sync.reconcile().await {
        Ok(run) => {
            if let Err(e) =
                sync_status::record_success(db, jobs::TELEMETRY_RECONCILE, run.saved(), run.outcome())
                    .await
            {
                error!(error = %e, job = jobs::TELEMETRY_RECONCILE, "Failed to record sync status");
            }
            Ok(run)
        }
        Err(e) => {
            error!(error = %e, "Telemetry reconcile failed");
            if let Err(db_err) =
                sync_status::record_failure(db, jobs::TELEMETRY_RECONCILE, &e.to_string()).await
            {
                error!(error = %db_err, job = jobs::TELEMETRY_RECONCILE, "Failed to record sync status");
            }
            Err(e)
        }
    }
}
