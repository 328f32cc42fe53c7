//! Aggregation Job
//!
//! Recomputes the current daily, weekly and monthly aggregates on a fixed
//! interval. Reruns overwrite the stored row for the period.

use sea_orm::DatabaseConnection;
use tokio::task::JoinHandle;
use tokio::time::{Duration, MissedTickBehavior, interval};
use tracing::{error, info};

use crate::models::historical::AggregationPeriod;
use crate::services::aggregation::{AggregationError, AggregationService};
use crate::services::sync_status::{self, jobs};
use crate::services::telemetry_sync::SyncOutcome;

pub fn start_aggregation_job(
    service: AggregationService,
    db: DatabaseConnection,
    every: Duration,
) -> JoinHandle<()> {
    info!(interval_secs = every.as_secs(), "Starting aggregation job");

    tokio::spawn(async move {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown signal received, stopping aggregation job");
                    break;
                }
                _ = ticker.tick() => {
                    let _ = run_aggregation_tick(&service, &db).await;
                }
            }
        }

        info!("Aggregation job stopped");
    })
}

/// Aggregate every period once; returns how many aggregates were stored
pub async fn run_aggregation_tick(
    service: &AggregationService,
    db: &DatabaseConnection,
) -> Result<usize, AggregationError> {
    let mut stored = 0;
    let mut first_error = None;

    for period in AggregationPeriod::ALL {
        match service.calculate(period).await {
            Ok(Some(_)) => stored += 1,
            Ok(None) => {}
            Err(e) => {
                error!(error = %e, period = period.as_str(), "Aggregation failed");
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
    }

    let recorded = match &first_error {
        None => sync_status::record_success(db, jobs::AGGREGATION, stored, SyncOutcome::Success).await,
        Some(e) => sync_status::record_failure(db, jobs::AGGREGATION, &e.to_string()).await,
    };
    if let Err(e) = recorded {
        error!(error = %e, job = jobs::AGGREGATION, "Failed to record sync status");
    }

    match first_error {
        None => {
            info!(stored, "Aggregation run completed");
            Ok(stored)
        }
        Some(e) => Err(e),
    }
}
