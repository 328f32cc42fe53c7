//! Sync status service for tracking scheduled job runs
//!
//! Each scheduled tick records its outcome here so operators (and the
//! status endpoint) can see when a job last succeeded and why it last failed.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set,
};

use crate::entities::sync_status::{self, Entity as SyncStatus};
use crate::services::telemetry_sync::SyncOutcome;

/// Job names for tracking sync status
pub mod jobs {
    pub const TELEMETRY_LATEST: &str = "telemetry_latest_sync";
    pub const TELEMETRY_RECONCILE: &str = "telemetry_reconcile_sync";
    pub const AGGREGATION: &str = "aggregation";
}

async fn find_job(db: &DatabaseConnection, job_name: &str) -> Result<Option<sync_status::Model>, DbErr> {
    SyncStatus::find()
        .filter(sync_status::Column::JobName.eq(job_name))
        .one(db)
        .await
}

/// Record a completed run that stored `saved` new rows
pub async fn record_success(
    db: &DatabaseConnection,
    job_name: &str,
    saved: usize,
    outcome: SyncOutcome,
) -> Result<(), DbErr> {
    let now = Utc::now().naive_utc();
    let saved = i32::try_from(saved).unwrap_or(i32::MAX);

    match find_job(db, job_name).await? {
        Some(record) => {
            let success_count = record.success_count + 1;
            let total_saved = record.total_saved + i64::from(saved);
            let mut active_model: sync_status::ActiveModel = record.into();
            active_model.last_success_at = Set(Some(now));
            active_model.last_attempt_at = Set(Some(now));
            active_model.last_error = Set(None);
            active_model.last_outcome = Set(Some(outcome.as_str().to_string()));
            active_model.last_saved_count = Set(saved);
            active_model.success_count = Set(success_count);
            active_model.total_saved = Set(total_saved);
            active_model.update(db).await?;
        }
        None => {
            let new_record = sync_status::ActiveModel {
                job_name: Set(job_name.to_string()),
                last_success_at: Set(Some(now)),
                last_attempt_at: Set(Some(now)),
                last_error: Set(None),
                last_outcome: Set(Some(outcome.as_str().to_string())),
                last_saved_count: Set(saved),
                success_count: Set(1),
                error_count: Set(0),
                total_saved: Set(i64::from(saved)),
                ..Default::default()
            };
            new_record.insert(db).await?;
        }
    }

    tracing::debug!("[{}] Recorded successful sync", job_name);
    Ok(())
}

/// Record a failed run
pub async fn record_failure(
    db: &DatabaseConnection,
    job_name: &str,
    error: &str,
) -> Result<(), DbErr> {
    let now = Utc::now().naive_utc();
    let failure = Some(SyncOutcome::Failure.as_str().to_string());

    match find_job(db, job_name).await? {
        Some(record) => {
            let error_count = record.error_count + 1;
            let mut active_model: sync_status::ActiveModel = record.into();
            active_model.last_attempt_at = Set(Some(now));
            active_model.last_error = Set(Some(error.to_string()));
            active_model.last_outcome = Set(failure);
            active_model.last_saved_count = Set(0);
            active_model.error_count = Set(error_count);
            active_model.update(db).await?;
        }
        None => {
            let new_record = sync_status::ActiveModel {
                job_name: Set(job_name.to_string()),
                last_success_at: Set(None),
                last_attempt_at: Set(Some(now)),
                last_error: Set(Some(error.to_string())),
                last_outcome: Set(failure),
                last_saved_count: Set(0),
                success_count: Set(0),
                error_count: Set(1),
                total_saved: Set(0),
                ..Default::default()
            };
            new_record.insert(db).await?;
        }
    }

    tracing::debug!("[{}] Recorded failed sync: {}", job_name, error);
    Ok(())
}

/// Status of one job, if it has ever run
pub async fn get_status(
    db: &DatabaseConnection,
    job_name: &str,
) -> Result<Option<sync_status::Model>, DbErr> {
    find_job(db, job_name).await
}

/// Status rows of every job that has run, ordered by name
pub async fn all_statuses(db: &DatabaseConnection) -> Result<Vec<sync_status::Model>, DbErr> {
    SyncStatus::find()
        .order_by_asc(sync_status::Column::JobName)
        .all(db)
        .await
}
