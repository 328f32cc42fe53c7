//! External analytics runner
//!
//! The analytics step is an opaque command: invoke it, wait, check the exit
//! code, then read the record it wrote to `analysis_results`.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set,
};
use std::path::Path;
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;
use tracing::{error, info, warn};

use crate::config::AnalyticsConfig;
use crate::entities::{analysis_results, prelude::AnalysisResults};

#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("Analytics command is not configured")]
    NotConfigured,

    #[error("Failed to start analytics process: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("Analytics process failed (exit code {code:?}): {stderr}")]
    Failed { code: Option<i32>, stderr: String },

    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    #[error("Analysis result {0} not found")]
    NotFound(i32),
}

/// Captured output of a successful run
#[derive(Debug, Clone)]
pub struct AnalyticsRun {
    pub stdout: String,
    pub stderr: String,
}

#[derive(Clone)]
pub struct AnalyticsService {
    command: Option<AnalyticsConfig>,
    db: DatabaseConnection,
}

impl AnalyticsService {
    pub fn new(command: Option<AnalyticsConfig>, db: DatabaseConnection) -> Self {
        Self { command, db }
    }

    pub fn is_configured(&self) -> bool {
        self.command.is_some()
    }

    /// Run the analytics command to completion
    pub async fn run(&self) -> Result<AnalyticsRun, AnalyticsError> {
        let config = self.command.as_ref().ok_or(AnalyticsError::NotConfigured)?;
        run_command(&config.command, &config.args, &config.workdir).await
    }

    /// Newest analysis record
    pub async fn latest_result(&self) -> Result<Option<analysis_results::Model>, AnalyticsError> {
        let latest = AnalysisResults::find()
            .order_by_desc(analysis_results::Column::CreatedAt)
            .one(&self.db)
            .await?;

        Ok(latest)
    }

    /// Every analysis record, newest first
    pub async fn all_results(&self) -> Result<Vec<analysis_results::Model>, AnalyticsError> {
        let rows = AnalysisResults::find()
            .order_by_desc(analysis_results::Column::CreatedAt)
            .order_by_desc(analysis_results::Column::Id)
            .all(&self.db)
            .await?;

        Ok(rows)
    }

    /// Records written for one field, newest first
    pub async fn results_for_field(
        &self,
        field_id: &str,
    ) -> Result<Vec<analysis_results::Model>, AnalyticsError> {
        let rows = AnalysisResults::find()
            .filter(analysis_results::Column::FieldId.eq(field_id))
            .order_by_desc(analysis_results::Column::CreatedAt)
            .order_by_desc(analysis_results::Column::Id)
            .all(&self.db)
            .await?;

        Ok(rows)
    }

    /// Newest record, optionally restricted to one field
    pub async fn most_recent(
        &self,
        field_id: Option<&str>,
    ) -> Result<Option<analysis_results::Model>, AnalyticsError> {
        let mut query = AnalysisResults::find();
        if let Some(field_id) = field_id {
            query = query.filter(analysis_results::Column::FieldId.eq(field_id));
        }

        let record = query
            .order_by_desc(analysis_results::Column::CreatedAt)
            .order_by_desc(analysis_results::Column::Id)
            .one(&self.db)
            .await?;

        Ok(record)
    }

    /// Records not yet acknowledged by a client, newest first
    pub async fn unnotified(&self) -> Result<Vec<analysis_results::Model>, AnalyticsError> {
        let rows = AnalysisResults::find()
            .filter(analysis_results::Column::IsNotified.eq(false))
            .order_by_desc(analysis_results::Column::CreatedAt)
            .all(&self.db)
            .await?;

        info!(count = rows.len(), "Found unnotified analysis results");
        Ok(rows)
    }

    pub async fn mark_notified(&self, id: i32) -> Result<analysis_results::Model, AnalyticsError> {
        let record = AnalysisResults::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(AnalyticsError::NotFound(id))?;

        let mut active_model: analysis_results::ActiveModel = record.into();
        active_model.is_notified = Set(true);
        active_model.notified_at = Set(Some(Utc::now().naive_utc()));
        let updated = active_model.update(&self.db).await?;

        info!(id, "Analysis result marked as notified");
        Ok(updated)
    }
}

async fn run_command(
    program: &str,
    args: &[String],
    workdir: &Path,
) -> Result<AnalyticsRun, AnalyticsError> {
    info!(program, ?args, workdir = %workdir.display(), "Starting analytics process");

    let output = Command::new(program)
        .args(args)
        .current_dir(workdir)
        .env("PYTHONUNBUFFERED", "1")
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to start analytics process");
            AnalyticsError::Spawn(e)
        })?;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

    if !stderr.trim().is_empty() {
        warn!(stderr = %stderr.trim(), "Analytics process wrote to stderr");
    }

    if output.status.success() {
        info!("Analytics process completed successfully");
        Ok(AnalyticsRun { stdout, stderr })
    } else {
        let code = output.status.code();
        error!(?code, "Analytics process exited with failure");
        Err(AnalyticsError::Failed { code, stderr })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str) -> Vec<String> {
        vec!["-c".to_string(), script.to_string()]
    }

    #[tokio::test]
    async fn test_successful_run_captures_stdout() {
        let run = run_command("sh", &sh("echo analysis done"), Path::new("."))
            .await
            .unwrap();
        assert_eq!(run.stdout.trim(), "analysis done");
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_failure() {
        let err = run_command("sh", &sh("echo model missing >&2; exit 3"), Path::new("."))
            .await
            .unwrap_err();

        match err {
            AnalyticsError::Failed { code, stderr } => {
                assert_eq!(code, Some(3));
                assert!(stderr.contains("model missing"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let err = run_command("/nonexistent/analytics-bin", &[], Path::new("."))
            .await
            .unwrap_err();
        assert!(matches!(err, AnalyticsError::Spawn(_)));
    }
}
