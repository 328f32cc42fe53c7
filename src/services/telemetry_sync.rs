//! Telemetry sync engine
//!
//! The only path by which channel entries reach the reading store:
//! fetch -> validate -> normalize timestamp -> dedup -> persist.
//!
//! Every path normalizes `created_at` to farm time (UTC+8) before the dedup
//! check, so the latest-entry sync and the batch reconcile agree on keys.
//! Transport failures propagate as [`SyncError`]; storage failures are
//! logged per reading and never abort a batch.

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::services::reading_store::{ReadingStore, SensorReading};
use crate::services::thingspeak::{FeedEntry, FeedSource, TelemetryError, is_valid_feed};

/// Farm-local offset applied to every provider timestamp (Asia/Manila)
pub const FARM_UTC_OFFSET_HOURS: i64 = 8;

/// Entries pulled per reconcile run
pub const RECENT_BATCH_SIZE: u32 = 10;

/// Convert a provider instant to the stored farm-local wall-clock time
pub fn to_farm_time(instant: DateTime<Utc>) -> NaiveDateTime {
    (instant + Duration::hours(FARM_UTC_OFFSET_HOURS)).naive_utc()
}

/// Current farm-local wall-clock time
pub fn farm_now() -> NaiveDateTime {
    to_farm_time(Utc::now())
}

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Failed to sync from ThingSpeak: {0}")]
    Telemetry(#[from] TelemetryError),
}

/// Terminal state of a sync run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Every usable entry was saved or already stored
    Success,
    /// At least one reading failed to persist
    Partial,
    /// Fetch failed; nothing was processed
    Failure,
}

impl SyncOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncOutcome::Success => "success",
            SyncOutcome::Partial => "partial",
            SyncOutcome::Failure => "failure",
        }
    }
}

/// Summary of one reconcile run
#[derive(Debug, Clone)]
pub struct SyncRun {
    pub started_at: DateTime<Utc>,
    /// Whether the leading latest-entry sync stored a new reading
    pub latest_saved: bool,
    /// Entries returned by the batch fetch
    pub examined: usize,
    pub invalid: usize,
    pub duplicates: usize,
    pub failed: usize,
    /// New readings stored by the batch
    pub batch_saved: usize,
}

impl SyncRun {
    fn new(started_at: DateTime<Utc>, latest_saved: bool, examined: usize) -> Self {
        Self {
            started_at,
            latest_saved,
            examined,
            invalid: 0,
            duplicates: 0,
            failed: 0,
            batch_saved: 0,
        }
    }

    /// Total new readings stored by this run, latest entry included
    pub fn saved(&self) -> usize {
        self.batch_saved + usize::from(self.latest_saved)
    }

    pub fn outcome(&self) -> SyncOutcome {
        if self.failed > 0 {
            SyncOutcome::Partial
        } else {
            SyncOutcome::Success
        }
    }
}

enum Persisted {
    Saved,
    Duplicate,
    Failed,
}

pub struct TelemetrySyncService {
    source: Arc<dyn FeedSource>,
    store: Arc<dyn ReadingStore>,
    field_id: String,
}

impl TelemetrySyncService {
    pub fn new(
        source: Arc<dyn FeedSource>,
        store: Arc<dyn ReadingStore>,
        field_id: impl Into<String>,
    ) -> Self {
        Self {
            source,
            store,
            field_id: field_id.into(),
        }
    }

    /// Store the channel's newest entry if it is not stored yet.
    ///
    /// Returns `Ok(true)` only when a new reading was written.
    pub async fn sync_latest(&self) -> Result<bool, SyncError> {
        debug!("Starting ThingSpeak latest data sync");

        let Some(entry) = self.source.fetch_latest().await? else {
            debug!("No latest data available from ThingSpeak");
            return Ok(false);
        };

        let Some(created_at) = entry.created_at_utc() else {
            warn!(created_at = ?entry.created_at, "Latest entry has an unparseable timestamp");
            return Ok(false);
        };

        let timestamp = to_farm_time(created_at);
        Ok(matches!(self.persist(timestamp, &entry).await, Persisted::Saved))
    }

    /// Latest sync followed by a batch pass over recent entries.
    ///
    /// Returns the number of new readings stored.
    pub async fn sync_recent(&self) -> Result<usize, SyncError> {
        Ok(self.reconcile().await?.saved())
    }

    /// Full reconcile run with per-entry accounting
    pub async fn reconcile(&self) -> Result<SyncRun, SyncError> {
        let started_at = Utc::now();
        info!("Starting ThingSpeak data sync");

        // Freshness first, independent of how the batch goes
        let latest_saved = self.sync_latest().await?;

        let entries = self.source.fetch_recent(RECENT_BATCH_SIZE).await?;
        let mut run = SyncRun::new(started_at, latest_saved, entries.len());

        let mut usable: Vec<(NaiveDateTime, FeedEntry)> = Vec::with_capacity(entries.len());
        for entry in entries {
            let created_at = is_valid_feed(&entry)
                .then(|| entry.created_at_utc())
                .flatten();

            match created_at {
                Some(created_at) => usable.push((to_farm_time(created_at), entry)),
                None => {
                    debug!(entry_id = ?entry.entry_id, "Skipping incomplete feed entry");
                    run.invalid += 1;
                }
            }
        }

        usable.sort_by_key(|(timestamp, _)| *timestamp);

        for (timestamp, entry) in &usable {
            match self.persist(*timestamp, entry).await {
                Persisted::Saved => run.batch_saved += 1,
                Persisted::Duplicate => run.duplicates += 1,
                Persisted::Failed => run.failed += 1,
            }
        }

        info!(
            examined = run.examined,
            saved = run.saved(),
            duplicates = run.duplicates,
            invalid = run.invalid,
            failed = run.failed,
            outcome = run.outcome().as_str(),
            "ThingSpeak sync complete"
        );

        Ok(run)
    }

    async fn persist(&self, timestamp: NaiveDateTime, entry: &FeedEntry) -> Persisted {
        match self.store.exists_at(timestamp).await {
            Ok(true) => {
                debug!(%timestamp, "Reading already stored");
                return Persisted::Duplicate;
            }
            Ok(false) => {}
            Err(e) => {
                error!(%timestamp, error = %e, "Failed to check for existing reading");
                return Persisted::Failed;
            }
        }

        let measurements = entry.measurements();
        let out_of_range = measurements.out_of_range_channels();
        if !out_of_range.is_empty() {
            warn!(%timestamp, channels = ?out_of_range, "Measurement outside plausible sensor range");
        }

        let reading = SensorReading {
            timestamp,
            field_id: self.field_id.clone(),
            measurements,
        };

        match self.store.insert_if_absent(reading).await {
            Ok(true) => {
                info!(
                    %timestamp,
                    temperature = measurements.temperature,
                    humidity = measurements.humidity,
                    soil_moisture = measurements.soil_moisture,
                    soil_ph = measurements.soil_ph,
                    light_intensity = measurements.light_intensity,
                    "Sensor reading saved"
                );
                Persisted::Saved
            }
            Ok(false) => {
                // Another sync stored the same timestamp between check and insert
                debug!(%timestamp, "Reading stored concurrently, insert ignored");
                Persisted::Duplicate
            }
            Err(e) => {
                error!(%timestamp, error = %e, "Error saving sensor reading");
                Persisted::Failed
            }
        }
    }
}
