pub use super::aggregated_periods::Entity as AggregatedPeriods;
pub use super::analysis_results::Entity as AnalysisResults;
pub use super::corn_fields::Entity as CornFields;
pub use super::sensor_readings::Entity as SensorReadings;
pub use super::sync_status::Entity as SyncStatus;
