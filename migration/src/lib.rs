pub use sea_orm_migration::prelude::*;

mod m20260301_000001_create_sensor_readings;
mod m20260301_000002_create_aggregated_periods;
mod m20260301_000003_create_sync_status;
mod m20260301_000004_create_analysis_results;
mod m20260301_000005_create_corn_fields;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260301_000001_create_sensor_readings::Migration),
            Box::new(m20260301_000002_create_aggregated_periods::Migration),
            Box::new(m20260301_000003_create_sync_status::Migration),
            Box::new(m20260301_000004_create_analysis_results::Migration),
            Box::new(m20260301_000005_create_corn_fields::Migration),
        ]
    }
}
