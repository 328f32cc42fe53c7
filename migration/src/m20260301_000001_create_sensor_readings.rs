use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Raw readings ingested from the telemetry channel, one row per farm-time timestamp
        manager
            .create_table(
                Table::create()
                    .table(SensorReadings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SensorReadings::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(SensorReadings::Timestamp)
                            .timestamp()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SensorReadings::FieldId)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(ColumnDef::new(SensorReadings::Temperature).double().not_null())
                    .col(ColumnDef::new(SensorReadings::Humidity).double().not_null())
                    .col(ColumnDef::new(SensorReadings::SoilMoisture).double().not_null())
                    .col(ColumnDef::new(SensorReadings::SoilPh).double().not_null())
                    .col(ColumnDef::new(SensorReadings::LightIntensity).double().not_null())
                    .col(
                        ColumnDef::new(SensorReadings::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique timestamp is the dedup key; inserts rely on ON CONFLICT against it
        manager
            .create_index(
                Index::create()
                    .name("idx_sensor_readings_timestamp")
                    .table(SensorReadings::Table)
                    .col(SensorReadings::Timestamp)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SensorReadings::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum SensorReadings {
    Table,
    Id,
    Timestamp,
    FieldId,
    Temperature,
    Humidity,
    SoilMoisture,
    SoilPh,
    LightIntensity,
    CreatedAt,
}
