use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AggregatedPeriods::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AggregatedPeriods::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(AggregatedPeriods::Period)
                            .string_len(10)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AggregatedPeriods::PeriodStart)
                            .timestamp()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AggregatedPeriods::PeriodEnd)
                            .timestamp()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AggregatedPeriods::ReadingCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(AggregatedPeriods::AvgTemperature).double().not_null())
                    .col(ColumnDef::new(AggregatedPeriods::AvgHumidity).double().not_null())
                    .col(ColumnDef::new(AggregatedPeriods::AvgSoilMoisture).double().not_null())
                    .col(ColumnDef::new(AggregatedPeriods::AvgSoilPh).double().not_null())
                    .col(ColumnDef::new(AggregatedPeriods::AvgLightIntensity).double().not_null())
                    .col(
                        ColumnDef::new(AggregatedPeriods::ComputedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // One row per (period, period_start); recomputation upserts into it
        manager
            .create_index(
                Index::create()
                    .name("idx_aggregated_periods_period_start")
                    .table(AggregatedPeriods::Table)
                    .col(AggregatedPeriods::Period)
                    .col(AggregatedPeriods::PeriodStart)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AggregatedPeriods::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum AggregatedPeriods {
    Table,
    Id,
    Period,
    PeriodStart,
    PeriodEnd,
    ReadingCount,
    AvgTemperature,
    AvgHumidity,
    AvgSoilMoisture,
    AvgSoilPh,
    AvgLightIntensity,
    ComputedAt,
}
