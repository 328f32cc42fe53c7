use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Written by the external analytics script, read back after each run
        manager
            .create_table(
                Table::create()
                    .table(AnalysisResults::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AnalysisResults::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(AnalysisResults::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(ColumnDef::new(AnalysisResults::FieldId).string_len(64).null())
                    .col(ColumnDef::new(AnalysisResults::Payload).json().not_null())
                    .col(
                        ColumnDef::new(AnalysisResults::IsNotified)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(AnalysisResults::NotifiedAt).timestamp().null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_analysis_results_created_at")
                    .table(AnalysisResults::Table)
                    .col((AnalysisResults::CreatedAt, IndexOrder::Desc))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AnalysisResults::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum AnalysisResults {
    Table,
    Id,
    CreatedAt,
    FieldId,
    Payload,
    IsNotified,
    NotifiedAt,
}
