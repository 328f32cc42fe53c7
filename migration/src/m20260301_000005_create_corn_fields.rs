use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CornFields::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CornFields::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(CornFields::UserId).string_len(64).not_null())
                    .col(ColumnDef::new(CornFields::FieldName).string().not_null())
                    .col(ColumnDef::new(CornFields::Location).string().not_null())
                    .col(ColumnDef::new(CornFields::SoilType).string().not_null())
                    .col(ColumnDef::new(CornFields::CornVariety).string().not_null())
                    .col(ColumnDef::new(CornFields::PlantingDate).date().not_null())
                    .col(
                        ColumnDef::new(CornFields::GrowthStage)
                            .string_len(16)
                            .not_null()
                            .default("VE"),
                    )
                    .col(ColumnDef::new(CornFields::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(CornFields::UpdatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        // Owner listings are served newest first
        manager
            .create_index(
                Index::create()
                    .name("idx_corn_fields_user_created")
                    .table(CornFields::Table)
                    .col(CornFields::UserId)
                    .col((CornFields::CreatedAt, IndexOrder::Desc))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CornFields::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum CornFields {
    Table,
    Id,
    UserId,
    FieldName,
    Location,
    SoilType,
    CornVariety,
    PlantingDate,
    GrowthStage,
    CreatedAt,
    UpdatedAt,
}
