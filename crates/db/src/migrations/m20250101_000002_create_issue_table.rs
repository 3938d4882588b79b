//! Create issue table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Issue::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Issue::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(Issue::Category).string_len(64).not_null())
                    .col(ColumnDef::new(Issue::Description).text().not_null())
                    .col(ColumnDef::new(Issue::Latitude).double().not_null())
                    .col(ColumnDef::new(Issue::Longitude).double().not_null())
                    .col(ColumnDef::new(Issue::LocationText).string_len(200))
                    .col(
                        ColumnDef::new(Issue::Status)
                            .string_len(32)
                            .not_null()
                            .default("Reported"),
                    )
                    .col(ColumnDef::new(Issue::UpvoteCount).integer().not_null().default(0))
                    .col(ColumnDef::new(Issue::Embedding).json_binary())
                    .col(ColumnDef::new(Issue::Geojson).json_binary())
                    .col(ColumnDef::new(Issue::ReporterId).string_len(32).not_null())
                    .col(
                        ColumnDef::new(Issue::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_issue_reporter")
                            .from(Issue::Table, Issue::ReporterId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: (latitude, longitude) for bounding-box lookups
        manager
            .create_index(
                Index::create()
                    .name("idx_issue_lat_lng")
                    .table(Issue::Table)
                    .col(Issue::Latitude)
                    .col(Issue::Longitude)
                    .to_owned(),
            )
            .await?;

        // Index: reporter_id (for profile pages)
        manager
            .create_index(
                Index::create()
                    .name("idx_issue_reporter_id")
                    .table(Issue::Table)
                    .col(Issue::ReporterId)
                    .to_owned(),
            )
            .await?;

        // Index: created_at (for retention sweep and weekly report)
        manager
            .create_index(
                Index::create()
                    .name("idx_issue_created_at")
                    .table(Issue::Table)
                    .col(Issue::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Issue::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Issue {
    Table,
    Id,
    Category,
    Description,
    Latitude,
    Longitude,
    LocationText,
    Status,
    UpvoteCount,
    Embedding,
    Geojson,
    ReporterId,
    CreatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
