//! Scans table.
//!
//! Rows are immutable; the owner id references an external identity
//! store, so there is no foreign key.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Scans::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Scans::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Scans::UserId).uuid().not_null())
                    .col(ColumnDef::new(Scans::ImageKey).string().not_null())
                    .col(ColumnDef::new(Scans::Species).string().not_null())
                    .col(ColumnDef::new(Scans::CommonName).string().not_null())
                    .col(ColumnDef::new(Scans::SafeToEat).boolean().not_null())
                    .col(ColumnDef::new(Scans::SafeToTouch).boolean().not_null())
                    .col(ColumnDef::new(Scans::Confidence).string_len(8).not_null())
                    .col(ColumnDef::new(Scans::Warnings).text().not_null())
                    .col(ColumnDef::new(Scans::Description).text().not_null())
                    .col(
                        ColumnDef::new(Scans::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Owner history, newest first
        manager
            .create_index(
                Index::create()
                    .name("idx_scans_user_created")
                    .table(Scans::Table)
                    .col(Scans::UserId)
                    .col((Scans::CreatedAt, IndexOrder::Desc))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Scans::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Scans {
    Table,
    Id,
    UserId,
    ImageKey,
    Species,
    CommonName,
    SafeToEat,
    SafeToTouch,
    Confidence,
    Warnings,
    Description,
    CreatedAt,
}
