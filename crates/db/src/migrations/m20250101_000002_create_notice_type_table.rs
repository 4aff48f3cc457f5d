//! Create notice type table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(NoticeType::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(NoticeType::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(NoticeType::Label)
                            .string_len(64)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(NoticeType::Display)
                            .string_len(128)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(NoticeType::Description)
                            .string_len(256)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(NoticeType::DefaultSensitivity)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(NoticeType::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(NoticeType::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum NoticeType {
    Table,
    Id,
    Label,
    Display,
    Description,
    DefaultSensitivity,
    CreatedAt,
}
