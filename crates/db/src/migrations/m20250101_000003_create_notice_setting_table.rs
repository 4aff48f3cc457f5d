//! Create notice setting table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(NoticeSetting::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(NoticeSetting::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(NoticeSetting::UserId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(NoticeSetting::NoticeTypeId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(NoticeSetting::MediumId)
                            .small_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(NoticeSetting::Send).boolean().not_null())
                    .col(
                        ColumnDef::new(NoticeSetting::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_notice_setting_user")
                            .from(NoticeSetting::Table, NoticeSetting::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_notice_setting_notice_type")
                            .from(NoticeSetting::Table, NoticeSetting::NoticeTypeId)
                            .to(NoticeType::Table, NoticeType::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: one row per (user, notice type, medium). The
        // lazy get-or-create relies on this to collapse concurrent
        // first access to a single row.
        manager
            .create_index(
                Index::create()
                    .name("idx_notice_setting_user_type_medium")
                    .table(NoticeSetting::Table)
                    .col(NoticeSetting::UserId)
                    .col(NoticeSetting::NoticeTypeId)
                    .col(NoticeSetting::MediumId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index: (user_id, medium_id) (for unsubscribe)
        manager
            .create_index(
                Index::create()
                    .name("idx_notice_setting_user_medium")
                    .table(NoticeSetting::Table)
                    .col(NoticeSetting::UserId)
                    .col(NoticeSetting::MediumId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(NoticeSetting::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum NoticeSetting {
    Table,
    Id,
    UserId,
    NoticeTypeId,
    MediumId,
    Send,
    CreatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}

#[derive(Iden)]
enum NoticeType {
    Table,
    Id,
}
