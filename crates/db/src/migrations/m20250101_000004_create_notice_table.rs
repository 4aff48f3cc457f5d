//! Create notice table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Notice::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Notice::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Notice::RecipientId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Notice::NoticeTypeId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Notice::SenderKind).string_len(64))
                    .col(ColumnDef::new(Notice::SenderId).string_len(64))
                    .col(ColumnDef::new(Notice::Data).json_binary().not_null())
                    .col(ColumnDef::new(Notice::SenderPath).string_len(512))
                    .col(
                        ColumnDef::new(Notice::Unseen)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Notice::Archived)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Notice::Added)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_notice_recipient")
                            .from(Notice::Table, Notice::RecipientId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_notice_notice_type")
                            .from(Notice::Table, Notice::NoticeTypeId)
                            .to(NoticeType::Table, NoticeType::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: (recipient_id, archived, unseen) (for the notices index
        // and unseen count)
        manager
            .create_index(
                Index::create()
                    .name("idx_notice_recipient_archived_unseen")
                    .table(Notice::Table)
                    .col(Notice::RecipientId)
                    .col(Notice::Archived)
                    .col(Notice::Unseen)
                    .to_owned(),
            )
            .await?;

        // Index: (sender_kind, sender_id, recipient_id) (for mark_read)
        manager
            .create_index(
                Index::create()
                    .name("idx_notice_sender_recipient")
                    .table(Notice::Table)
                    .col(Notice::SenderKind)
                    .col(Notice::SenderId)
                    .col(Notice::RecipientId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Notice::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Notice {
    Table,
    Id,
    RecipientId,
    NoticeTypeId,
    SenderKind,
    SenderId,
    Data,
    SenderPath,
    Unseen,
    Archived,
    Added,
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
