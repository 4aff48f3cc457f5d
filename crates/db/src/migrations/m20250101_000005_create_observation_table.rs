//! Create observation table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Observation::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Observation::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Observation::UserId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Observation::NoticeTypeId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Observation::ObservedKind)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Observation::ObservedId)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Observation::Send)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Observation::Added)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_observation_user")
                            .from(Observation::Table, Observation::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_observation_notice_type")
                            .from(Observation::Table, Observation::NoticeTypeId)
                            .to(NoticeType::Table, NoticeType::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: (observed_kind, observed_id, notice_type_id) (for
        // observer fan-out and cascade delete)
        manager
            .create_index(
                Index::create()
                    .name("idx_observation_observed_type")
                    .table(Observation::Table)
                    .col(Observation::ObservedKind)
                    .col(Observation::ObservedId)
                    .col(Observation::NoticeTypeId)
                    .to_owned(),
            )
            .await?;

        // Index: (user_id, observed_kind) (for listing a user's
        // observations)
        manager
            .create_index(
                Index::create()
                    .name("idx_observation_user_kind")
                    .table(Observation::Table)
                    .col(Observation::UserId)
                    .col(Observation::ObservedKind)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Observation::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Observation {
    Table,
    Id,
    UserId,
    NoticeTypeId,
    ObservedKind,
    ObservedId,
    Send,
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
