//! Create claim table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Claim::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Claim::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(Claim::QuestionId).string_len(32).not_null())
                    .col(ColumnDef::new(Claim::UserId).string_len(32).not_null())
                    .col(
                        ColumnDef::new(Claim::ClaimedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: one claim per (question, user) pair
        manager
            .create_index(
                Index::create()
                    .name("idx_claim_question_user")
                    .table(Claim::Table)
                    .col(Claim::QuestionId)
                    .col(Claim::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index: user_id for per-user claim counts
        manager
            .create_index(
                Index::create()
                    .name("idx_claim_user_id")
                    .table(Claim::Table)
                    .col(Claim::UserId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Claim::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Claim {
    Table,
    Id,
    QuestionId,
    UserId,
    ClaimedAt,
}
