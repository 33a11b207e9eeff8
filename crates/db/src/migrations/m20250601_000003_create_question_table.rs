//! Create question table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Question::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Question::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(Question::SubmittedBy).string_len(32))
                    .col(ColumnDef::new(Question::CompanyId).string_len(32).not_null())
                    .col(ColumnDef::new(Question::QuestionNumber).integer().not_null())
                    .col(ColumnDef::new(Question::QuestionType).string_len(16).not_null())
                    .col(ColumnDef::new(Question::OtherType).string_len(128))
                    .col(ColumnDef::new(Question::Month).integer().not_null())
                    .col(ColumnDef::new(Question::Year).integer().not_null())
                    .col(ColumnDef::new(Question::Body).text().not_null())
                    .col(ColumnDef::new(Question::Suggestions).text())
                    .col(
                        ColumnDef::new(Question::OwnershipHistory)
                            .json_binary()
                            .not_null()
                            .default("[]"),
                    )
                    .col(
                        ColumnDef::new(Question::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Question::UpdatedAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;

        // Unique index: (company_id, question_number).
        // This is what turns a concurrent numbering race into a detectable
        // conflict the store can retry.
        manager
            .create_index(
                Index::create()
                    .name("idx_question_company_number")
                    .table(Question::Table)
                    .col(Question::CompanyId)
                    .col(Question::QuestionNumber)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index: (company_id, year) for per-company listings
        manager
            .create_index(
                Index::create()
                    .name("idx_question_company_year")
                    .table(Question::Table)
                    .col(Question::CompanyId)
                    .col(Question::Year)
                    .to_owned(),
            )
            .await?;

        // Index: (submitted_by, created_at) for the submissions page
        manager
            .create_index(
                Index::create()
                    .name("idx_question_submitted_by_created_at")
                    .table(Question::Table)
                    .col(Question::SubmittedBy)
                    .col(Question::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // Index: (question_type, created_at) for type filters
        manager
            .create_index(
                Index::create()
                    .name("idx_question_type_created_at")
                    .table(Question::Table)
                    .col(Question::QuestionType)
                    .col(Question::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // Index: created_at for recency sorting
        manager
            .create_index(
                Index::create()
                    .name("idx_question_created_at")
                    .table(Question::Table)
                    .col(Question::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Question::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Question {
    Table,
    Id,
    SubmittedBy,
    CompanyId,
    QuestionNumber,
    QuestionType,
    OtherType,
    Month,
    Year,
    Body,
    Suggestions,
    OwnershipHistory,
    CreatedAt,
    UpdatedAt,
}
