//! Create company tip table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CompanyTip::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(CompanyTip::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(CompanyTip::CompanyId).string_len(32).not_null())
                    .col(ColumnDef::new(CompanyTip::AuthorId).string_len(32).not_null())
                    .col(ColumnDef::new(CompanyTip::Content).text().not_null())
                    .col(ColumnDef::new(CompanyTip::ParentTipId).string_len(32))
                    .col(
                        ColumnDef::new(CompanyTip::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(CompanyTip::UpdatedAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;

        // Index: (company_id, created_at) for per-company listings
        manager
            .create_index(
                Index::create()
                    .name("idx_company_tip_company_created_at")
                    .table(CompanyTip::Table)
                    .col(CompanyTip::CompanyId)
                    .col(CompanyTip::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // Index: parent_tip_id for reply lookups
        manager
            .create_index(
                Index::create()
                    .name("idx_company_tip_parent")
                    .table(CompanyTip::Table)
                    .col(CompanyTip::ParentTipId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CompanyTip::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum CompanyTip {
    Table,
    Id,
    CompanyId,
    AuthorId,
    Content,
    ParentTipId,
    CreatedAt,
    UpdatedAt,
}
