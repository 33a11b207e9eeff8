//! Create company table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Company::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Company::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(Company::Name).string_len(256).not_null())
                    .col(ColumnDef::new(Company::NameLower).string_len(256).not_null())
                    .col(ColumnDef::new(Company::Logo).string_len(1024))
                    .col(ColumnDef::new(Company::Description).text())
                    .col(ColumnDef::new(Company::Roles).json_binary().not_null().default("[]"))
                    .col(ColumnDef::new(Company::AddedBy).string_len(32).not_null())
                    .col(
                        ColumnDef::new(Company::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Company::UpdatedAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;

        // Unique index: name_lower (case-insensitive name uniqueness)
        manager
            .create_index(
                Index::create()
                    .name("idx_company_name_lower")
                    .table(Company::Table)
                    .col(Company::NameLower)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index: name (for sorted listings)
        manager
            .create_index(
                Index::create()
                    .name("idx_company_name")
                    .table(Company::Table)
                    .col(Company::Name)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Company::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Company {
    Table,
    Id,
    Name,
    NameLower,
    Logo,
    Description,
    Roles,
    AddedBy,
    CreatedAt,
    UpdatedAt,
}
