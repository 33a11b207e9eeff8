//! Create activity log table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ActivityLog::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(ActivityLog::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(ActivityLog::UserId).string_len(32))
                    .col(ColumnDef::new(ActivityLog::UserInfo).json_binary())
                    .col(ColumnDef::new(ActivityLog::Action).string_len(32).not_null())
                    .col(ColumnDef::new(ActivityLog::TargetType).string_len(16))
                    .col(ColumnDef::new(ActivityLog::TargetId).string_len(32))
                    .col(ColumnDef::new(ActivityLog::TargetInfo).json_binary())
                    .col(ColumnDef::new(ActivityLog::Ip).string_len(64))
                    .col(ColumnDef::new(ActivityLog::UserAgent).string_len(512))
                    .col(ColumnDef::new(ActivityLog::Method).string_len(16))
                    .col(ColumnDef::new(ActivityLog::Path).string_len(512))
                    .col(ColumnDef::new(ActivityLog::IsError).boolean().not_null().default(false))
                    .col(ColumnDef::new(ActivityLog::ErrorDetails).json_binary())
                    .col(ColumnDef::new(ActivityLog::Description).text())
                    .col(ColumnDef::new(ActivityLog::Metadata).json_binary())
                    .col(
                        ColumnDef::new(ActivityLog::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: created_at (retention purge + recency listing)
        manager
            .create_index(
                Index::create()
                    .name("idx_activity_log_created_at")
                    .table(ActivityLog::Table)
                    .col(ActivityLog::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // Index: (user_id, created_at)
        manager
            .create_index(
                Index::create()
                    .name("idx_activity_log_user_created_at")
                    .table(ActivityLog::Table)
                    .col(ActivityLog::UserId)
                    .col(ActivityLog::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // Index: (action, created_at)
        manager
            .create_index(
                Index::create()
                    .name("idx_activity_log_action_created_at")
                    .table(ActivityLog::Table)
                    .col(ActivityLog::Action)
                    .col(ActivityLog::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // Index: (target_type, target_id)
        manager
            .create_index(
                Index::create()
                    .name("idx_activity_log_target")
                    .table(ActivityLog::Table)
                    .col(ActivityLog::TargetType)
                    .col(ActivityLog::TargetId)
                    .to_owned(),
            )
            .await?;

        // Index: (is_error, created_at)
        manager
            .create_index(
                Index::create()
                    .name("idx_activity_log_is_error_created_at")
                    .table(ActivityLog::Table)
                    .col(ActivityLog::IsError)
                    .col(ActivityLog::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ActivityLog::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum ActivityLog {
    Table,
    Id,
    UserId,
    UserInfo,
    Action,
    TargetType,
    TargetId,
    TargetInfo,
    Ip,
    UserAgent,
    Method,
    Path,
    IsError,
    ErrorDetails,
    Description,
    Metadata,
    CreatedAt,
}
