//! Activity log repository.

use std::sync::Arc;

use crate::entities::{ActivityLog, activity_log};
use chrono::{DateTime, Utc};
use prepvault_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, FromQueryResult,
    Order, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, sea_query::Expr,
    sea_query::extension::postgres::PgExpr,
};

#[derive(FromQueryResult)]
struct ActionCountRow {
    action: activity_log::ActivityAction,
    count: i64,
}

/// Filters for browsing the activity log.
#[derive(Debug, Clone, Default)]
pub struct ActivityLogFilter {
    pub action: Option<activity_log::ActivityAction>,
    pub target_type: Option<activity_log::TargetType>,
    pub user_id: Option<String>,
    pub is_error: Option<bool>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    /// Case-insensitive match over the description text.
    pub search: Option<String>,
}

/// Activity log repository for database operations.
#[derive(Clone)]
pub struct ActivityLogRepository {
    db: Arc<DatabaseConnection>,
}

impl ActivityLogRepository {
    /// Create a new activity log repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Append a log entry.
    pub async fn create(&self, model: activity_log::ActiveModel) -> AppResult<activity_log::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a log entry by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<activity_log::Model>> {
        ActivityLog::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    fn build_condition(filter: &ActivityLogFilter) -> Condition {
        let mut condition = Condition::all();

        if let Some(action) = filter.action {
            condition = condition.add(activity_log::Column::Action.eq(action));
        }
        if let Some(target_type) = filter.target_type {
            condition = condition.add(activity_log::Column::TargetType.eq(target_type));
        }
        if let Some(ref user_id) = filter.user_id {
            condition = condition.add(activity_log::Column::UserId.eq(user_id.as_str()));
        }
        if let Some(is_error) = filter.is_error {
            condition = condition.add(activity_log::Column::IsError.eq(is_error));
        }
        if let Some(since) = filter.since {
            condition = condition.add(activity_log::Column::CreatedAt.gte(since));
        }
        if let Some(until) = filter.until {
            condition = condition.add(activity_log::Column::CreatedAt.lte(until));
        }
        if let Some(ref search) = filter.search {
            let pattern = format!("%{search}%");
            condition = condition
                .add(Expr::col(activity_log::Column::Description).ilike(pattern));
        }

        condition
    }

    /// Browse log entries, newest first.
    pub async fn find_filtered(
        &self,
        filter: &ActivityLogFilter,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<activity_log::Model>> {
        ActivityLog::find()
            .filter(Self::build_condition(filter))
            .order_by_desc(activity_log::Column::CreatedAt)
            .limit(limit)
            .offset(offset)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count entries matching the filter.
    pub async fn count_filtered(&self, filter: &ActivityLogFilter) -> AppResult<u64> {
        ActivityLog::find()
            .filter(Self::build_condition(filter))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Entry counts grouped by action, most frequent first.
    pub async fn count_by_action(
        &self,
    ) -> AppResult<Vec<(activity_log::ActivityAction, u64)>> {
        let rows = ActivityLog::find()
            .select_only()
            .column(activity_log::Column::Action)
            .column_as(activity_log::Column::Id.count(), "count")
            .group_by(activity_log::Column::Action)
            .order_by(activity_log::Column::Id.count(), Order::Desc)
            .limit(10)
            .into_model::<ActionCountRow>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|r| (r.action, r.count.max(0) as u64))
            .collect())
    }

    /// Delete entries older than the cutoff. Returns how many were purged.
    pub async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> AppResult<u64> {
        let result = ActivityLog::delete_many()
            .filter(activity_log::Column::CreatedAt.lt(cutoff))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn test_entry(id: &str, action: activity_log::ActivityAction) -> activity_log::Model {
        activity_log::Model {
            id: id.to_string(),
            user_id: Some("u1".to_string()),
            user_info: None,
            action,
            target_type: Some(activity_log::TargetType::Question),
            target_id: Some("q1".to_string()),
            target_info: None,
            ip: None,
            user_agent: None,
            method: Some("POST".to_string()),
            path: Some("/api/questions".to_string()),
            is_error: false,
            error_details: None,
            description: Some("created question #1".to_string()),
            metadata: None,
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_find_filtered() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![
                    test_entry("l1", activity_log::ActivityAction::QuestionCreate),
                    test_entry("l2", activity_log::ActivityAction::QuestionDelete),
                ]])
                .into_connection(),
        );

        let repo = ActivityLogRepository::new(db);
        let entries = repo
            .find_filtered(&ActivityLogFilter::default(), 50, 0)
            .await
            .unwrap();
        assert_eq!(entries.len(), 2);
    }

    #[tokio::test]
    async fn test_purge_older_than() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 12,
                }])
                .into_connection(),
        );

        let repo = ActivityLogRepository::new(db);
        let purged = repo
            .purge_older_than(Utc::now() - chrono::Duration::days(30))
            .await
            .unwrap();
        assert_eq!(purged, 12);
    }
}
