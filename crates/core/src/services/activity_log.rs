//! Activity logging service.
//!
//! Centralized audit trail for mutating actions. Recording is best-effort:
//! a failed write is logged and swallowed so it can never fail the
//! operation that triggered it.

use chrono::{Duration, Utc};
use prepvault_common::{AppError, AppResult, IdGenerator};
use prepvault_db::{
    entities::{
        activity_log::{self, ActivityAction, TargetType},
        user,
    },
    repositories::{ActivityLogFilter, ActivityLogRepository},
};
use sea_orm::Set;
use serde_json::{Value, json};

/// Request provenance attached to a log entry.
#[derive(Debug, Clone, Default)]
pub struct LogContext {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub method: Option<String>,
    pub path: Option<String>,
}

/// One entry to be recorded.
#[derive(Debug, Clone)]
pub struct RecordEntry {
    action: ActivityAction,
    actor_id: Option<String>,
    actor_info: Option<Value>,
    target_type: Option<TargetType>,
    target_id: Option<String>,
    target_info: Option<Value>,
    description: Option<String>,
    metadata: Option<Value>,
    is_error: bool,
    error_details: Option<Value>,
    context: LogContext,
}

impl RecordEntry {
    /// Start an entry for an action.
    #[must_use]
    pub fn new(action: ActivityAction) -> Self {
        Self {
            action,
            actor_id: None,
            actor_info: None,
            target_type: None,
            target_id: None,
            target_info: None,
            description: None,
            metadata: None,
            is_error: false,
            error_details: None,
            context: LogContext::default(),
        }
    }

    /// Attach the acting user (id plus a snapshot of name/enrollment/role).
    #[must_use]
    pub fn actor(mut self, user: &user::Model) -> Self {
        self.actor_id = Some(user.id.clone());
        self.actor_info = Some(json!({
            "name": user.full_name,
            "enrollmentNumber": user.enrollment_number,
            "role": user.role,
        }));
        self
    }

    /// Attach the action target.
    #[must_use]
    pub fn target(mut self, target_type: TargetType, target_id: &str) -> Self {
        self.target_type = Some(target_type);
        self.target_id = Some(target_id.to_string());
        self
    }

    /// Attach a snapshot of the target.
    #[must_use]
    pub fn target_info(mut self, info: Value) -> Self {
        self.target_info = Some(info);
        self
    }

    /// Human-readable description.
    #[must_use]
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Structured metadata.
    #[must_use]
    pub fn metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Mark as an error entry with debug detail.
    #[must_use]
    pub fn error(mut self, details: Value) -> Self {
        self.is_error = true;
        self.error_details = Some(details);
        self
    }

    /// Attach request provenance.
    #[must_use]
    pub fn context(mut self, context: LogContext) -> Self {
        self.context = context;
        self
    }
}

/// Aggregate log statistics for the admin dashboard.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogStats {
    pub total: u64,
    pub today: u64,
    pub errors: u64,
    pub action_counts: Vec<ActionCount>,
    pub recent_errors: Vec<activity_log::Model>,
}

/// Count of entries for one action.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionCount {
    pub action: ActivityAction,
    pub count: u64,
}

/// Activity log service.
#[derive(Clone)]
pub struct ActivityLogService {
    log_repo: ActivityLogRepository,
    id_gen: IdGenerator,
}

impl ActivityLogService {
    /// Create a new activity log service.
    #[must_use]
    pub const fn new(log_repo: ActivityLogRepository) -> Self {
        Self {
            log_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Record an entry, swallowing any failure.
    pub async fn record(&self, entry: RecordEntry) {
        let model = activity_log::ActiveModel {
            id: Set(self.id_gen.generate()),
            user_id: Set(entry.actor_id),
            user_info: Set(entry.actor_info),
            action: Set(entry.action),
            target_type: Set(entry.target_type),
            target_id: Set(entry.target_id),
            target_info: Set(entry.target_info),
            ip: Set(entry.context.ip),
            user_agent: Set(entry.context.user_agent.map(|ua| {
                ua.chars().take(500).collect()
            })),
            method: Set(entry.context.method),
            path: Set(entry.context.path.map(|p| p.chars().take(500).collect())),
            is_error: Set(entry.is_error),
            error_details: Set(entry.error_details),
            description: Set(entry.description),
            metadata: Set(entry.metadata),
            created_at: Set(Utc::now().into()),
        };

        if let Err(e) = self.log_repo.create(model).await {
            // Logging must never break the primary operation.
            tracing::warn!(error = %e, "Failed to record activity log entry");
        }
    }

    /// Record an entry in the background (fire-and-forget).
    pub fn record_detached(&self, entry: RecordEntry) {
        let service = self.clone();
        tokio::spawn(async move {
            service.record(entry).await;
        });
    }

    /// Browse entries, newest first, with the pre-pagination total.
    pub async fn list(
        &self,
        filter: ActivityLogFilter,
        limit: u64,
        offset: u64,
    ) -> AppResult<(Vec<activity_log::Model>, u64)> {
        let entries = self.log_repo.find_filtered(&filter, limit, offset).await?;
        let total = self.log_repo.count_filtered(&filter).await?;
        Ok((entries, total))
    }

    /// Fetch a single entry.
    pub async fn get(&self, id: &str) -> AppResult<activity_log::Model> {
        self.log_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Log entry {id}")))
    }

    /// The closed set of action names, for filter dropdowns.
    #[must_use]
    pub fn actions() -> Vec<ActivityAction> {
        use sea_orm::Iterable;
        ActivityAction::iter().collect()
    }

    /// Aggregate statistics for the dashboard.
    pub async fn stats(&self) -> AppResult<LogStats> {
        let total = self.log_repo.count_filtered(&ActivityLogFilter::default()).await?;

        let today_start = Utc::now()
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc())
            .unwrap_or_else(Utc::now);
        let today = self
            .log_repo
            .count_filtered(&ActivityLogFilter {
                since: Some(today_start),
                ..Default::default()
            })
            .await?;

        let errors = self
            .log_repo
            .count_filtered(&ActivityLogFilter {
                is_error: Some(true),
                ..Default::default()
            })
            .await?;

        let action_counts = self
            .log_repo
            .count_by_action()
            .await?
            .into_iter()
            .map(|(action, count)| ActionCount { action, count })
            .collect();

        let recent_errors = self
            .log_repo
            .find_filtered(
                &ActivityLogFilter {
                    is_error: Some(true),
                    ..Default::default()
                },
                5,
                0,
            )
            .await?;

        Ok(LogStats {
            total,
            today,
            errors,
            action_counts,
            recent_errors,
        })
    }

    /// Purge entries older than the retention window. Returns how many
    /// were removed.
    pub async fn purge_expired(&self, retention_days: i64) -> AppResult<u64> {
        let cutoff = Utc::now() - Duration::days(retention_days);
        let purged = self.log_repo.purge_older_than(cutoff).await?;
        if purged > 0 {
            tracing::info!(purged, retention_days, "Purged expired activity log entries");
        }
        Ok(purged)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, DbErr, MockDatabase, MockExecResult, RuntimeErr};
    use std::sync::Arc;

    fn test_user() -> user::Model {
        user::Model {
            id: "u1".to_string(),
            enrollment_number: "21114001".to_string(),
            full_name: "Asha Verma".to_string(),
            display_picture: None,
            branch: "CSE".to_string(),
            email: "asha@example.edu".to_string(),
            role: user::Role::User,
            token: None,
            visited_question_ids: json!([]),
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_record_swallows_database_failure() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_errors([DbErr::Query(RuntimeErr::Internal(
                    "sink unavailable".to_string(),
                ))])
                .into_connection(),
        );

        let service = ActivityLogService::new(ActivityLogRepository::new(db));
        let entry = RecordEntry::new(ActivityAction::QuestionCreate)
            .actor(&test_user())
            .target(TargetType::Question, "q1")
            .describe("Asha Verma created question #1");

        // Must not panic or propagate the failure.
        service.record(entry).await;
    }

    #[tokio::test]
    async fn test_record_persists_entry() {
        let stored = activity_log::Model {
            id: "l1".to_string(),
            user_id: Some("u1".to_string()),
            user_info: None,
            action: ActivityAction::QuestionCreate,
            target_type: Some(TargetType::Question),
            target_id: Some("q1".to_string()),
            target_info: None,
            ip: None,
            user_agent: None,
            method: None,
            path: None,
            is_error: false,
            error_details: None,
            description: None,
            metadata: None,
            created_at: Utc::now().into(),
        };

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .append_query_results([[stored]])
                .into_connection(),
        );

        let service = ActivityLogService::new(ActivityLogRepository::new(db));
        service
            .record(
                RecordEntry::new(ActivityAction::QuestionCreate)
                    .target(TargetType::Question, "q1"),
            )
            .await;
    }

    #[test]
    fn test_actions_cover_closed_enum() {
        let actions = ActivityLogService::actions();
        assert!(actions.contains(&ActivityAction::Login));
        assert!(actions.contains(&ActivityAction::QuestionTransfer));
        assert!(actions.contains(&ActivityAction::SystemError));
        assert_eq!(actions.len(), 16);
    }

    #[test]
    fn test_entry_builder_truncation_happens_at_record() {
        let entry = RecordEntry::new(ActivityAction::Login).context(LogContext {
            ip: Some("10.0.0.1".to_string()),
            user_agent: Some("agent".repeat(200)),
            method: Some("GET".to_string()),
            path: Some("/api/auth/callback".to_string()),
        });
        assert_eq!(entry.context.ip.as_deref(), Some("10.0.0.1"));
    }
}
