//! Activity log endpoints (admin only).

use axum::{
    Router,
    extract::{Path, Query, State},
    routing::get,
};
use chrono::{DateTime, Utc};
use prepvault_common::AppResult;
use prepvault_core::LogStats;
use prepvault_db::entities::activity_log::{self, ActivityAction, TargetType};
use prepvault_db::repositories::ActivityLogFilter;
use serde::{Deserialize, Serialize};

use crate::{
    extractors::AdminUser,
    middleware::AppState,
    response::{ApiResponse, PaginationMeta},
};

/// Log browsing query parameters.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListLogsQuery {
    pub action: Option<ActivityAction>,
    pub target_type: Option<TargetType>,
    pub user_id: Option<String>,
    pub is_error: Option<bool>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub search: Option<String>,
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
}

const fn default_page() -> u64 {
    1
}

const fn default_limit() -> u64 {
    50
}

/// Log listing body.
#[derive(Serialize)]
pub struct LogListResponse {
    pub logs: Vec<activity_log::Model>,
    pub pagination: PaginationMeta,
}

/// Browse log entries with filters.
async fn list(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    Query(query): Query<ListLogsQuery>,
) -> AppResult<ApiResponse<LogListResponse>> {
    let page = query.page.max(1);
    let limit = query.limit.clamp(1, 200);
    let offset = (page - 1) * limit;

    let filter = ActivityLogFilter {
        action: query.action,
        target_type: query.target_type,
        user_id: query.user_id,
        is_error: query.is_error,
        since: query.start_date,
        until: query.end_date,
        search: query.search,
    };

    let (logs, total) = state.activity_log.list(filter, limit, offset).await?;

    Ok(ApiResponse::ok(LogListResponse {
        logs,
        pagination: PaginationMeta::new(page, limit, total),
    }))
}

/// Aggregate log statistics.
async fn stats(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<LogStats>> {
    Ok(ApiResponse::ok(state.activity_log.stats().await?))
}

/// Action vocabulary response.
#[derive(Serialize)]
pub struct ActionsResponse {
    pub actions: Vec<ActivityAction>,
}

/// The closed set of action types, for filter dropdowns.
async fn actions(AdminUser(_admin): AdminUser) -> ApiResponse<ActionsResponse> {
    ApiResponse::ok(ActionsResponse {
        actions: prepvault_core::ActivityLogService::actions(),
    })
}

/// Fetch one log entry with full details.
async fn get_one(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<activity_log::Model>> {
    Ok(ApiResponse::ok(state.activity_log.get(&id).await?))
}

/// Create the logs router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list))
        .route("/stats", get(stats))
        .route("/actions", get(actions))
        .route("/{id}", get(get_one))
}
