//! Admin endpoints.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post, put},
};
use prepvault_common::AppResult;
use prepvault_core::CreateQuestionInput;
use prepvault_db::entities::{question, user};
use serde::{Deserialize, Serialize};

use crate::{
    endpoints::auth::UserResponse,
    endpoints::questions::QuestionResponse,
    extractors::{AdminUser, ClientContext, SuperAdminUser},
    middleware::AppState,
    response::{ApiResponse, PaginationMeta},
};

/// User directory query parameters.
#[derive(Debug, Deserialize)]
pub struct ListUsersQuery {
    pub search: Option<String>,
    pub role: Option<user::Role>,
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
}

const fn default_page() -> u64 {
    1
}

const fn default_limit() -> u64 {
    20
}

/// User directory body.
#[derive(Serialize)]
pub struct UserListResponse {
    pub users: Vec<UserResponse>,
    pub pagination: PaginationMeta,
}

/// Superadmin: browse the user directory.
async fn list_users(
    SuperAdminUser(_admin): SuperAdminUser,
    State(state): State<AppState>,
    Query(query): Query<ListUsersQuery>,
) -> AppResult<ApiResponse<UserListResponse>> {
    let page = query.page.max(1);
    let limit = query.limit.clamp(1, 100);
    let offset = (page - 1) * limit;

    let (users, total) = state
        .user_service
        .search_directory(query.search.as_deref(), query.role, limit, offset)
        .await?;

    Ok(ApiResponse::ok(UserListResponse {
        users: users.into_iter().map(Into::into).collect(),
        pagination: PaginationMeta::new(page, limit, total),
    }))
}

/// Role-change request.
#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub role: user::Role,
}

/// Superadmin: change a user's role (user/admin only).
async fn update_role(
    SuperAdminUser(admin): SuperAdminUser,
    State(state): State<AppState>,
    ClientContext(ctx): ClientContext,
    Path(id): Path<String>,
    Json(req): Json<UpdateRoleRequest>,
) -> AppResult<ApiResponse<UserResponse>> {
    let updated = state
        .user_service
        .update_role(&admin, &id, req.role, ctx)
        .await?;
    Ok(ApiResponse::ok(updated.into()))
}

/// Add-question-for-user request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddQuestionForUserRequest {
    pub user_id: String,
    #[serde(flatten)]
    pub input: CreateQuestionInput,
}

/// Superadmin: submit a question on behalf of a user.
async fn add_question_for_user(
    SuperAdminUser(admin): SuperAdminUser,
    State(state): State<AppState>,
    ClientContext(ctx): ClientContext,
    Json(req): Json<AddQuestionForUserRequest>,
) -> AppResult<ApiResponse<QuestionResponse>> {
    // Validate the target user exists before attributing content to them.
    let target = state.user_service.get(&req.user_id).await?;

    let created = state
        .question_service
        .create(Some(&target.id), &admin, req.input, ctx)
        .await?;
    Ok(ApiResponse::ok(created.into()))
}

/// Per-type question count.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeCount {
    #[serde(rename = "type")]
    pub question_type: question::QuestionType,
    pub count: u64,
}

/// A company with its question count.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopCompany {
    pub id: String,
    pub name: String,
    pub logo: Option<String>,
    pub count: u64,
}

/// Dashboard statistics.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub total_users: u64,
    pub total_questions: u64,
    pub total_companies: u64,
    pub questions_by_type: Vec<TypeCount>,
    pub top_companies: Vec<TopCompany>,
}

/// Admin: dashboard stats.
async fn stats(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<StatsResponse>> {
    let total_users = state.user_service.count().await?;
    let total_questions = state.question_service.count().await?;
    let total_companies = state.company_service.count().await?;

    let questions_by_type = state
        .question_service
        .count_by_type()
        .await?
        .into_iter()
        .map(|(question_type, count)| TypeCount {
            question_type,
            count,
        })
        .collect();

    let top_companies = state
        .question_service
        .top_companies(10)
        .await?
        .into_iter()
        .map(|(company, count)| TopCompany {
            id: company.id,
            name: company.name,
            logo: company.logo,
            count,
        })
        .collect();

    Ok(ApiResponse::ok(StatsResponse {
        total_users,
        total_questions,
        total_companies,
        questions_by_type,
        top_companies,
    }))
}

/// Create the admin router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/{id}/role", put(update_role))
        .route("/questions", post(add_question_for_user))
        .route("/stats", get(stats))
}
