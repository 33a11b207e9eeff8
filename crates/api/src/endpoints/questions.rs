//! Question endpoints.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use prepvault_common::AppResult;
use prepvault_core::{
    ActionKind, CreateQuestionInput, QuestionWithCompany, RankedQuestion, SearchQuestionsInput,
    SortDirection, SortField, UpdateQuestionInput,
};
use prepvault_db::entities::{claim, company, question, user};
use serde::{Deserialize, Serialize};

use crate::{
    extractors::{AdminUser, AuthUser, ClientContext, MaybeAuthUser},
    middleware::AppState,
    response::{ApiResponse, PaginationMeta},
};

/// Company fields denormalized onto question responses.
#[derive(Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CompanyRef {
    pub id: String,
    pub name: String,
    pub logo: Option<String>,
}

impl From<company::Model> for CompanyRef {
    fn from(company: company::Model) -> Self {
        Self {
            id: company.id,
            name: company.name,
            logo: company.logo,
        }
    }
}

/// Question list/detail response. Listings stay anonymous: the owner is
/// not exposed here.
#[derive(Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct QuestionResponse {
    pub id: String,
    pub question_number: i32,
    #[serde(rename = "type")]
    pub question_type: question::QuestionType,
    pub other_type: Option<String>,
    pub month: i32,
    pub year: i32,
    pub question: String,
    pub suggestions: Option<String>,
    pub company: CompanyRef,
    pub created_at: String,
    pub updated_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier: Option<u8>,
}

impl QuestionResponse {
    fn new(question: question::Model, company: company::Model, tier: Option<u8>) -> Self {
        Self {
            id: question.id,
            question_number: question.question_number,
            question_type: question.question_type,
            other_type: question.other_type,
            month: question.month,
            year: question.year,
            question: question.body,
            suggestions: question.suggestions,
            company: company.into(),
            created_at: question.created_at.to_rfc3339(),
            updated_at: question.updated_at.map(|dt| dt.to_rfc3339()),
            tier,
        }
    }
}

impl From<QuestionWithCompany> for QuestionResponse {
    fn from(qc: QuestionWithCompany) -> Self {
        Self::new(qc.question, qc.company, None)
    }
}

impl From<RankedQuestion> for QuestionResponse {
    fn from(ranked: RankedQuestion) -> Self {
        Self::new(ranked.question, ranked.company, ranked.tier)
    }
}

/// A claim with its user resolved.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimResponse {
    pub user: Option<ClaimUserRef>,
    pub claimed_at: String,
}

/// Public fields of a claiming user.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimUserRef {
    pub id: String,
    pub full_name: String,
    pub enrollment_number: String,
    pub branch: String,
    pub display_picture: Option<String>,
}

impl ClaimResponse {
    fn new(claim: claim::Model, user: Option<user::Model>) -> Self {
        Self {
            user: user.map(|u| ClaimUserRef {
                id: u.id,
                full_name: u.full_name,
                enrollment_number: u.enrollment_number,
                branch: u.branch,
                display_picture: u.display_picture,
            }),
            claimed_at: claim.claimed_at.to_rfc3339(),
        }
    }
}

/// Question detail: the list fields plus claims, and for admins the
/// ownership trail.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionDetailResponse {
    #[serde(flatten)]
    pub question: QuestionResponse,
    pub claimed_by: Vec<ClaimResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ownership_history: Option<serde_json::Value>,
}

/// List query parameters.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuestionsQuery {
    pub search: Option<String>,
    /// Company id filter.
    pub company: Option<String>,
    #[serde(rename = "type")]
    pub question_type: Option<question::QuestionType>,
    pub year: Option<i32>,
    #[serde(default)]
    pub sort_by: SortField,
    #[serde(default)]
    pub sort_order: SortDirection,
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

/// Question list body.
#[derive(Serialize)]
pub struct QuestionListResponse {
    pub questions: Vec<QuestionResponse>,
    pub pagination: PaginationMeta,
}

/// List and search questions.
async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuestionsQuery>,
) -> AppResult<ApiResponse<QuestionListResponse>> {
    let page = state
        .search_service
        .search(SearchQuestionsInput {
            company_id: query.company,
            question_type: query.question_type,
            year: query.year,
            free_text: query.search,
            sort_by: query.sort_by,
            sort_direction: query.sort_order,
            page: query.page,
            page_size: query.limit,
        })
        .await?;

    let pagination = PaginationMeta::new(page.page, page.page_size, page.total);
    Ok(ApiResponse::ok(QuestionListResponse {
        questions: page.items.into_iter().map(Into::into).collect(),
        pagination,
    }))
}

/// Current user's submissions.
async fn my_questions(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<QuestionResponse>>> {
    let questions = state.question_service.my_questions(&user.id).await?;
    Ok(ApiResponse::ok(
        questions.into_iter().map(Into::into).collect(),
    ))
}

/// Count response.
#[derive(Serialize)]
pub struct CountResponse {
    pub count: u64,
}

/// Number of questions the current user has claimed.
async fn my_claims_count(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<CountResponse>> {
    let count = state.question_service.my_claims_count(&user.id).await?;
    Ok(ApiResponse::ok(CountResponse { count }))
}

/// Fetch one question with claims; admins also see the ownership trail.
async fn get_one(
    MaybeAuthUser(viewer): MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<QuestionDetailResponse>> {
    let qc = state.question_service.get_with_company(&id).await?;
    let claims = state.question_service.claims(&qc.question.id).await?;

    let ownership_history = viewer
        .filter(|u| u.role.is_admin())
        .map(|_| qc.question.ownership_history.clone());

    Ok(ApiResponse::ok(QuestionDetailResponse {
        question: qc.into(),
        claimed_by: claims
            .into_iter()
            .map(|(claim, user)| ClaimResponse::new(claim, user))
            .collect(),
        ownership_history,
    }))
}

/// Submit a question (admission-controlled).
async fn create(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    ClientContext(ctx): ClientContext,
    Json(input): Json<CreateQuestionInput>,
) -> AppResult<ApiResponse<QuestionResponse>> {
    state
        .admission
        .check_and_consume(&user.id, user.role, ActionKind::Questions)
        .await?;

    let created = state
        .question_service
        .create(Some(&user.id), &user, input, ctx)
        .await?;
    Ok(ApiResponse::ok(created.into()))
}

/// Edit a question (owner or admin).
async fn update(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    ClientContext(ctx): ClientContext,
    Path(id): Path<String>,
    Json(input): Json<UpdateQuestionInput>,
) -> AppResult<ApiResponse<QuestionResponse>> {
    let updated = state
        .question_service
        .update(&id, &user, input, ctx)
        .await?;
    Ok(ApiResponse::ok(updated.into()))
}

/// Delete a question (owner or admin).
async fn remove(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    ClientContext(ctx): ClientContext,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<()>> {
    state.question_service.delete(&id, &user, ctx).await?;
    Ok(ApiResponse::ok(()))
}

/// Claim a question for the current user.
async fn claim(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<()>> {
    state.question_service.claim(&id, &user.id).await?;
    Ok(ApiResponse::ok(()))
}

/// Withdraw the current user's claim.
async fn unclaim(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<()>> {
    state.question_service.unclaim(&id, &user.id).await?;
    Ok(ApiResponse::ok(()))
}

/// Admin: claim on behalf of a user.
async fn admin_add_claim(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path((id, user_id)): Path<(String, String)>,
) -> AppResult<ApiResponse<()>> {
    state
        .question_service
        .admin_add_claim(&id, &admin, &user_id)
        .await?;
    Ok(ApiResponse::ok(()))
}

/// Admin: remove a user's claim.
async fn admin_remove_claim(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path((id, user_id)): Path<(String, String)>,
) -> AppResult<ApiResponse<()>> {
    state
        .question_service
        .admin_remove_claim(&id, &admin, &user_id)
        .await?;
    Ok(ApiResponse::ok(()))
}

/// Transfer request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    /// Enrollment number of the new owner.
    pub new_owner: String,
}

/// Admin: reassign a question's owner, appending to the audit trail.
async fn transfer(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    ClientContext(ctx): ClientContext,
    Path(id): Path<String>,
    Json(req): Json<TransferRequest>,
) -> AppResult<ApiResponse<QuestionResponse>> {
    state
        .question_service
        .transfer(&id, &admin, &req.new_owner, ctx)
        .await?;
    let updated = state.question_service.get_with_company(&id).await?;
    Ok(ApiResponse::ok(updated.into()))
}

/// Create the questions router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/my", get(my_questions))
        .route("/my-claims-count", get(my_claims_count))
        .route("/{id}", get(get_one).put(update).delete(remove))
        .route("/{id}/claim", post(claim).delete(unclaim))
        .route(
            "/{id}/claim/{user_id}",
            post(admin_add_claim).delete(admin_remove_claim),
        )
        .route("/{id}/transfer", post(transfer))
}
