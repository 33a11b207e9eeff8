//! Company endpoints (including nested tips).

use axum::{
    Json, Router,
    extract::{Multipart, Path, Query, State},
    routing::{get, post, put},
};
use prepvault_common::{AppError, AppResult};
use prepvault_core::{ActionKind, CreateCompanyInput, TipNode, UpdateCompanyDetailsInput};
use prepvault_db::entities::company::{self, PG_BRANCHES, PHD_BRANCHES, UG_BRANCHES};
use serde::{Deserialize, Serialize};

use crate::{
    extractors::{AdminUser, AuthUser, ClientContext},
    middleware::AppState,
    response::ApiResponse,
};

/// Compact company listing entry.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanySummary {
    pub id: String,
    pub name: String,
    pub logo: Option<String>,
}

impl From<company::Model> for CompanySummary {
    fn from(company: company::Model) -> Self {
        Self {
            id: company.id,
            name: company.name,
            logo: company.logo,
        }
    }
}

/// Full company response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyResponse {
    pub id: String,
    pub name: String,
    pub logo: Option<String>,
    pub description: Option<String>,
    pub roles: serde_json::Value,
    pub created_at: String,
}

impl From<company::Model> for CompanyResponse {
    fn from(company: company::Model) -> Self {
        Self {
            id: company.id,
            name: company.name,
            logo: company.logo,
            description: company.description,
            roles: company.roles,
            created_at: company.created_at.to_rfc3339(),
        }
    }
}

/// Listing query parameters.
#[derive(Debug, Deserialize)]
pub struct ListCompaniesQuery {
    pub search: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: u64,
}

const fn default_limit() -> u64 {
    50
}

/// List or fuzzy-search companies by name.
async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListCompaniesQuery>,
) -> AppResult<ApiResponse<Vec<CompanySummary>>> {
    let companies = state
        .company_service
        .search(query.search.as_deref(), query.limit.min(200))
        .await?;
    Ok(ApiResponse::ok(
        companies.into_iter().map(Into::into).collect(),
    ))
}

/// Branch list response, grouped by degree level.
#[derive(Serialize)]
pub struct BranchListResponse {
    pub ug: Vec<&'static str>,
    pub pg: Vec<&'static str>,
    pub phd: Vec<&'static str>,
}

/// Hiring-branch vocabularies for role posting forms.
async fn branches() -> ApiResponse<BranchListResponse> {
    ApiResponse::ok(BranchListResponse {
        ug: UG_BRANCHES.to_vec(),
        pg: PG_BRANCHES.to_vec(),
        phd: PHD_BRANCHES.to_vec(),
    })
}

/// Fetch one company.
async fn get_one(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<CompanyResponse>> {
    let company = state.company_service.get(&id).await?;
    Ok(ApiResponse::ok(company.into()))
}

/// Pull the company name and optional logo out of a multipart form.
async fn read_company_form(
    mut multipart: Multipart,
) -> AppResult<(Option<String>, Option<(Vec<u8>, String, String)>)> {
    let mut name = None;
    let mut logo = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart form: {e}")))?
    {
        let field_name = field.name().map(ToString::to_string);
        match field_name.as_deref() {
            Some("name") => {
                name = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| AppError::BadRequest(format!("Invalid name field: {e}")))?,
                );
            }
            Some("logo") => {
                let filename = field.file_name().unwrap_or("logo").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Invalid logo upload: {e}")))?;
                logo = Some((data.to_vec(), filename, content_type));
            }
            _ => {}
        }
    }

    Ok((name, logo))
}

/// Create a company (admission-controlled). The logo, if present, goes to
/// the image host first; only its URL is stored.
async fn create(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    ClientContext(ctx): ClientContext,
    multipart: Multipart,
) -> AppResult<ApiResponse<CompanyResponse>> {
    state
        .admission
        .check_and_consume(&user.id, user.role, ActionKind::Companies)
        .await?;

    let (name, logo) = read_company_form(multipart).await?;
    let name = name.ok_or_else(|| AppError::Validation("Company name is required".to_string()))?;

    let logo_url = match logo {
        Some((data, filename, content_type)) => {
            // A failed upload does not block company creation.
            match state.image_host.upload(&data, &filename, &content_type).await {
                Ok(url) => Some(url),
                Err(e) => {
                    tracing::warn!(error = %e, "Logo upload failed, creating company without logo");
                    None
                }
            }
        }
        None => None,
    };

    let company = state
        .company_service
        .create(&user, CreateCompanyInput { name }, logo_url, ctx)
        .await?;
    Ok(ApiResponse::ok(company.into()))
}

/// Replace a company's logo.
async fn update_logo(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    ClientContext(ctx): ClientContext,
    Path(id): Path<String>,
    multipart: Multipart,
) -> AppResult<ApiResponse<CompanyResponse>> {
    let (_, logo) = read_company_form(multipart).await?;
    let (data, filename, content_type) =
        logo.ok_or_else(|| AppError::BadRequest("No file uploaded".to_string()))?;

    let url = state.image_host.upload(&data, &filename, &content_type).await?;
    let company = state
        .company_service
        .update_logo(&id, &user, url, ctx)
        .await?;
    Ok(ApiResponse::ok(company.into()))
}

/// Admin: update description and role postings.
async fn update_details(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    ClientContext(ctx): ClientContext,
    Path(id): Path<String>,
    Json(input): Json<UpdateCompanyDetailsInput>,
) -> AppResult<ApiResponse<CompanyResponse>> {
    let company = state
        .company_service
        .update_details(&id, &admin, input, ctx)
        .await?;
    Ok(ApiResponse::ok(company.into()))
}

// ========== Tips ==========

/// One tip with author and replies.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TipResponse {
    pub id: String,
    pub content: String,
    pub author: Option<TipAuthorRef>,
    pub parent_tip: Option<String>,
    pub created_at: String,
    pub updated_at: Option<String>,
    pub replies: Vec<TipResponse>,
}

/// Public fields of a tip author.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TipAuthorRef {
    pub id: String,
    pub full_name: String,
    pub enrollment_number: String,
    pub branch: String,
    pub display_picture: Option<String>,
}

impl From<TipNode> for TipResponse {
    fn from(node: TipNode) -> Self {
        Self {
            id: node.tip.id,
            content: node.tip.content,
            author: node.author.map(|u| TipAuthorRef {
                id: u.id,
                full_name: u.full_name,
                enrollment_number: u.enrollment_number,
                branch: u.branch,
                display_picture: u.display_picture,
            }),
            parent_tip: node.tip.parent_tip_id,
            created_at: node.tip.created_at.to_rfc3339(),
            updated_at: node.tip.updated_at.map(|dt| dt.to_rfc3339()),
            replies: node.replies.into_iter().map(Into::into).collect(),
        }
    }
}

/// Tip tree for a company.
async fn list_tips(
    State(state): State<AppState>,
    Path(company_id): Path<String>,
) -> AppResult<ApiResponse<Vec<TipResponse>>> {
    let tree = state.tip_service.list_tree(&company_id).await?;
    Ok(ApiResponse::ok(tree.into_iter().map(Into::into).collect()))
}

/// Create-tip request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTipRequest {
    pub content: String,
    pub parent_tip: Option<String>,
}

/// Post a tip or a reply (admission-controlled).
async fn create_tip(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    ClientContext(ctx): ClientContext,
    Path(company_id): Path<String>,
    Json(req): Json<CreateTipRequest>,
) -> AppResult<ApiResponse<TipResponse>> {
    state
        .admission
        .check_and_consume(&user.id, user.role, ActionKind::Tips)
        .await?;

    let tip = state
        .tip_service
        .create(&company_id, &user, &req.content, req.parent_tip, ctx)
        .await?;

    Ok(ApiResponse::ok(TipResponse {
        id: tip.id,
        content: tip.content,
        author: Some(TipAuthorRef {
            id: user.id,
            full_name: user.full_name,
            enrollment_number: user.enrollment_number,
            branch: user.branch,
            display_picture: user.display_picture,
        }),
        parent_tip: tip.parent_tip_id,
        created_at: tip.created_at.to_rfc3339(),
        updated_at: None,
        replies: vec![],
    }))
}

/// Create the companies router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/branches", get(branches))
        .route("/{id}", get(get_one))
        .route("/{id}/logo", put(update_logo))
        .route("/{id}/details", put(update_details))
        .route("/{id}/tips", get(list_tips).post(create_tip))
}
