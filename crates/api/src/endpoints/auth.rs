//! Authentication endpoints.

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::{get, post},
};
use prepvault_common::AppResult;
use prepvault_core::RecordEntry;
use prepvault_db::entities::{
    activity_log::{ActivityAction, TargetType},
    user,
};
use serde::{Deserialize, Serialize};

use crate::{
    extractors::{AuthUser, ClientContext},
    middleware::AppState,
    response::ApiResponse,
};

/// User profile response.
#[derive(Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub enrollment_number: String,
    pub full_name: String,
    pub display_picture: Option<String>,
    pub branch: String,
    pub email: String,
    pub role: user::Role,
    pub visited_questions: Vec<String>,
    pub created_at: String,
}

impl From<user::Model> for UserResponse {
    fn from(user: user::Model) -> Self {
        let visited_questions = user
            .visited_question_ids
            .as_array()
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            id: user.id,
            enrollment_number: user.enrollment_number,
            full_name: user.full_name,
            display_picture: user.display_picture,
            branch: user.branch,
            email: user.email,
            role: user.role,
            visited_questions,
            created_at: user.created_at.to_rfc3339(),
        }
    }
}

/// Login URL response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginUrlResponse {
    pub auth_url: String,
}

/// Start the SSO flow: hand the client the authorization URL.
async fn login(State(state): State<AppState>) -> ApiResponse<LoginUrlResponse> {
    ApiResponse::ok(LoginUrlResponse {
        auth_url: state.identity_provider.authorization_url(),
    })
}

/// Callback query parameters.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
}

/// Session response after a successful callback.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub token: String,
    pub user: UserResponse,
}

/// Complete the SSO flow: exchange the code, upsert the user, hand back a
/// bearer token.
async fn callback(
    State(state): State<AppState>,
    ClientContext(ctx): ClientContext,
    Query(query): Query<CallbackQuery>,
) -> AppResult<ApiResponse<SessionResponse>> {
    let Some(code) = query.code else {
        return Err(prepvault_common::AppError::BadRequest(
            "Missing authorization code".to_string(),
        ));
    };

    let identity = match state.identity_provider.resolve(&code).await {
        Ok(identity) => identity,
        Err(e) => {
            state.activity_log.record_detached(
                RecordEntry::new(ActivityAction::LoginFailed)
                    .target(TargetType::System, "sso")
                    .describe("Failed login attempt")
                    .context(ctx),
            );
            return Err(e);
        }
    };

    let user = state.user_service.login_with_identity(identity, ctx).await?;
    let token = user
        .token
        .clone()
        .ok_or_else(|| prepvault_common::AppError::Internal("Login issued no token".to_string()))?;

    Ok(ApiResponse::ok(SessionResponse {
        token,
        user: user.into(),
    }))
}

/// Current user profile.
async fn me(AuthUser(user): AuthUser) -> ApiResponse<UserResponse> {
    ApiResponse::ok(user.into())
}

/// Invalidate the current session token.
async fn logout(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    ClientContext(ctx): ClientContext,
) -> AppResult<ApiResponse<()>> {
    state.user_service.logout(&user.id, ctx).await?;
    Ok(ApiResponse::ok(()))
}

/// Mark-visited request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkVisitedRequest {
    pub question_id: String,
}

/// Record a visited question on the profile.
async fn mark_visited(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<MarkVisitedRequest>,
) -> AppResult<ApiResponse<UserResponse>> {
    let updated = state
        .user_service
        .mark_visited(&user.id, &req.question_id)
        .await?;
    Ok(ApiResponse::ok(updated.into()))
}

/// Create the auth router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", get(login))
        .route("/callback", get(callback))
        .route("/me", get(me))
        .route("/logout", post(logout))
        .route("/visited", post(mark_visited))
}
