//! Rate-limit status endpoints.
//!
//! Read-only quota introspection so clients can show how many submissions
//! a user has left.
//! Never itself rate limited.

use axum::{
    Router,
    extract::{Path, State},
    routing::get,
};
use prepvault_common::AppResult;
use prepvault_core::{ActionKind, AdmissionStatus};

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Current quota status for one action kind.
async fn status(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(action): Path<String>,
) -> AppResult<ApiResponse<AdmissionStatus>> {
    let kind: ActionKind = action.parse()?;
    let status = state.admission.status(&user.id, user.role, kind).await?;
    Ok(ApiResponse::ok(status))
}

/// Create the rate-limits router.
pub fn router() -> Router<AppState> {
    Router::new().route("/{action}", get(status))
}
