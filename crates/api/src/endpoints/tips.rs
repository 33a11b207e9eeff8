//! Standalone tip endpoints (edit/delete by id).

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::put,
};
use prepvault_common::AppResult;
use serde::{Deserialize, Serialize};

use crate::{
    extractors::{AuthUser, ClientContext},
    middleware::AppState,
    response::ApiResponse,
};

/// Update-tip request.
#[derive(Debug, Deserialize)]
pub struct UpdateTipRequest {
    pub content: String,
}

/// Updated-tip response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatedTipResponse {
    pub id: String,
    pub content: String,
    pub updated_at: Option<String>,
}

/// Edit a tip (author or admin).
async fn update(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    ClientContext(ctx): ClientContext,
    Path(id): Path<String>,
    Json(req): Json<UpdateTipRequest>,
) -> AppResult<ApiResponse<UpdatedTipResponse>> {
    let tip = state
        .tip_service
        .update(&id, &user, &req.content, ctx)
        .await?;
    Ok(ApiResponse::ok(UpdatedTipResponse {
        id: tip.id,
        content: tip.content,
        updated_at: tip.updated_at.map(|dt| dt.to_rfc3339()),
    }))
}

/// Delete a tip and its replies (author or admin).
async fn remove(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    ClientContext(ctx): ClientContext,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<()>> {
    state.tip_service.delete(&id, &user, ctx).await?;
    Ok(ApiResponse::ok(()))
}

/// Create the tips router.
pub fn router() -> Router<AppState> {
    Router::new().route("/{id}", put(update).delete(remove))
}
