//! API middleware.

use std::sync::Arc;

use axum::{body::Body, extract::State, http::Request, middleware::Next, response::Response};
use prepvault_common::ImageHost;
use prepvault_core::{
    ActivityLogService, AdmissionController, CompanyService, IdentityProvider, QuestionService,
    SearchService, TipService, UserService,
};

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub user_service: UserService,
    pub company_service: CompanyService,
    pub question_service: QuestionService,
    pub search_service: SearchService,
    pub tip_service: TipService,
    pub admission: AdmissionController,
    pub activity_log: ActivityLogService,
    pub identity_provider: Arc<dyn IdentityProvider>,
    pub image_host: Arc<dyn ImageHost>,
}

/// Authentication middleware.
///
/// Resolves a bearer token to a user and attaches the model to request
/// extensions; role gates are enforced by the extractors downstream.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(auth_header) = req.headers().get("Authorization")
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = auth_str.strip_prefix("Bearer ")
    {
        // Authenticate user by token
        if let Ok(user) = state.user_service.authenticate_by_token(token).await {
            req.extensions_mut().insert(user);
        }
    }

    next.run(req).await
}
