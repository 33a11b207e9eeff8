//! API endpoints.

mod admin;
mod auth;
mod companies;
mod logs;
mod questions;
mod rate_limits;
mod tips;

use axum::Router;

use crate::middleware::AppState;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/questions", questions::router())
        .nest("/companies", companies::router())
        .nest("/tips", tips::router())
        .nest("/admin", admin::router())
        .nest("/logs", logs::router())
        .nest("/rate-limits", rate_limits::router())
}
