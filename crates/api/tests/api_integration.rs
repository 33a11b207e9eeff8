//! API integration tests.
//!
//! These verify routing, the auth/role gates, and the response envelope
//! against mock databases.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
    middleware,
};
use chrono::Utc;
use prepvault_api::{AppState, auth_middleware, router as api_router};
use prepvault_common::{AppResult, ImageHost};
use prepvault_core::{
    ActivityLogService, AdmissionController, AdmissionLimits, CompanyService, IdentityProvider,
    MemoryCounterStore, QuestionService, ResolvedIdentity, SearchService, TipService, UserService,
};
use prepvault_db::entities::user;
use prepvault_db::repositories::{
    ActivityLogRepository, ClaimRepository, CompanyRepository, CompanyTipRepository,
    QuestionRepository, UserRepository,
};
use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase};
use serde_json::json;
use tower::ServiceExt;

struct StubIdentityProvider;

#[async_trait::async_trait]
impl IdentityProvider for StubIdentityProvider {
    fn authorization_url(&self) -> String {
        "https://sso.example.edu/oauth/authorise/?client_id=test".to_string()
    }

    async fn resolve(&self, _code: &str) -> AppResult<ResolvedIdentity> {
        Ok(ResolvedIdentity {
            enrollment_number: "21114001".to_string(),
            full_name: "Asha Verma".to_string(),
            display_picture: None,
            branch: "CSE".to_string(),
            email: "asha@example.edu".to_string(),
        })
    }
}

struct StubImageHost;

#[async_trait::async_trait]
impl ImageHost for StubImageHost {
    async fn upload(&self, _data: &[u8], _filename: &str, _content_type: &str) -> AppResult<String> {
        Ok("https://images.example.edu/logo.png".to_string())
    }
}

fn test_user(id: &str, role: user::Role) -> user::Model {
    user::Model {
        id: id.to_string(),
        enrollment_number: format!("EN-{id}"),
        full_name: format!("User {id}"),
        display_picture: None,
        branch: "CSE".to_string(),
        email: format!("{id}@example.edu"),
        role,
        token: Some(format!("token-{id}")),
        visited_question_ids: json!([]),
        created_at: Utc::now().into(),
        updated_at: None,
    }
}

fn empty_db() -> Arc<DatabaseConnection> {
    Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection())
}

/// Build app state; `user_db` backs both auth lookups and the directory.
fn test_state(user_db: Arc<DatabaseConnection>, question_db: Arc<DatabaseConnection>) -> AppState {
    let user_repo = UserRepository::new(user_db);
    let company_repo = CompanyRepository::new(empty_db());
    let question_repo = QuestionRepository::new(question_db);
    let claim_repo = ClaimRepository::new(empty_db());
    let tip_repo = CompanyTipRepository::new(empty_db());
    let activity_log = ActivityLogService::new(ActivityLogRepository::new(empty_db()));

    AppState {
        user_service: UserService::new(
            user_repo.clone(),
            activity_log.clone(),
            "SA001".to_string(),
        ),
        company_service: CompanyService::new(company_repo.clone(), activity_log.clone()),
        question_service: QuestionService::new(
            question_repo.clone(),
            company_repo.clone(),
            user_repo.clone(),
            claim_repo,
            activity_log.clone(),
        ),
        search_service: SearchService::new(question_repo, user_repo.clone()),
        tip_service: TipService::new(tip_repo, company_repo, user_repo, activity_log.clone()),
        admission: AdmissionController::new(
            Arc::new(MemoryCounterStore::new()),
            AdmissionLimits::default(),
            "test".to_string(),
        ),
        activity_log,
        identity_provider: Arc::new(StubIdentityProvider),
        image_host: Arc::new(StubImageHost),
    }
}

fn app_with(state: AppState) -> Router {
    Router::new()
        .nest("/api", api_router())
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}

#[tokio::test]
async fn test_question_list_is_public() {
    let question_db = Arc::new(
        MockDatabase::new(DatabaseBackend::Postgres)
            // count, then page
            .append_query_results([[maplit::btreemap! {
                "num_items" => sea_orm::Value::BigInt(Some(0))
            }]])
            .append_query_results([Vec::<(
                prepvault_db::entities::question::Model,
                prepvault_db::entities::company::Model,
            )>::new()])
            .into_connection(),
    );

    let app = app_with(test_state(empty_db(), question_db));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/questions?page=1&limit=20")
                .method("GET")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_create_question_requires_auth() {
    let app = app_with(test_state(empty_db(), empty_db()));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/questions")
                .method("POST")
                .header("Content-Type", "application/json")
                .body(Body::from(
                    r#"{"companyId":"c1","questionType":"oa","month":3,"year":2024,"body":"<p>x</p>"}"#,
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_me_with_bearer_token() {
    let user_db = Arc::new(
        MockDatabase::new(DatabaseBackend::Postgres)
            // auth middleware token lookup
            .append_query_results([[test_user("u1", user::Role::User)]])
            .into_connection(),
    );

    let app = app_with(test_state(user_db, empty_db()));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/auth/me")
                .method("GET")
                .header("Authorization", "Bearer token-u1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(value["data"]["enrollmentNumber"], "EN-u1");
}

#[tokio::test]
async fn test_admin_stats_rejects_regular_user() {
    let user_db = Arc::new(
        MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_user("u1", user::Role::User)]])
            .into_connection(),
    );

    let app = app_with(test_state(user_db, empty_db()));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/admin/stats")
                .method("GET")
                .header("Authorization", "Bearer token-u1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_admin_users_rejects_admin_requires_superadmin() {
    let user_db = Arc::new(
        MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_user("u1", user::Role::Admin)]])
            .into_connection(),
    );

    let app = app_with(test_state(user_db, empty_db()));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/admin/users")
                .method("GET")
                .header("Authorization", "Bearer token-u1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_rate_limit_status_requires_auth() {
    let app = app_with(test_state(empty_db(), empty_db()));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/rate-limits/questions")
                .method("GET")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_rate_limit_status_unknown_action_rejected() {
    let user_db = Arc::new(
        MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_user("u1", user::Role::User)]])
            .into_connection(),
    );

    let app = app_with(test_state(user_db, empty_db()));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/rate-limits/replies")
                .method("GET")
                .header("Authorization", "Bearer token-u1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_url_is_public() {
    let app = app_with(test_state(empty_db(), empty_db()));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/auth/login")
                .method("GET")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert!(
        value["data"]["authUrl"]
            .as_str()
            .unwrap()
            .starts_with("https://sso.example.edu")
    );
}

#[tokio::test]
async fn test_unknown_endpoint_returns_404() {
    let app = app_with(test_state(empty_db(), empty_db()));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/nonexistent")
                .method("GET")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
