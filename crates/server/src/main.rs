//! prepvault server entry point.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{Router, middleware};
use fred::interfaces::ClientLike;
use prepvault_api::{AppState, auth_middleware, router as api_router};
use prepvault_common::{Config, HttpImageHost};
use prepvault_core::{
    ActivityLogService, AdmissionController, AdmissionLimits, CompanyService, QuestionService,
    RedisCounterStore, SearchService, SsoIdentityProvider, TipService, UserService,
};
use prepvault_db::repositories::{
    ActivityLogRepository, ClaimRepository, CompanyRepository, CompanyTipRepository,
    QuestionRepository, UserRepository,
};
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// How often expired activity-log entries are purged.
const LOG_PURGE_INTERVAL_SECS: u64 = 60 * 60;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// On Unix systems, this listens for both SIGINT (Ctrl+C) and SIGTERM.
/// On Windows, this only listens for Ctrl+C.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "prepvault=debug,tower_http=debug".into()),
        )
        .init();

    info!("Starting prepvault server...");

    // Load configuration
    let config = Config::load()?;

    // Connect to database and run migrations
    let db = prepvault_db::init(&config).await?;
    info!("Connected to database");

    info!("Running database migrations...");
    prepvault_db::migrate(&db).await?;
    info!("Migrations completed");

    // Connect the fred client for admission-control counters. Losing Redis
    // must not take the product down: admission degrades to fail-open.
    info!("Connecting to Redis...");
    let fred_config = fred::types::config::Config::from_url(&config.redis.url)
        .expect("Invalid Redis URL");
    let fred_client = fred::clients::Client::new(fred_config, None, None, None);
    fred_client.connect();
    if let Err(e) = fred_client.wait_for_connect().await {
        warn!(error = %e, "Redis unreachable at startup, admission control will fail open");
    } else {
        info!("Connected to Redis for admission control");
    }
    let fred_client = Arc::new(fred_client);

    // Initialize repositories
    let db = Arc::new(db);
    let user_repo = UserRepository::new(Arc::clone(&db));
    let company_repo = CompanyRepository::new(Arc::clone(&db));
    let question_repo = QuestionRepository::new(Arc::clone(&db));
    let claim_repo = ClaimRepository::new(Arc::clone(&db));
    let tip_repo = CompanyTipRepository::new(Arc::clone(&db));
    let activity_log_repo = ActivityLogRepository::new(Arc::clone(&db));

    // Initialize services
    let activity_log = ActivityLogService::new(activity_log_repo);
    let user_service = UserService::new(
        user_repo.clone(),
        activity_log.clone(),
        config.sso.superadmin_enrollment.clone(),
    );
    let company_service = CompanyService::new(company_repo.clone(), activity_log.clone());
    let question_service = QuestionService::new(
        question_repo.clone(),
        company_repo.clone(),
        user_repo.clone(),
        claim_repo,
        activity_log.clone(),
    );
    let search_service = SearchService::new(question_repo, user_repo.clone());
    let tip_service = TipService::new(tip_repo, company_repo, user_repo, activity_log.clone());

    let admission = AdmissionController::new(
        Arc::new(RedisCounterStore::new(fred_client)),
        AdmissionLimits::from_config(&config.limits),
        config.redis.prefix.clone(),
    );

    let identity_provider = Arc::new(SsoIdentityProvider::new(config.sso.clone()));
    let image_host = Arc::new(HttpImageHost::new(
        std::env::var("PREPVAULT_IMAGE_HOST_URL")
            .unwrap_or_else(|_| format!("{}/upload", config.server.url)),
        std::env::var("PREPVAULT_IMAGE_HOST_KEY").ok(),
    ));

    let state = AppState {
        user_service,
        company_service,
        question_service,
        search_service,
        tip_service,
        admission,
        activity_log: activity_log.clone(),
        identity_provider,
        image_host,
    };

    // Periodic retention purge for the activity log
    let retention_days = config.retention.activity_log_days;
    let purge_service = activity_log;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(LOG_PURGE_INTERVAL_SECS));
        loop {
            interval.tick().await;
            if let Err(e) = purge_service.purge_expired(retention_days).await {
                warn!(error = %e, "Activity log purge failed");
            }
        }
    });

    // Build the application
    let app = Router::new()
        .nest("/api", api_router())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    // Start server with graceful shutdown
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
