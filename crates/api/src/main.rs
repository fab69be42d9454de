//! # Whistleblower Protection Act (HinSchG) intake and case-management API
//!
//! HTTP server built with Axum for the multi-tenant whistleblowing service.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐    ┌──────────────┐    ┌─────────────────┐
//! │   Client    │    │ API Server   │    │ Domain Services │
//! │             │────│              │────│                 │
//! │ - Reporter  │    │ - Axum HTTP  │    │ - Case lifecycle│
//! │ - Handler   │    │ - Middleware │    │ - Deadlines     │
//! │ - Ombuds    │    │ - Validation │    │ - Anon channel  │
//! └─────────────┘    └──────────────┘    └─────────────────┘
//! ```
//!
//! ## Middleware stack
//!
//! 1. Security headers (HSTS, CSP, X-Frame-Options)
//! 2. Request ID (correlation across logs)
//! 3. Tenant context (`X-Tenant-ID` header, subdomain, or JWT claim)
//! 4. Actor context (unverified JWT claims - authentication itself is
//!    external to this service, per spec.md §4.9 Non-goals)
//! 5. Tracing
//! 6. Compression
//! 7. CORS
//!
//! ## Background tasks
//!
//! Three loops run alongside the HTTP server for the lifetime of the
//! process: the deadline scheduler sweep (escalation, reminders, retention
//! and deletion progression), the compliance metrics collector, and a job
//! executor dispatching queued notification emails.

use axum::{http::StatusCode, response::IntoResponse, Json, Router};
use hinschg_core::jobs::{ExecutorConfig, JobExecutor};
use hinschg_core::{Config, CorsConfig, DatabasePool};
use hinschg_domain::notification::service::{NotificationJobHandler, NOTIFICATION_JOB_TYPE};
use redis::aio::ConnectionManager;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use axum::http::{HeaderName, HeaderValue, Method};
use tracing::{info, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod api_middleware;
mod error;
mod error_handler;
mod handlers;
mod state;

use crate::state::AppState;

/// Builds a CORS layer from configuration.
///
/// Production deployments should never allow `"*"` for origins; `Config`'s
/// own validation already rejects that combination outside development.
fn build_cors_layer(cors_config: &CorsConfig) -> Result<CorsLayer, Box<dyn std::error::Error>> {
    let mut cors = CorsLayer::new();

    if cors_config.allowed_origins.contains(&"*".to_string()) {
        cors = cors.allow_origin(Any);
    } else {
        let origins: Result<Vec<HeaderValue>, _> =
            cors_config.allowed_origins.iter().map(|origin| origin.parse()).collect();
        cors = cors.allow_origin(origins?);
    }

    if cors_config.allowed_methods.contains(&"*".to_string()) {
        cors = cors.allow_methods(Any);
    } else {
        let methods: Result<Vec<Method>, _> =
            cors_config.allowed_methods.iter().map(|method| method.parse()).collect();
        cors = cors.allow_methods(methods?);
    }

    if cors_config.allowed_headers.contains(&"*".to_string()) {
        cors = cors.allow_headers(Any);
    } else {
        let headers: Result<Vec<HeaderName>, _> =
            cors_config.allowed_headers.iter().map(|header| header.parse()).collect();
        cors = cors.allow_headers(headers?);
    }

    if !cors_config.expose_headers.is_empty() {
        let expose_headers: Result<Vec<HeaderName>, _> =
            cors_config.expose_headers.iter().map(|header| header.parse()).collect();
        cors = cors.expose_headers(expose_headers?);
    }

    cors = cors.allow_credentials(cors_config.allow_credentials);

    if let Some(max_age) = cors_config.max_age {
        cors = cors.max_age(Duration::from_secs(max_age));
    }

    Ok(cors)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    info!("Starting HinSchG case-management server...");

    let config = Config::load()?;
    info!("Configuration loaded and validated");

    let db = DatabasePool::new(config.database.clone()).await?;
    info!("Database pool initialized");

    run_migrations(&db).await?;
    info!("Database migrations applied");

    let redis = init_redis(&config.redis.url).await?;
    info!("Redis connection established");

    let sweep_interval = Duration::from_secs(config.hinschg_deadline.sweep_interval_seconds);
    let cors_layer = build_cors_layer(&config.cors)?;
    let port = config.server.port;

    let state = AppState::build(config, db, redis).await?;
    info!("Application state assembled");

    // Held for the process lifetime: the executor's shutdown channel closes
    // (and its worker loop exits) as soon as this is dropped.
    let _job_executor = spawn_background_tasks(&state, sweep_interval).await?;

    let app = create_app(state, cors_layer)?;

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    info!("Server shutdown complete");
    Ok(())
}

fn create_app(state: AppState, cors_layer: CorsLayer) -> Result<Router, Box<dyn std::error::Error>> {
    #[derive(OpenApi)]
    #[openapi(
        paths(handlers::health::health_check, handlers::health::readiness_check,),
        components(schemas()),
        tags(
            (name = "health", description = "Liveness and readiness"),
            (name = "submissions", description = "Non-anonymous report submissions"),
            (name = "cases", description = "Case lifecycle and statutory operations"),
            (name = "anonymous", description = "Identity-free reporting channel"),
            (name = "ombudsperson", description = "Ombudsperson masked case projection"),
            (name = "metrics", description = "Prometheus metrics exposition"),
        )
    )]
    struct ApiDoc;

    let router = Router::new()
        .nest("/api/v1", api_routes())
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .nest("/health", handlers::health::health_routes())
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn(
                    api_middleware::security_headers::security_headers_middleware,
                ))
                .layer(axum::middleware::from_fn(api_middleware::request_id::request_id_middleware))
                .layer(axum::middleware::from_fn(
                    api_middleware::tenant_context::tenant_context_middleware,
                ))
                .layer(axum::middleware::from_fn(api_middleware::actor_context::actor_context_middleware))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                        .on_request(DefaultOnRequest::new().level(Level::INFO))
                        .on_response(DefaultOnResponse::new().level(Level::INFO)),
                )
                .layer(CompressionLayer::new())
                .layer(cors_layer),
        )
        .with_state(state)
        .fallback(handler_404);

    Ok(router)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/submissions", handlers::submissions::submission_routes())
        .nest("/cases", handlers::cases::case_routes())
        .nest("/anonymous", handlers::anonymous::anonymous_routes())
        .nest("/ombudsperson", handlers::ombudsperson::ombudsperson_routes())
        .nest("/metrics", handlers::metrics::metrics_routes())
}

async fn handler_404() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(serde_json::json!({ "error": "resource not found" })))
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hinschg_api=debug,hinschg_domain=debug,hinschg_core=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn init_redis(url: &str) -> Result<ConnectionManager, redis::RedisError> {
    let client = redis::Client::open(url)?;
    ConnectionManager::new(client).await
}

async fn run_migrations(db: &DatabasePool) -> Result<(), sqlx::Error> {
    info!("Running database migrations...");
    sqlx::migrate!("../../migrations").run(db.pool()).await?;
    info!("Migrations completed");
    Ok(())
}

/// Spawns the deadline scheduler sweep and compliance metrics collector as
/// detached tasks, and starts a job executor for queued notification email.
/// The returned `JobExecutor` must be kept alive by the caller: dropping it
/// closes its shutdown channel and stops its worker loop.
async fn spawn_background_tasks(
    state: &AppState,
    sweep_interval: Duration,
) -> Result<JobExecutor, Box<dyn std::error::Error>> {
    let scheduler = state.deadline_scheduler.clone();
    tokio::spawn(async move {
        scheduler.run_periodically(sweep_interval).await;
    });
    info!("Deadline scheduler sweep scheduled every {:?}", sweep_interval);

    let collector = state.metrics_collector.clone();
    let collector_interval = sweep_interval;
    tokio::spawn(async move {
        collector.run_periodically(collector_interval).await;
    });
    info!("Compliance metrics collector scheduled");

    let handler = Arc::new(NotificationJobHandler::new(&state.config.email)?);
    let mut executor = JobExecutor::new(state.job_queue.clone(), ExecutorConfig::default());
    executor.register_handler(handler).await;
    executor.start().await.map_err(|e| format!("failed to start job executor: {e}"))?;
    info!("Notification job executor started for job type '{}'", NOTIFICATION_JOB_TYPE);

    Ok(executor)
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
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
        _ = ctrl_c => info!("received SIGINT"),
        _ = terminate => info!("received SIGTERM"),
    }
}
