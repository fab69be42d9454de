//! `/health` - DB + cache liveness, no auth.

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/", get(health_check)).route("/ready", get(readiness_check))
}

#[derive(Debug, Serialize)]
struct ComponentHealth {
    database: &'static str,
    cache: &'static str,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    components: ComponentHealth,
}

#[utoipa::path(get, path = "/health", tag = "health", responses((status = 200, description = "All dependencies reachable"), (status = 503, description = "A dependency is unreachable")))]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let db_ok = state.db.check_health().await.is_ok();
    let cache_ok = state.sessions.health_check().await.is_ok();

    let status = if db_ok && cache_ok { "ok" } else { "degraded" };
    let code = if db_ok && cache_ok { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };

    (
        code,
        Json(HealthResponse {
            status,
            components: ComponentHealth {
                database: if db_ok { "ok" } else { "unreachable" },
                cache: if cache_ok { "ok" } else { "unreachable" },
            },
        }),
    )
}

/// Liveness only - does not touch the database or cache, so a slow
/// dependency never flips a load balancer's readiness probe into a
/// restart loop.
#[utoipa::path(get, path = "/health/ready", tag = "health", responses((status = 200, description = "Process is up")))]
pub async fn readiness_check() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ready" })))
}
