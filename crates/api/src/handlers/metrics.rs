//! `/metrics` - Prometheus text exposition 0.0.4 (C13), admin/ombudsperson only.

use axum::{extract::State, http::header, response::IntoResponse, routing::get, Router};
use hinschg_core::Error;
use hinschg_domain::Role;

use crate::api_middleware::ActorContext;
use crate::error::ApiError;
use crate::state::AppState;

pub fn metrics_routes() -> Router<AppState> {
    Router::new().route("/", get(metrics))
}

/// Restricted to admin/ombudsperson per spec.md §6 - distinct from the
/// fixed role→capability table in `access`, which has no single
/// capability naming exactly this pair.
async fn metrics(State(state): State<AppState>, actor: ActorContext) -> Result<impl IntoResponse, ApiError> {
    if !matches!(actor.role, Role::Admin | Role::Ombudsperson) {
        return Err(Error::forbidden("metrics are restricted to admin and ombudsperson roles").into());
    }

    let body = state.metrics_service.get_metrics();
    Ok(([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body))
}
