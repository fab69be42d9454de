//! `/anonymous` - the identity-free channel (C8). No handler in this file
//! ever touches `ActorContext`, a client IP, or a session id tied to a
//! person; the rate-limit key comes only from `X-Tor-Circuit-Id` or a
//! shared bucket, per spec.md §4.4.

use axum::{
    extract::{Extension, Path, State},
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use hinschg_core::TenantContext;
use hinschg_core::security::ReceiptCode;
use hinschg_domain::anon::service::AnonIntake;
use hinschg_domain::{MessageDirection, ReportCategory, ReportStatus};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::AppState;

pub fn anonymous_routes() -> Router<AppState> {
    Router::new()
        .route("/submit", post(submit))
        .route("/status/:receipt", get(status))
        .route("/message/:receipt", post(send_message))
}

/// Shared bucket for callers that carry no Tor circuit id at all - distinct
/// from a per-circuit key, but still never derived from a client IP.
const SHARED_ANON_BUCKET: &str = "shared";

fn limit_key(headers: &HeaderMap) -> String {
    headers
        .get("x-tor-circuit-id")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| SHARED_ANON_BUCKET.to_string())
}

#[derive(Debug, Deserialize)]
pub struct AnonSubmitRequest {
    pub titel: String,
    pub beschreibung: String,
    pub kategorie: ReportCategory,
    pub sprache: String,
}

#[derive(Debug, Serialize)]
pub struct AnonSubmitResponse {
    pub receipt_code: String,
    pub case_number: String,
    pub status: ReportStatus,
    pub eingangsbestaetigung_frist: DateTime<Utc>,
    pub rueckmeldung_frist: DateTime<Utc>,
}

async fn submit(
    State(state): State<AppState>,
    Extension(tenant): Extension<TenantContext>,
    Json(body): Json<AnonSubmitRequest>,
) -> Result<Json<AnonSubmitResponse>, ApiError> {
    let tenant_record = state.tenants.get(tenant.tenant_id).await?;

    let intake = AnonIntake {
        titel: &body.titel,
        beschreibung: &body.beschreibung,
        kategorie: body.kategorie,
        sprache: &body.sprache,
    };

    let (submission, receipt_code) = state
        .anon
        .submit(tenant.tenant_id, &tenant_record.slug, &tenant_record.config, intake)
        .await?;
    state.case_metrics.inc_anon_submission(&tenant.tenant_id.0.to_string());

    Ok(Json(AnonSubmitResponse {
        receipt_code: ReceiptCode::format_for_display(&receipt_code),
        case_number: submission.case_number,
        status: submission.status,
        eingangsbestaetigung_frist: submission.eingangsbestaetigung_frist,
        rueckmeldung_frist: submission.rueckmeldung_frist,
    }))
}

#[derive(Debug, Serialize)]
pub struct AnonStatusResponse {
    pub case_number: String,
    pub status: ReportStatus,
    pub eingangsbestaetigung_frist: DateTime<Utc>,
    pub rueckmeldung_frist: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

async fn status(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(receipt): Path<String>,
) -> Result<Json<AnonStatusResponse>, ApiError> {
    let key = limit_key(&headers);
    let submission = state.anon.status(&key, &receipt).await?;
    Ok(Json(AnonStatusResponse {
        case_number: submission.case_number,
        status: submission.status,
        eingangsbestaetigung_frist: submission.eingangsbestaetigung_frist,
        rueckmeldung_frist: submission.rueckmeldung_frist,
        updated_at: submission.updated_at,
    }))
}

#[derive(Debug, Deserialize)]
pub struct AnonMessageRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct AnonMessageResponse {
    pub id: uuid::Uuid,
    pub direction: MessageDirection,
    pub created_at: DateTime<Utc>,
}

/// Reporter-side message submission. A staff-side reply goes through the
/// authenticated case handler surface, not this anonymous endpoint - this
/// file never accepts an actor identity that could re-link to a person.
async fn send_message(
    State(state): State<AppState>,
    Path(receipt): Path<String>,
    Json(body): Json<AnonMessageRequest>,
) -> Result<Json<AnonMessageResponse>, ApiError> {
    let message = state
        .anon
        .send_message(&receipt, MessageDirection::ReporterToHandler, &body.text)
        .await?;
    Ok(Json(AnonMessageResponse {
        id: message.id,
        direction: message.direction,
        created_at: message.created_at,
    }))
}
