//! `/cases` - the case state machine's HTTP face (C6), plus the statutory
//! operations that are distinct from status (acknowledge, resolve,
//! forward-to-ombudsperson).

use axum::{
    extract::{Extension, Path, State},
    routing::{get, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use hinschg_core::{TenantContext, UserId};
use hinschg_domain::{Capability, CaseStatus, Recommendation, Severity};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api_middleware::ActorContext;
use crate::error::ApiError;
use crate::state::AppState;

pub fn case_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(open_case).get(list))
        .route("/:id", get(get_one))
        .route("/:id/status", put(transition))
        .route("/:id/acknowledge", post(acknowledge))
        .route("/:id/resolve", post(resolve))
        .route("/:id/forward-to-ombudsperson", post(forward_to_ombudsperson))
        .route("/:id/recommendation", post(recommendation))
}

#[derive(Debug, Deserialize)]
pub struct OpenCaseRequest {
    pub report_id: Uuid,
    pub severity: Severity,
}

#[derive(Debug, Serialize)]
pub struct CaseResponse {
    pub id: Uuid,
    pub case_number: String,
    pub status: CaseStatus,
    pub previous_status: Option<CaseStatus>,
    pub assignee: Option<Uuid>,
    pub severity: Severity,
    pub eskaliert: bool,
    pub forwarded_to_ombudsperson_at: Option<DateTime<Utc>>,
    pub ombudsperson_recommendation: Option<Recommendation>,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl From<hinschg_domain::Case> for CaseResponse {
    fn from(case: hinschg_domain::Case) -> Self {
        Self {
            id: case.id,
            case_number: case.case_number,
            status: case.status,
            previous_status: case.previous_status,
            assignee: case.assignee.map(|a| a.0),
            severity: case.severity,
            eskaliert: case.eskaliert,
            forwarded_to_ombudsperson_at: case.forwarded_to_ombudsperson_at,
            ombudsperson_recommendation: case.ombudsperson_recommendation,
            acknowledged_at: case.acknowledged_at,
            resolved_at: case.resolved_at,
            closed_at: case.closed_at,
        }
    }
}

async fn open_case(
    State(state): State<AppState>,
    Extension(tenant): Extension<TenantContext>,
    actor: ActorContext,
    Json(body): Json<OpenCaseRequest>,
) -> Result<Json<CaseResponse>, ApiError> {
    hinschg_domain::require_capability(actor.role, Capability::ManageCases)?;

    let tenant_record = state.tenants.get(tenant.tenant_id).await?;
    let report = state.reports.get(tenant.tenant_id, body.report_id).await?;

    let case_number = hinschg_domain::model::case::generate_case_number(&tenant_record.slug, Utc::now());
    let case = state
        .cases
        .open_for_report(
            tenant.tenant_id,
            report.id,
            case_number,
            body.severity,
            report.eingegangen_am,
            &tenant_record.config,
        )
        .await?;

    Ok(Json(case.into()))
}

#[derive(Debug, Serialize)]
pub struct CaseListEntry {
    #[serde(flatten)]
    pub case: CaseResponse,
    pub ack_status: hinschg_domain::DeadlineStatus,
    pub feedback_status: hinschg_domain::DeadlineStatus,
}

async fn list(
    State(state): State<AppState>,
    Extension(tenant): Extension<TenantContext>,
    actor: ActorContext,
) -> Result<Json<Vec<CaseListEntry>>, ApiError> {
    let cases = if hinschg_domain::has_capability(actor.role, Capability::ViewAllCases) {
        state.cases.list_by_tenant(tenant.tenant_id).await?
    } else {
        hinschg_domain::require_capability(actor.role, Capability::ViewAssignedCases)?;
        state.cases.list_assigned(tenant.tenant_id, UserId(actor.user_id)).await?
    };

    let now = Utc::now();
    let mut out = Vec::with_capacity(cases.len());
    for case in cases {
        let report = state.reports.get(tenant.tenant_id, case.report_id).await?;
        let ack_status = hinschg_domain::model::deadline::classify(
            report.eingangsbestaetigung_frist,
            report.eingangsbestaetigung_gesendet_am.is_some(),
            now,
        );
        let feedback_status = hinschg_domain::model::deadline::classify(
            report.rueckmeldung_frist,
            report.rueckmeldung_gesendet_am.is_some(),
            now,
        );
        out.push(CaseListEntry {
            case: case.into(),
            ack_status,
            feedback_status,
        });
    }
    Ok(Json(out))
}

async fn get_one(
    State(state): State<AppState>,
    Extension(tenant): Extension<TenantContext>,
    actor: ActorContext,
    Path(id): Path<Uuid>,
) -> Result<Json<CaseResponse>, ApiError> {
    hinschg_domain::require_capability(actor.role, Capability::ViewAssignedCases)
        .or_else(|_| hinschg_domain::require_capability(actor.role, Capability::ViewAllCases))?;
    let case = state.cases.get(tenant.tenant_id, id).await?;
    Ok(Json(case.into()))
}

#[derive(Debug, Deserialize)]
pub struct TransitionRequest {
    pub status: CaseStatus,
    pub assignee: Option<Uuid>,
}

async fn transition(
    State(state): State<AppState>,
    Extension(tenant): Extension<TenantContext>,
    actor: ActorContext,
    Path(id): Path<Uuid>,
    Json(body): Json<TransitionRequest>,
) -> Result<Json<CaseResponse>, ApiError> {
    hinschg_domain::require_capability(actor.role, Capability::ManageCases)?;
    let tenant_record = state.tenants.get(tenant.tenant_id).await?;
    let case = state
        .cases
        .transition(
            tenant.tenant_id,
            id,
            body.status,
            body.assignee.map(UserId),
            UserId(actor.user_id),
            &tenant_record.config,
        )
        .await?;
    Ok(Json(case.into()))
}

async fn acknowledge(
    State(state): State<AppState>,
    Extension(tenant): Extension<TenantContext>,
    actor: ActorContext,
    Path(id): Path<Uuid>,
) -> Result<Json<CaseResponse>, ApiError> {
    hinschg_domain::require_capability(actor.role, Capability::ManageCases)?;
    let case = state.cases.acknowledge(tenant.tenant_id, id, UserId(actor.user_id)).await?;
    Ok(Json(case.into()))
}

async fn resolve(
    State(state): State<AppState>,
    Extension(tenant): Extension<TenantContext>,
    actor: ActorContext,
    Path(id): Path<Uuid>,
) -> Result<Json<CaseResponse>, ApiError> {
    hinschg_domain::require_capability(actor.role, Capability::ManageCases)?;
    let case = state.cases.resolve(tenant.tenant_id, id, UserId(actor.user_id)).await?;
    Ok(Json(case.into()))
}

async fn forward_to_ombudsperson(
    State(state): State<AppState>,
    Extension(tenant): Extension<TenantContext>,
    actor: ActorContext,
    Path(id): Path<Uuid>,
) -> Result<Json<CaseResponse>, ApiError> {
    hinschg_domain::require_capability(actor.role, Capability::ManageCases)?;
    let case = state.cases.forward_to_ombudsperson(tenant.tenant_id, id, UserId(actor.user_id)).await?;
    Ok(Json(case.into()))
}

#[derive(Debug, Deserialize)]
pub struct RecommendationRequest {
    pub recommendation: Recommendation,
    pub notes: Option<String>,
}

/// Kept for a case handler driving the state machine directly (distinct
/// from `/ombudsperson/cases/{id}/recommendation`, which goes through the
/// masked projection).
async fn recommendation(
    State(state): State<AppState>,
    Extension(tenant): Extension<TenantContext>,
    actor: ActorContext,
    Path(id): Path<Uuid>,
    Json(body): Json<RecommendationRequest>,
) -> Result<Json<CaseResponse>, ApiError> {
    hinschg_domain::require_capability(actor.role, Capability::ManageCases)?;
    let tenant_record = state.tenants.get(tenant.tenant_id).await?;
    let notes_encrypted = body
        .notes
        .as_deref()
        .map(|n| state.encryption.encrypt_field(n, &id.to_string(), "ombudsperson_notes"))
        .transpose()?;
    let case = state
        .cases
        .record_recommendation(
            tenant.tenant_id,
            id,
            UserId(actor.user_id),
            body.recommendation,
            notes_encrypted,
            &tenant_record.config,
        )
        .await?;
    Ok(Json(case.into()))
}
