//! `/ombudsperson` - the identity-masked case projection (C9). Every field
//! that could re-identify a reporter is replaced by
//! [`hinschg_domain::ombudsperson::service::REDACTED`] before it ever
//! reaches this layer; this file only shapes the already-masked view for
//! the wire.

use axum::{
    extract::{Extension, Path, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use hinschg_core::{TenantContext, UserId};
use hinschg_domain::ombudsperson::service::MaskedCaseEvent;
use hinschg_domain::{Capability, CaseEventType, CaseStatus, Recommendation, ReportCategory, Severity};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api_middleware::ActorContext;
use crate::error::ApiError;
use crate::state::AppState;

pub fn ombudsperson_routes() -> Router<AppState> {
    Router::new()
        .route("/cases", get(list_cases))
        .route("/cases/:id", get(get_case))
        .route("/cases/:id/recommendation", post(record_recommendation))
}

#[derive(Debug, Serialize)]
pub struct MaskedEventResponse {
    pub event_type: CaseEventType,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl From<MaskedCaseEvent> for MaskedEventResponse {
    fn from(event: MaskedCaseEvent) -> Self {
        Self {
            event_type: event.event_type,
            description: event.description,
            created_at: event.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OmbudspersonCaseResponse {
    pub id: Uuid,
    pub case_number: String,
    pub status: CaseStatus,
    pub severity: Severity,
    pub kategorie: ReportCategory,
    pub betroffene_abteilung: Option<String>,
    pub zeitraum_von: Option<DateTime<Utc>>,
    pub zeitraum_bis: Option<DateTime<Utc>>,
    pub schaetzung_schaden: Option<String>,
    /// Always the literal `"[vertraulich]"` - never the reporter's actual
    /// identity, even when the underlying report is non-anonymous.
    pub melder_name: &'static str,
    pub melder_email: &'static str,
    pub melder_telefon: &'static str,
    pub beschreibung: Option<String>,
    pub forwarded_to_ombudsperson_at: Option<DateTime<Utc>>,
    pub ombudsperson_recommendation: Option<Recommendation>,
    pub history: Vec<MaskedEventResponse>,
}

impl From<hinschg_domain::OmbudspersonCaseView> for OmbudspersonCaseResponse {
    fn from(view: hinschg_domain::OmbudspersonCaseView) -> Self {
        Self {
            id: view.id,
            case_number: view.case_number,
            status: view.status,
            severity: view.severity,
            kategorie: view.kategorie,
            betroffene_abteilung: view.betroffene_abteilung,
            zeitraum_von: view.zeitraum_von,
            zeitraum_bis: view.zeitraum_bis,
            schaetzung_schaden: view.schaetzung_schaden,
            melder_name: view.melder_identitaet,
            melder_email: view.melder_identitaet,
            melder_telefon: view.melder_identitaet,
            beschreibung: view.beschreibung,
            forwarded_to_ombudsperson_at: view.forwarded_to_ombudsperson_at,
            ombudsperson_recommendation: view.ombudsperson_recommendation,
            history: view.history.into_iter().map(Into::into).collect(),
        }
    }
}

async fn list_cases(
    State(state): State<AppState>,
    Extension(tenant): Extension<TenantContext>,
    actor: ActorContext,
) -> Result<Json<Vec<OmbudspersonCaseResponse>>, ApiError> {
    hinschg_domain::require_capability(actor.role, Capability::ViewSubmissions)?;
    let tenant_record = state.tenants.get(tenant.tenant_id).await?;
    let cases = state.ombudsperson.list_cases(tenant.tenant_id, &tenant_record.config).await?;
    Ok(Json(cases.into_iter().map(Into::into).collect()))
}

async fn get_case(
    State(state): State<AppState>,
    Extension(tenant): Extension<TenantContext>,
    actor: ActorContext,
    Path(id): Path<Uuid>,
) -> Result<Json<OmbudspersonCaseResponse>, ApiError> {
    hinschg_domain::require_capability(actor.role, Capability::ViewSubmissions)?;
    let tenant_record = state.tenants.get(tenant.tenant_id).await?;
    let case = state.ombudsperson.view_case(tenant.tenant_id, id, &tenant_record.config).await?;
    Ok(Json(case.into()))
}

#[derive(Debug, Deserialize)]
pub struct RecommendationRequest {
    pub recommendation: Recommendation,
    pub notes: Option<String>,
}

async fn record_recommendation(
    State(state): State<AppState>,
    Extension(tenant): Extension<TenantContext>,
    actor: ActorContext,
    Path(id): Path<Uuid>,
    Json(body): Json<RecommendationRequest>,
) -> Result<Json<crate::handlers::cases::CaseResponse>, ApiError> {
    hinschg_domain::require_capability(actor.role, Capability::ManageCases)?;
    let tenant_record = state.tenants.get(tenant.tenant_id).await?;
    let case = state
        .ombudsperson
        .record_recommendation(
            tenant.tenant_id,
            id,
            UserId(actor.user_id),
            body.recommendation,
            body.notes.as_deref(),
            &tenant_record.config,
        )
        .await?;
    Ok(Json(case.into()))
}
