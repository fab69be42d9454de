//! `/submissions` - report intake and status lookup (C4, C7).

use axum::{
    extract::{Extension, Path, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use hinschg_core::TenantContext;
use hinschg_domain::report::ReportIntake;
use hinschg_domain::{Capability, ReportCategory, ReportChannel, ReportPriority, ReportStatus};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api_middleware::ActorContext;
use crate::error::ApiError;
use crate::state::AppState;

pub fn submission_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(submit).get(list))
        .route("/status/:access_code", get(status_by_access_code))
        .route("/:id", get(get_one))
}

#[derive(Debug, Deserialize)]
pub struct SubmitReportRequest {
    pub titel: String,
    pub beschreibung: String,
    pub kategorie: ReportCategory,
    pub kanal: ReportChannel,
    pub sprache: String,
    pub melder_name: Option<String>,
    pub melder_email: Option<String>,
    pub melder_telefon: Option<String>,
    pub betroffene_personen: Option<String>,
    pub betroffene_abteilung: Option<String>,
}

fn kanal_label(kanal: ReportChannel) -> &'static str {
    match kanal {
        ReportChannel::Web => "web",
        ReportChannel::Anonym => "anonym",
        ReportChannel::Email => "email",
        ReportChannel::Telefon => "telefon",
        ReportChannel::Post => "post",
    }
}

#[derive(Debug, Serialize)]
pub struct SubmitReportResponse {
    pub reference_code: String,
    pub access_code: String,
    pub eingangsbestaetigung_bis: DateTime<Utc>,
}

async fn submit(
    State(state): State<AppState>,
    Extension(tenant): Extension<TenantContext>,
    headers: axum::http::HeaderMap,
    Json(body): Json<SubmitReportRequest>,
) -> Result<Json<SubmitReportResponse>, ApiError> {
    let tenant_record = state.tenants.get(tenant.tenant_id).await?;
    let raw_ip = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok());

    let intake = ReportIntake {
        titel: &body.titel,
        beschreibung: &body.beschreibung,
        kategorie: body.kategorie,
        kanal: body.kanal,
        sprache: &body.sprache,
        melder_name: body.melder_name.as_deref(),
        melder_email: body.melder_email.as_deref(),
        melder_telefon: body.melder_telefon.as_deref(),
        betroffene_personen: body.betroffene_personen.as_deref(),
        betroffene_abteilung: body.betroffene_abteilung.as_deref(),
        raw_ip,
    };

    let (report, access_code) = state.reports.submit(tenant.tenant_id, &tenant_record.config, intake).await?;
    state.case_metrics.inc_report_submitted(&tenant.tenant_id.0.to_string(), kanal_label(report.kanal));

    Ok(Json(SubmitReportResponse {
        reference_code: report.reference_code,
        access_code,
        eingangsbestaetigung_bis: report.eingangsbestaetigung_frist,
    }))
}

#[derive(Debug, Serialize)]
pub struct ReportStatusResponse {
    pub reference_code: String,
    pub status: ReportStatus,
    pub eingangsbestaetigung_frist: DateTime<Utc>,
    pub eingangsbestaetigung_gesendet_am: Option<DateTime<Utc>>,
    pub rueckmeldung_frist: DateTime<Utc>,
    pub rueckmeldung_gesendet_am: Option<DateTime<Utc>>,
}

/// Deliberately carries nothing identity-bearing - this endpoint is reached
/// with only the access code, by design no different in shape from the
/// anonymous-channel status lookup.
async fn status_by_access_code(
    State(state): State<AppState>,
    Path(access_code): Path<String>,
) -> Result<Json<ReportStatusResponse>, ApiError> {
    let report = state.reports.get_by_access_code(&access_code).await?;
    Ok(Json(ReportStatusResponse {
        reference_code: report.reference_code,
        status: report.status,
        eingangsbestaetigung_frist: report.eingangsbestaetigung_frist,
        eingangsbestaetigung_gesendet_am: report.eingangsbestaetigung_gesendet_am,
        rueckmeldung_frist: report.rueckmeldung_frist,
        rueckmeldung_gesendet_am: report.rueckmeldung_gesendet_am,
    }))
}

#[derive(Debug, Serialize)]
pub struct ReportDetail {
    pub id: Uuid,
    pub reference_code: String,
    pub titel: String,
    pub beschreibung: String,
    pub melder_name: Option<String>,
    pub melder_email: Option<String>,
    pub melder_telefon: Option<String>,
    pub betroffene_personen: Option<String>,
    pub kategorie: ReportCategory,
    pub prioritaet: ReportPriority,
    pub status: ReportStatus,
    pub kanal: ReportChannel,
    pub is_anonymous: bool,
    pub betroffene_abteilung: Option<String>,
    pub eingegangen_am: DateTime<Utc>,
    pub eingangsbestaetigung_frist: DateTime<Utc>,
    pub eingangsbestaetigung_gesendet_am: Option<DateTime<Utc>>,
    pub rueckmeldung_frist: DateTime<Utc>,
    pub rueckmeldung_gesendet_am: Option<DateTime<Utc>>,
}

async fn decrypt_detail(state: &AppState, report: hinschg_domain::Report) -> Result<ReportDetail, ApiError> {
    let id = report.id.to_string();
    let titel = state.encryption.decrypt_field(&report.titel_encrypted, &id, "titel")?;
    let beschreibung = state.encryption.decrypt_field(&report.beschreibung_encrypted, &id, "beschreibung")?;
    let melder_name = report
        .melder_name_encrypted
        .as_deref()
        .map(|v| state.encryption.decrypt_field(v, &id, "melder_name"))
        .transpose()?;
    let melder_email = report
        .melder_email_encrypted
        .as_deref()
        .map(|v| state.encryption.decrypt_field(v, &id, "melder_email"))
        .transpose()?;
    let melder_telefon = report
        .melder_telefon_encrypted
        .as_deref()
        .map(|v| state.encryption.decrypt_field(v, &id, "melder_telefon"))
        .transpose()?;
    let betroffene_personen = report
        .betroffene_personen_encrypted
        .as_deref()
        .map(|v| state.encryption.decrypt_field(v, &id, "betroffene_personen"))
        .transpose()?;

    Ok(ReportDetail {
        id: report.id,
        reference_code: report.reference_code,
        titel,
        beschreibung,
        melder_name,
        melder_email,
        melder_telefon,
        betroffene_personen,
        kategorie: report.kategorie,
        prioritaet: report.prioritaet,
        status: report.status,
        kanal: report.kanal,
        is_anonymous: report.is_anonymous,
        betroffene_abteilung: report.betroffene_abteilung,
        eingegangen_am: report.eingegangen_am,
        eingangsbestaetigung_frist: report.eingangsbestaetigung_frist,
        eingangsbestaetigung_gesendet_am: report.eingangsbestaetigung_gesendet_am,
        rueckmeldung_frist: report.rueckmeldung_frist,
        rueckmeldung_gesendet_am: report.rueckmeldung_gesendet_am,
    })
}

async fn list(
    State(state): State<AppState>,
    Extension(tenant): Extension<TenantContext>,
    actor: ActorContext,
) -> Result<Json<Vec<ReportDetail>>, ApiError> {
    hinschg_domain::require_capability(actor.role, Capability::ViewSubmissions)?;
    let reports = state.reports.list_by_tenant(tenant.tenant_id).await?;
    let mut out = Vec::with_capacity(reports.len());
    for report in reports {
        out.push(decrypt_detail(&state, report).await?);
    }
    Ok(Json(out))
}

async fn get_one(
    State(state): State<AppState>,
    Extension(tenant): Extension<TenantContext>,
    actor: ActorContext,
    Path(id): Path<Uuid>,
) -> Result<Json<ReportDetail>, ApiError> {
    hinschg_domain::require_capability(actor.role, Capability::ViewSubmissions)?;
    let report = state.reports.get(tenant.tenant_id, id).await?;
    Ok(Json(decrypt_detail(&state, report).await?))
}
