//! Identity-masked case/report projection for the independent ombudsperson
//! role (C9). This is a read-side view composed from the existing case and
//! report repositories, not a persisted entity of its own; the one mutation
//! it exposes (`record_recommendation`) delegates straight into
//! `CaseService` so the state machine's invariants stay in one place.

use chrono::{DateTime, Utc};
use hinschg_core::security::EncryptionService;
use hinschg_core::{Error, Result, TenantId, UserId};
use std::sync::Arc;
use uuid::Uuid;

use crate::case::repository::CaseRepository;
use crate::case::service::CaseService;
use crate::model::case::{Case, CaseEventType, CaseStatus, Recommendation, Severity};
use crate::model::report::ReportCategory;
use crate::model::tenant::TenantConfig;
use crate::report::repository::ReportRepository;

/// Literal replacement for every identity-bearing field, per spec.
pub const REDACTED: &str = "[vertraulich]";

const DESCRIPTION_PASSTHROUGH_FLAG: &str = "ombudsperson_description_passthrough";

#[derive(Debug, Clone)]
pub struct MaskedCaseEvent {
    pub event_type: CaseEventType,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct OmbudspersonCaseView {
    pub id: Uuid,
    pub case_number: String,
    pub status: CaseStatus,
    pub severity: Severity,
    pub kategorie: ReportCategory,
    pub betroffene_abteilung: Option<String>,
    pub zeitraum_von: Option<DateTime<Utc>>,
    pub zeitraum_bis: Option<DateTime<Utc>>,
    pub schaetzung_schaden: Option<String>,
    /// Always `REDACTED` - never the reporter's actual identity, even when
    /// the report is non-anonymous.
    pub melder_identitaet: &'static str,
    /// `Some(plaintext)` only when the tenant has opted into
    /// `ombudsperson_description_passthrough`; `None` otherwise.
    pub beschreibung: Option<String>,
    pub forwarded_to_ombudsperson_at: Option<DateTime<Utc>>,
    pub ombudsperson_recommendation: Option<Recommendation>,
    pub history: Vec<MaskedCaseEvent>,
}

pub struct OmbudspersonService {
    cases: Arc<dyn CaseRepository>,
    reports: Arc<dyn ReportRepository>,
    case_service: Arc<CaseService>,
    encryption: Arc<EncryptionService>,
}

impl OmbudspersonService {
    pub fn new(
        cases: Arc<dyn CaseRepository>,
        reports: Arc<dyn ReportRepository>,
        case_service: Arc<CaseService>,
        encryption: Arc<EncryptionService>,
    ) -> Self {
        Self {
            cases,
            reports,
            case_service,
            encryption,
        }
    }

    /// Returns `Forbidden` for any case not forwarded to the ombudsperson
    /// role - regardless of which specific ombudsperson asks, since
    /// forwarding is a case-level gate, not a per-user assignment.
    pub async fn view_case(&self, tenant_id: TenantId, case_id: Uuid, config: &TenantConfig) -> Result<OmbudspersonCaseView> {
        let case = self.cases.get_by_id(tenant_id, case_id).await?.ok_or_else(|| Error::not_found("case not found"))?;
        if case.forwarded_to_ombudsperson_at.is_none() {
            return Err(Error::forbidden("case has not been forwarded to an ombudsperson"));
        }
        self.project(case, config).await
    }

    pub async fn list_cases(&self, tenant_id: TenantId, config: &TenantConfig) -> Result<Vec<OmbudspersonCaseView>> {
        let cases = self.cases.list_forwarded_to_ombudsperson(tenant_id).await?;
        let mut views = Vec::with_capacity(cases.len());
        for case in cases {
            views.push(self.project(case, config).await?);
        }
        Ok(views)
    }

    async fn project(&self, case: Case, config: &TenantConfig) -> Result<OmbudspersonCaseView> {
        let report = self
            .reports
            .get_by_id(case.tenant_id, case.report_id)
            .await?
            .ok_or_else(|| Error::not_found("report not found"))?;

        let beschreibung = if config.feature_flags.iter().any(|f| f == DESCRIPTION_PASSTHROUGH_FLAG) {
            Some(self.encryption.decrypt_field(&report.beschreibung_encrypted, &report.id.to_string(), "beschreibung")?)
        } else {
            None
        };

        let history = self
            .cases
            .list_events(case.tenant_id, case.id)
            .await?
            .into_iter()
            .filter(|event| event.event_type != CaseEventType::NoteAdded)
            .map(|event| MaskedCaseEvent {
                event_type: event.event_type,
                description: event.description,
                created_at: event.created_at,
            })
            .collect();

        Ok(OmbudspersonCaseView {
            id: case.id,
            case_number: case.case_number,
            status: case.status,
            severity: case.severity,
            kategorie: report.kategorie,
            betroffene_abteilung: report.betroffene_abteilung,
            zeitraum_von: report.zeitraum_von,
            zeitraum_bis: report.zeitraum_bis,
            schaetzung_schaden: report.schaetzung_schaden,
            melder_identitaet: REDACTED,
            beschreibung,
            forwarded_to_ombudsperson_at: case.forwarded_to_ombudsperson_at,
            ombudsperson_recommendation: case.ombudsperson_recommendation,
            history,
        })
    }

    /// Delegates to `CaseService::record_recommendation`, which already
    /// enforces the forwarded-and-not-yet-recorded invariant and returns
    /// `Conflict` (naming the existing recommendation) on a repeat call.
    pub async fn record_recommendation(
        &self,
        tenant_id: TenantId,
        case_id: Uuid,
        actor_id: UserId,
        recommendation: Recommendation,
        notes_plain: Option<&str>,
        config: &TenantConfig,
    ) -> Result<Case> {
        let notes_encrypted = notes_plain
            .map(|notes| self.encryption.encrypt_field(notes, &case_id.to_string(), "ombudsperson_notes"))
            .transpose()?;

        self.case_service
            .record_recommendation(tenant_id, case_id, actor_id, recommendation, notes_encrypted, config)
            .await
    }
}
