//! Submission intake (C7): validates, encrypts, persists reports; issues
//! reference and access codes; schedules the two initial statutory
//! deadlines.

use chrono::Utc;
use hinschg_core::audit::{AuditEvent, EventType};
use hinschg_core::security::{AccessCode, EncryptionService};
use hinschg_core::{AuditLogger, Error, Result, TenantId};
use std::sync::Arc;
use uuid::Uuid;

use crate::model::deadline::{ack_deadline, feedback_deadline};
use crate::model::report::{generate_reference_code, Report, ReportCategory, ReportChannel, ReportPriority, ReportStatus};
use crate::model::tenant::TenantConfig;
use crate::report::repository::ReportRepository;

const MIN_DESCRIPTION_LEN: usize = 20;
const ACCESS_CODE_SALT: &str = "report-access-code";
const IP_HASH_SALT: &str = "report-ip";

pub struct ReportIntake<'a> {
    pub titel: &'a str,
    pub beschreibung: &'a str,
    pub kategorie: ReportCategory,
    pub kanal: ReportChannel,
    pub sprache: &'a str,
    pub melder_name: Option<&'a str>,
    pub melder_email: Option<&'a str>,
    pub melder_telefon: Option<&'a str>,
    pub betroffene_personen: Option<&'a str>,
    pub betroffene_abteilung: Option<&'a str>,
    pub raw_ip: Option<&'a str>,
}

pub struct ReportService {
    repository: Arc<dyn ReportRepository>,
    encryption: Arc<EncryptionService>,
    audit: Arc<AuditLogger>,
}

impl ReportService {
    pub fn new(repository: Arc<dyn ReportRepository>, encryption: Arc<EncryptionService>, audit: Arc<AuditLogger>) -> Self {
        Self {
            repository,
            encryption,
            audit,
        }
    }

    /// Returns the persisted report together with the plaintext access
    /// code - the only moment it exists outside the hash.
    pub async fn submit(&self, tenant_id: TenantId, config: &TenantConfig, intake: ReportIntake<'_>) -> Result<(Report, String)> {
        if intake.beschreibung.chars().count() < MIN_DESCRIPTION_LEN {
            return Err(Error::validation(format!(
                "description must be at least {MIN_DESCRIPTION_LEN} characters"
            )));
        }

        let id = Uuid::new_v4();
        let now = Utc::now();
        let reference_code = generate_reference_code(now);
        let access_code = AccessCode::generate();
        let access_code_hash = EncryptionService::hash_for_search(&access_code, ACCESS_CODE_SALT);

        let titel_encrypted = self.encryption.encrypt_field(intake.titel, &id.to_string(), "titel")?;
        let beschreibung_encrypted = self.encryption.encrypt_field(intake.beschreibung, &id.to_string(), "beschreibung")?;
        let melder_name_encrypted = intake
            .melder_name
            .map(|v| self.encryption.encrypt_field(v, &id.to_string(), "melder_name"))
            .transpose()?;
        let melder_email_encrypted = intake
            .melder_email
            .map(|v| self.encryption.encrypt_field(v, &id.to_string(), "melder_email"))
            .transpose()?;
        let melder_telefon_encrypted = intake
            .melder_telefon
            .map(|v| self.encryption.encrypt_field(v, &id.to_string(), "melder_telefon"))
            .transpose()?;
        let betroffene_personen_encrypted = intake
            .betroffene_personen
            .map(|v| self.encryption.encrypt_field(v, &id.to_string(), "betroffene_personen"))
            .transpose()?;
        let ip_hash = intake.raw_ip.map(|ip| EncryptionService::hash_for_search(ip, IP_HASH_SALT));

        let is_anonymous = intake.melder_name.is_none() && intake.melder_email.is_none() && intake.melder_telefon.is_none();

        let report = Report {
            id,
            tenant_id,
            reference_code,
            access_code_hash,
            titel_encrypted,
            beschreibung_encrypted,
            melder_name_encrypted,
            melder_email_encrypted,
            melder_telefon_encrypted,
            betroffene_personen_encrypted,
            kategorie: intake.kategorie,
            prioritaet: ReportPriority::Mittel,
            status: ReportStatus::Eingegangen,
            kanal: intake.kanal,
            sprache: intake.sprache.to_string(),
            ip_hash,
            is_anonymous,
            betroffene_abteilung: intake.betroffene_abteilung.map(str::to_string),
            zeitraum_von: None,
            zeitraum_bis: None,
            schaetzung_schaden: None,
            tags: Vec::new(),
            eingegangen_am: now,
            eingangsbestaetigung_frist: ack_deadline(now, config),
            eingangsbestaetigung_gesendet_am: None,
            rueckmeldung_frist: feedback_deadline(now, config),
            rueckmeldung_gesendet_am: None,
            aufbewahrung_bis: None,
            loeschung_geplant_am: None,
            created_at: now,
            updated_at: now,
        };

        let created = self.repository.create(&report).await?;

        self.audit
            .log_event(
                AuditEvent::builder(EventType::ResourceCreated, "report submitted")
                    .tenant_id(tenant_id.0.to_string())
                    .resource("report", created.id.to_string())
                    .new_values(serde_json::json!({
                        "reference_code": created.reference_code,
                        "kategorie": created.kategorie,
                        "kanal": created.kanal,
                    }))
                    .build(),
            )
            .await?;

        Ok((created, access_code))
    }

    pub async fn get(&self, tenant_id: TenantId, id: Uuid) -> Result<Report> {
        self.repository
            .get_by_id(tenant_id, id)
            .await?
            .ok_or_else(|| Error::not_found("report not found"))
    }

    /// Unauthenticated status lookup by access code. Caller is responsible
    /// for any rate limiting at this entry point.
    pub async fn get_by_access_code(&self, access_code: &str) -> Result<Report> {
        let hash = EncryptionService::hash_for_search(access_code, ACCESS_CODE_SALT);
        self.repository
            .get_by_access_code_hash(&hash)
            .await?
            .ok_or_else(|| Error::not_found("no report for this access code"))
    }

    pub async fn list_by_tenant(&self, tenant_id: TenantId) -> Result<Vec<Report>> {
        self.repository.list_by_tenant(tenant_id).await
    }

    /// Mirrors the case-level acknowledge/resolve timestamps onto the
    /// owning report row. Called by `case::service` after the
    /// corresponding `Case` operation succeeds - never invoked directly.
    pub async fn mark_acknowledged(&self, tenant_id: TenantId, id: Uuid, now: chrono::DateTime<Utc>) -> Result<()> {
        let mut report = self.get(tenant_id, id).await?;
        report.eingangsbestaetigung_gesendet_am = Some(now);
        report.updated_at = now;
        self.repository.update(&report).await
    }

    pub async fn mark_resolved(&self, tenant_id: TenantId, id: Uuid, now: chrono::DateTime<Utc>) -> Result<()> {
        let mut report = self.get(tenant_id, id).await?;
        report.rueckmeldung_gesendet_am = Some(now);
        report.updated_at = now;
        self.repository.update(&report).await
    }

    /// Schedules the archival/deletion targets once the case around this
    /// report closes.
    pub async fn schedule_closure(
        &self,
        tenant_id: TenantId,
        id: Uuid,
        aufbewahrung_bis: chrono::DateTime<Utc>,
        loeschung_geplant_am: chrono::DateTime<Utc>,
        now: chrono::DateTime<Utc>,
    ) -> Result<()> {
        let mut report = self.get(tenant_id, id).await?;
        report.status = ReportStatus::Abgeschlossen;
        report.aufbewahrung_bis = Some(aufbewahrung_bis);
        report.loeschung_geplant_am = Some(loeschung_geplant_am);
        report.updated_at = now;
        self.repository.update(&report).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn description_below_minimum_length_is_rejected_before_any_io() {
        assert!("too short".chars().count() < MIN_DESCRIPTION_LEN);
    }
}
