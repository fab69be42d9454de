//! Aggregates per-tenant statistics into a point-in-time compliance report
//! artifact (C12), grounded in the same warnstufe thresholds the original
//! `hinschg_compliance.py` sweep applies
//! ([`crate::model::deadline::classify_pre_warning`]) rather than a new
//! threshold pair of its own. Read-only: it never mutates a case, report,
//! or deadline - just counts what the existing repositories already hold.

use chrono::{DateTime, Utc};
use hinschg_core::{Result, TenantId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::case::repository::CaseRepository;
use crate::model::case::CaseStatus;
use crate::model::deadline::{classify_pre_warning, CompliancePreWarning};
use crate::report::repository::ReportRepository;

/// Count of open cases per status, for every one of the 9 states -
/// including the ones currently at zero, so a consumer never has to
/// special-case a missing key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CaseStatusBreakdown {
    pub offen: u64,
    pub zugewiesen: u64,
    pub in_ermittlung: u64,
    pub stellungnahme: u64,
    pub massnahmen: u64,
    pub umsetzung: u64,
    pub abgeschlossen: u64,
    pub eingestellt: u64,
    pub eskaliert: u64,
}

impl CaseStatusBreakdown {
    fn record(&mut self, status: CaseStatus) {
        match status {
            CaseStatus::Offen => self.offen += 1,
            CaseStatus::Zugewiesen => self.zugewiesen += 1,
            CaseStatus::InErmittlung => self.in_ermittlung += 1,
            CaseStatus::Stellungnahme => self.stellungnahme += 1,
            CaseStatus::Massnahmen => self.massnahmen += 1,
            CaseStatus::Umsetzung => self.umsetzung += 1,
            CaseStatus::Abgeschlossen => self.abgeschlossen += 1,
            CaseStatus::Eingestellt => self.eingestellt += 1,
            CaseStatus::Eskaliert => self.eskaliert += 1,
        }
    }
}

/// A single point-in-time compliance snapshot for one tenant. Nothing
/// here is persisted - a caller wanting history takes its own snapshots
/// over time (e.g. the admin/export handler serializing this to PDF
/// upstream, outside this crate's scope).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceReport {
    pub tenant_id: TenantId,
    pub generated_at: DateTime<Utc>,
    pub total_reports: u64,
    pub total_cases: u64,
    pub case_status_breakdown: CaseStatusBreakdown,
    pub escalated_cases: u64,
    pub ack_overdue: u64,
    pub ack_critical: u64,
    pub ack_warning: u64,
    pub feedback_overdue: u64,
    pub feedback_critical: u64,
    pub feedback_warning: u64,
}

pub struct ComplianceReporter {
    cases: Arc<dyn CaseRepository>,
    reports: Arc<dyn ReportRepository>,
}

impl ComplianceReporter {
    pub fn new(cases: Arc<dyn CaseRepository>, reports: Arc<dyn ReportRepository>) -> Self {
        Self { cases, reports }
    }

    pub async fn generate(&self, tenant_id: TenantId) -> Result<ComplianceReport> {
        let now = Utc::now();

        let cases = self.cases.list_by_tenant(tenant_id).await?;
        let mut case_status_breakdown = CaseStatusBreakdown::default();
        let mut escalated_cases = 0;
        for case in &cases {
            case_status_breakdown.record(case.status);
            if case.eskaliert {
                escalated_cases += 1;
            }
        }

        let reports = self.reports.list_by_tenant(tenant_id).await?;
        let mut ack_overdue = 0;
        let mut ack_critical = 0;
        let mut ack_warning = 0;
        let mut feedback_overdue = 0;
        let mut feedback_critical = 0;
        let mut feedback_warning = 0;

        for report in &reports {
            let ack_done = report.eingangsbestaetigung_gesendet_am.is_some();
            match classify_pre_warning(report.eingangsbestaetigung_frist, ack_done, now) {
                CompliancePreWarning::Critical if !ack_done => ack_critical += 1,
                CompliancePreWarning::Warning if !ack_done => ack_warning += 1,
                _ => {}
            }
            if !ack_done && now > report.eingangsbestaetigung_frist {
                ack_overdue += 1;
            }

            let feedback_done = report.rueckmeldung_gesendet_am.is_some();
            match classify_pre_warning(report.rueckmeldung_frist, feedback_done, now) {
                CompliancePreWarning::Critical if !feedback_done => feedback_critical += 1,
                CompliancePreWarning::Warning if !feedback_done => feedback_warning += 1,
                _ => {}
            }
            if !feedback_done && now > report.rueckmeldung_frist {
                feedback_overdue += 1;
            }
        }

        Ok(ComplianceReport {
            tenant_id,
            generated_at: now,
            total_reports: reports.len() as u64,
            total_cases: cases.len() as u64,
            case_status_breakdown,
            escalated_cases,
            ack_overdue,
            ack_critical,
            ack_warning,
            feedback_overdue,
            feedback_critical,
            feedback_warning,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn breakdown_starts_at_zero_for_every_status() {
        let breakdown = CaseStatusBreakdown::default();
        assert_eq!(breakdown.offen, 0);
        assert_eq!(breakdown.eskaliert, 0);
    }

    #[test]
    fn breakdown_records_into_the_matching_bucket() {
        let mut breakdown = CaseStatusBreakdown::default();
        breakdown.record(CaseStatus::Eskaliert);
        breakdown.record(CaseStatus::Eskaliert);
        breakdown.record(CaseStatus::Offen);
        assert_eq!(breakdown.eskaliert, 2);
        assert_eq!(breakdown.offen, 1);
    }
}
