//! The case state-machine orchestrator (C6): the only place a status
//! transition, its history entry, its audit entry, and its deadline
//! side-effects are committed together.
//!
//! Every public mutator here ends in exactly one `CaseRepository::apply_locked`
//! call (so the read-modify-write is atomic under the row lock) followed by
//! whichever deadline bookkeeping and audit emission the operation implies.
//! `Case::transition`/`acknowledge`/`resolve`/... themselves stay pure and
//! synchronous in `model::case` - this service is where they meet I/O.

use chrono::Utc;
use hinschg_core::audit::{AuditEvent, EventSeverity, EventType};
use hinschg_core::{AuditLogger, Error, Result, TenantId, UserId};
use std::sync::Arc;
use uuid::Uuid;

use crate::deadline::repository::DeadlineRepository;
use crate::model::case::{Case, CaseEvent, CaseEventType, CaseStatus, Recommendation, Severity};
use crate::model::deadline::{ack_deadline, archival_deadline, deletion_deadline, feedback_deadline, Deadline, DeadlineType};
use crate::model::tenant::TenantConfig;
use crate::report::service::ReportService;

use super::repository::CaseRepository;

pub struct CaseService {
    repository: Arc<dyn CaseRepository>,
    deadlines: Arc<dyn DeadlineRepository>,
    reports: Arc<ReportService>,
    audit: Arc<AuditLogger>,
}

impl CaseService {
    pub fn new(
        repository: Arc<dyn CaseRepository>,
        deadlines: Arc<dyn DeadlineRepository>,
        reports: Arc<ReportService>,
        audit: Arc<AuditLogger>,
    ) -> Self {
        Self {
            repository,
            deadlines,
            reports,
            audit,
        }
    }

    /// Opens the case around a freshly submitted report, carrying the two
    /// statutory deadlines already computed at intake.
    pub async fn open_for_report(
        &self,
        tenant_id: TenantId,
        report_id: Uuid,
        case_number: impl Into<String>,
        severity: Severity,
        eingegangen_am: chrono::DateTime<Utc>,
        config: &TenantConfig,
    ) -> Result<Case> {
        let case = Case::new(tenant_id, report_id, case_number, severity);
        let created = self.repository.create(&case).await?;

        self.deadlines
            .create(&Deadline::new(created.id, DeadlineType::Ack7d, ack_deadline(eingegangen_am, config)))
            .await?;
        self.deadlines
            .create(&Deadline::new(created.id, DeadlineType::Feedback3m, feedback_deadline(eingegangen_am, config)))
            .await?;

        self.audit
            .log_event(
                AuditEvent::builder(EventType::ResourceCreated, "case opened")
                    .tenant_id(tenant_id.0.to_string())
                    .resource("case", created.id.to_string())
                    .new_values(serde_json::json!({ "case_number": created.case_number, "report_id": report_id }))
                    .build(),
            )
            .await?;

        Ok(created)
    }

    pub async fn get(&self, tenant_id: TenantId, id: Uuid) -> Result<Case> {
        self.repository
            .get_by_id(tenant_id, id)
            .await?
            .ok_or_else(|| Error::not_found("case not found"))
    }

    pub async fn list_by_tenant(&self, tenant_id: TenantId) -> Result<Vec<Case>> {
        self.repository.list_by_tenant(tenant_id).await
    }

    pub async fn list_assigned(&self, tenant_id: TenantId, assignee: UserId) -> Result<Vec<Case>> {
        self.repository.list_assigned(tenant_id, assignee).await
    }

    pub async fn history(&self, tenant_id: TenantId, case_id: Uuid) -> Result<Vec<CaseEvent>> {
        self.repository.list_events(tenant_id, case_id).await
    }

    /// Drives the 9-state machine. Locks the row, applies `Case::transition`,
    /// appends the history entry, and - on reaching `Abgeschlossen` - opens
    /// the archival deadline (sized by the tenant's configured retention
    /// period) and mirrors the retention window onto the owning report. A
    /// transition into `Zugewiesen` must carry `assignee`.
    pub async fn transition(
        &self,
        tenant_id: TenantId,
        case_id: Uuid,
        next: CaseStatus,
        assignee: Option<UserId>,
        actor_id: UserId,
        config: &TenantConfig,
    ) -> Result<Case> {
        let now = Utc::now();
        let previous = self.get(tenant_id, case_id).await?.status;

        let case = self
            .repository
            .apply_locked(
                tenant_id,
                case_id,
                Box::new(move |case: &mut Case| {
                    if let Some(assignee) = assignee {
                        case.assignee = Some(assignee);
                    }
                    case.transition(next, now)
                }),
                Some(CaseEvent::status_change(case_id, tenant_id, Some(actor_id), previous, next)),
            )
            .await?;

        if next == CaseStatus::Abgeschlossen {
            let archival_due = archival_deadline(now, config);
            self.deadlines
                .create(&Deadline::new(case.id, DeadlineType::Archival3y, archival_due))
                .await?;
            self.reports
                .schedule_closure(tenant_id, case.report_id, archival_due, deletion_deadline(archival_due), now)
                .await?;

            // Closure into `abgeschlossen` fulfils the `feedback_3m` deadline
            // even if `resolve()` was never separately invoked.
            if case.resolved_at.is_none() {
                self.deadlines.mark_done(tenant_id, case_id, DeadlineType::Feedback3m, now).await?;
                self.reports.mark_resolved(tenant_id, case.report_id, now).await?;
            }
        }

        self.audit
            .log_event(
                AuditEvent::builder(EventType::ResourceUpdated, "case status transitioned")
                    .actor_id(actor_id.0.to_string())
                    .tenant_id(tenant_id.0.to_string())
                    .resource("case", case_id.to_string())
                    .previous_values(serde_json::json!({ "status": previous.as_str() }))
                    .new_values(serde_json::json!({ "status": next.as_str() }))
                    .severity(if next == CaseStatus::Eskaliert { EventSeverity::Warning } else { EventSeverity::Info })
                    .build(),
            )
            .await?;

        Ok(case)
    }

    /// Completes the 7-day acknowledgement deadline. At-most-once; a repeat
    /// surfaces `Case::acknowledge`'s `Conflict`.
    pub async fn acknowledge(&self, tenant_id: TenantId, case_id: Uuid, actor_id: UserId) -> Result<Case> {
        let now = Utc::now();
        let case = self
            .repository
            .apply_locked(
                tenant_id,
                case_id,
                Box::new(move |case: &mut Case| case.acknowledge(now)),
                Some(CaseEvent::simple(
                    case_id,
                    tenant_id,
                    Some(actor_id),
                    CaseEventType::Acknowledged,
                    "acknowledgement sent to reporter",
                )),
            )
            .await?;

        self.deadlines.mark_done(tenant_id, case_id, DeadlineType::Ack7d, now).await?;
        self.reports.mark_acknowledged(tenant_id, case.report_id, now).await?;

        self.audit
            .log_event(
                AuditEvent::builder(EventType::ResourceUpdated, "case acknowledged")
                    .actor_id(actor_id.0.to_string())
                    .tenant_id(tenant_id.0.to_string())
                    .resource("case", case_id.to_string())
                    .build(),
            )
            .await?;

        Ok(case)
    }

    /// Completes the 90-day feedback deadline.
    pub async fn resolve(&self, tenant_id: TenantId, case_id: Uuid, actor_id: UserId) -> Result<Case> {
        let now = Utc::now();
        let case = self
            .repository
            .apply_locked(
                tenant_id,
                case_id,
                Box::new(move |case: &mut Case| case.resolve(now)),
                Some(CaseEvent::simple(
                    case_id,
                    tenant_id,
                    Some(actor_id),
                    CaseEventType::Resolved,
                    "feedback provided to reporter",
                )),
            )
            .await?;

        self.deadlines.mark_done(tenant_id, case_id, DeadlineType::Feedback3m, now).await?;
        self.reports.mark_resolved(tenant_id, case.report_id, now).await?;

        self.audit
            .log_event(
                AuditEvent::builder(EventType::ResourceUpdated, "case resolved")
                    .actor_id(actor_id.0.to_string())
                    .tenant_id(tenant_id.0.to_string())
                    .resource("case", case_id.to_string())
                    .build(),
            )
            .await?;

        Ok(case)
    }

    /// At-most-once forward to the internal/external ombudsperson (C9).
    pub async fn forward_to_ombudsperson(&self, tenant_id: TenantId, case_id: Uuid, actor_id: UserId) -> Result<Case> {
        let now = Utc::now();
        let case = self
            .repository
            .apply_locked(
                tenant_id,
                case_id,
                Box::new(move |case: &mut Case| case.forward_to_ombudsperson(actor_id, now)),
                Some(CaseEvent::simple(
                    case_id,
                    tenant_id,
                    Some(actor_id),
                    CaseEventType::ForwardedToOmbudsperson,
                    "forwarded to ombudsperson",
                )),
            )
            .await?;

        self.audit
            .log_event(
                AuditEvent::builder(EventType::ResourceUpdated, "case forwarded to ombudsperson")
                    .actor_id(actor_id.0.to_string())
                    .tenant_id(tenant_id.0.to_string())
                    .resource("case", case_id.to_string())
                    .build(),
            )
            .await?;

        Ok(case)
    }

    /// Records the ombudsperson's recommendation. A recommendation of
    /// `Escalate` additionally attempts the `Eskaliert` transition - but a
    /// transition failure (e.g. the case is already closed) must not roll
    /// back the recorded recommendation, per `Case::record_recommendation`'s
    /// own contract.
    pub async fn record_recommendation(
        &self,
        tenant_id: TenantId,
        case_id: Uuid,
        actor_id: UserId,
        recommendation: Recommendation,
        notes_encrypted: Option<String>,
        config: &TenantConfig,
    ) -> Result<Case> {
        let now = Utc::now();
        let case = self
            .repository
            .apply_locked(
                tenant_id,
                case_id,
                Box::new(move |case: &mut Case| case.record_recommendation(actor_id, recommendation, notes_encrypted, now)),
                Some(CaseEvent::simple(
                    case_id,
                    tenant_id,
                    Some(actor_id),
                    CaseEventType::RecommendationRecorded,
                    format!("ombudsperson recommendation recorded: {recommendation:?}"),
                )),
            )
            .await?;

        self.audit
            .log_event(
                AuditEvent::builder(EventType::ResourceUpdated, "ombudsperson recommendation recorded")
                    .actor_id(actor_id.0.to_string())
                    .tenant_id(tenant_id.0.to_string())
                    .resource("case", case_id.to_string())
                    .new_values(serde_json::json!({ "recommendation": format!("{recommendation:?}") }))
                    .build(),
            )
            .await?;

        if recommendation == Recommendation::Escalate && case.status.can_transition_to(CaseStatus::Eskaliert) {
            return self.transition(tenant_id, case_id, CaseStatus::Eskaliert, None, actor_id, config).await;
        }

        Ok(case)
    }

    pub async fn delete(&self, tenant_id: TenantId, id: Uuid, actor_id: UserId) -> Result<()> {
        self.repository.delete(tenant_id, id).await?;
        self.audit
            .log_event(
                AuditEvent::builder(EventType::ResourceDeleted, "case deleted")
                    .actor_id(actor_id.0.to_string())
                    .tenant_id(tenant_id.0.to_string())
                    .resource("case", id.to_string())
                    .severity(EventSeverity::Warning)
                    .build(),
            )
            .await?;
        Ok(())
    }
}
