//! Periodic background sweep (C10): escalates overdue deadlines, sends
//! upcoming-deadline reminders, and advances the retention/deletion chain -
//! per tenant, transactionally, and idempotently (retries never double-fire
//! a notification or double-delete a case, since every step first consults
//! the `reminder_sent`/`escalated` flags or the row's own existence).

use chrono::{Duration, Utc};
use hinschg_core::audit::{AuditEvent, EventSeverity, EventType};
use hinschg_core::{AuditLogger, Result, TenantId};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use crate::case::repository::CaseRepository;
use crate::model::case::{Case, CaseEvent, CaseStatus};
use crate::model::deadline::{deletion_deadline, Deadline, DeadlineType, REMINDER_WINDOW_DAYS};
use crate::model::tenant::Tenant;
use crate::notification::{NotificationKind, NotificationService};
use crate::report::repository::ReportRepository;
use crate::tenant::repository::TenantRepository;

use super::repository::DeadlineRepository;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepSummary {
    pub escalated: u64,
    pub reminders_sent: u64,
    pub retention_progressed: u64,
    pub purged: u64,
}

impl SweepSummary {
    fn merge(&mut self, other: SweepSummary) {
        self.escalated += other.escalated;
        self.reminders_sent += other.reminders_sent;
        self.retention_progressed += other.retention_progressed;
        self.purged += other.purged;
    }
}

pub struct DeadlineScheduler {
    tenants: Arc<dyn TenantRepository>,
    cases: Arc<dyn CaseRepository>,
    deadlines: Arc<dyn DeadlineRepository>,
    reports: Arc<dyn ReportRepository>,
    notifications: Arc<NotificationService>,
    audit: Arc<AuditLogger>,
}

impl DeadlineScheduler {
    pub fn new(
        tenants: Arc<dyn TenantRepository>,
        cases: Arc<dyn CaseRepository>,
        deadlines: Arc<dyn DeadlineRepository>,
        reports: Arc<dyn ReportRepository>,
        notifications: Arc<NotificationService>,
        audit: Arc<AuditLogger>,
    ) -> Self {
        Self {
            tenants,
            cases,
            deadlines,
            reports,
            notifications,
            audit,
        }
    }

    /// Runs the sweep every `interval` until the process exits. Errors from
    /// one tick are logged, never propagated - a transient DB hiccup must
    /// not kill the background task.
    pub async fn run_periodically(self: Arc<Self>, interval: StdDuration) {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            if let Err(err) = self.run_once().await {
                tracing::error!(error = %err, "deadline sweep failed");
            }
        }
    }

    /// One full pass across every tenant.
    pub async fn run_once(&self) -> Result<SweepSummary> {
        let mut summary = SweepSummary::default();
        for tenant in self.tenants.list().await? {
            match self.sweep_tenant(&tenant).await {
                Ok(partial) => summary.merge(partial),
                Err(err) => tracing::error!(tenant_id = %tenant.id.0, error = %err, "deadline sweep failed for tenant"),
            }
        }
        Ok(summary)
    }

    async fn sweep_tenant(&self, tenant: &Tenant) -> Result<SweepSummary> {
        let now = Utc::now();
        let mut summary = SweepSummary::default();

        for deadline in self.deadlines.list_overdue_not_escalated(tenant.id, now).await? {
            match deadline.deadline_type {
                DeadlineType::Ack7d | DeadlineType::Feedback3m => {
                    self.escalate_case_deadline(tenant, &deadline, now).await?;
                    summary.escalated += 1;
                }
                DeadlineType::Archival3y => {
                    self.advance_to_deletion_window(tenant.id, &deadline, now).await?;
                    summary.retention_progressed += 1;
                }
                DeadlineType::Deletion30d => {
                    self.purge_case(tenant.id, deadline.case_id).await?;
                    summary.purged += 1;
                }
            }
        }

        summary.reminders_sent += self.send_reminders(tenant, now).await?;
        Ok(summary)
    }

    /// Overdue `ack_7d`/`feedback_3m`: escalates the case (if the state
    /// machine allows it from its current status) and notifies the tenant.
    async fn escalate_case_deadline(&self, tenant: &Tenant, deadline: &Deadline, now: chrono::DateTime<Utc>) -> Result<()> {
        self.deadlines.mark_escalated(tenant.id, deadline.id).await?;

        let Some(case) = self.cases.get_by_id(tenant.id, deadline.case_id).await? else {
            return Ok(());
        };

        if case.status.can_transition_to(CaseStatus::Eskaliert) {
            let previous = case.status;
            let case_id = case.id;
            self.cases
                .apply_locked(
                    tenant.id,
                    case_id,
                    Box::new(move |c: &mut Case| c.transition(CaseStatus::Eskaliert, now)),
                    Some(CaseEvent::status_change(case_id, tenant.id, None, previous, CaseStatus::Eskaliert)),
                )
                .await?;
        }

        self.audit
            .log_event(
                AuditEvent::builder(EventType::SecurityPolicyViolation, "statutory deadline overdue; case escalated")
                    .tenant_id(tenant.id.0.to_string())
                    .resource("case", case.id.to_string())
                    .severity(EventSeverity::Critical)
                    .metadata("deadline_type", serde_json::json!(format!("{:?}", deadline.deadline_type)))
                    .build(),
            )
            .await?;

        self.notifications
            .enqueue(
                &tenant.contact_email,
                NotificationKind::FristUeberschritten,
                serde_json::json!({
                    "case_number": case.case_number,
                    "deadline_type": format!("{:?}", deadline.deadline_type),
                }),
            )
            .await?;

        Ok(())
    }

    /// Overdue `archival_3y`: the retention window has ended. Opens the
    /// 30-day deletion grace period rather than deleting immediately.
    async fn advance_to_deletion_window(&self, tenant_id: TenantId, deadline: &Deadline, now: chrono::DateTime<Utc>) -> Result<()> {
        self.deadlines.mark_escalated(tenant_id, deadline.id).await?;
        self.deadlines.mark_done(tenant_id, deadline.case_id, DeadlineType::Archival3y, now).await?;
        self.deadlines
            .create(&Deadline::new(deadline.case_id, DeadlineType::Deletion30d, deletion_deadline(deadline.due_at)))
            .await?;

        self.audit
            .log_event(
                AuditEvent::builder(EventType::ConfigurationChanged, "retention period elapsed; deletion grace period started")
                    .tenant_id(tenant_id.0.to_string())
                    .resource("case", deadline.case_id.to_string())
                    .build(),
            )
            .await?;

        Ok(())
    }

    /// Overdue `deletion_30d`: permanently erases the report (cascading to
    /// its case, events, deadlines, and attachments). Idempotent by
    /// construction - a case already deleted simply yields no matching row
    /// on a retried sweep.
    async fn purge_case(&self, tenant_id: TenantId, case_id: uuid::Uuid) -> Result<()> {
        let Some(case) = self.cases.get_by_id(tenant_id, case_id).await? else {
            return Ok(());
        };

        self.reports.delete(tenant_id, case.report_id).await?;
        self.cases.delete(tenant_id, case.id).await?;

        self.audit
            .log_event(
                AuditEvent::builder(EventType::ResourceDeleted, "retention and deletion grace period elapsed; case and report permanently deleted")
                    .tenant_id(tenant_id.0.to_string())
                    .resource("case", case.id.to_string())
                    .severity(EventSeverity::Warning)
                    .build(),
            )
            .await?;

        Ok(())
    }

    async fn send_reminders(&self, tenant: &Tenant, now: chrono::DateTime<Utc>) -> Result<u64> {
        let upcoming = self
            .deadlines
            .list_upcoming_not_reminded(tenant.id, now, Duration::days(REMINDER_WINDOW_DAYS))
            .await?;

        let mut count = 0;
        for deadline in upcoming {
            self.deadlines.mark_reminder_sent(tenant.id, deadline.id).await?;

            if let Some(case) = self.cases.get_by_id(tenant.id, deadline.case_id).await? {
                self.notifications
                    .enqueue(
                        &tenant.contact_email,
                        NotificationKind::RueckmeldungErinnerung,
                        serde_json::json!({
                            "case_number": case.case_number,
                            "due_at": deadline.due_at.to_rfc3339(),
                        }),
                    )
                    .await?;
            }
            count += 1;
        }
        Ok(count)
    }
}
