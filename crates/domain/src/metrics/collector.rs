//! Periodic export of case/deadline gauges (C13), run alongside
//! [`crate::deadline::scheduler::DeadlineScheduler`] but kept as its own
//! task: a metrics tick must never be blocked behind - or block - the
//! escalation/reminder sweep.

use chrono::Utc;
use hinschg_core::{CaseMetrics, Result, TenantId};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use crate::compliance::service::ComplianceReporter;
use crate::deadline::repository::DeadlineRepository;
use crate::model::deadline::DeadlineType;
use crate::tenant::repository::TenantRepository;

fn deadline_type_label(deadline_type: DeadlineType) -> &'static str {
    match deadline_type {
        DeadlineType::Ack7d => "ack_7d",
        DeadlineType::Feedback3m => "feedback_3m",
        DeadlineType::Archival3y => "archival_3y",
        DeadlineType::Deletion30d => "deletion_30d",
    }
}

fn status_label(breakdown: &crate::compliance::service::CaseStatusBreakdown) -> [(&'static str, u64); 9] {
    [
        ("offen", breakdown.offen),
        ("zugewiesen", breakdown.zugewiesen),
        ("in_ermittlung", breakdown.in_ermittlung),
        ("stellungnahme", breakdown.stellungnahme),
        ("massnahmen", breakdown.massnahmen),
        ("umsetzung", breakdown.umsetzung),
        ("abgeschlossen", breakdown.abgeschlossen),
        ("eingestellt", breakdown.eingestellt),
        ("eskaliert", breakdown.eskaliert),
    ]
}

pub struct MetricsCollector {
    tenants: Arc<dyn TenantRepository>,
    deadlines: Arc<dyn DeadlineRepository>,
    reporter: Arc<ComplianceReporter>,
    metrics: Arc<CaseMetrics>,
}

impl MetricsCollector {
    pub fn new(
        tenants: Arc<dyn TenantRepository>,
        deadlines: Arc<dyn DeadlineRepository>,
        reporter: Arc<ComplianceReporter>,
        metrics: Arc<CaseMetrics>,
    ) -> Self {
        Self {
            tenants,
            deadlines,
            reporter,
            metrics,
        }
    }

    /// Runs the collection loop every `interval` until the process exits.
    /// Per-tick errors are logged and swallowed, same as the deadline sweep -
    /// a stale gauge reading is far preferable to a dead metrics task.
    pub async fn run_periodically(self: Arc<Self>, interval: StdDuration) {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            if let Err(err) = self.run_once().await {
                tracing::error!(error = %err, "metrics collection failed");
            }
        }
    }

    pub async fn run_once(&self) -> Result<()> {
        for tenant in self.tenants.list().await? {
            if let Err(err) = self.collect_tenant(tenant.id).await {
                tracing::warn!(tenant_id = %tenant.id, error = %err, "metrics collection failed for tenant");
            }
        }
        Ok(())
    }

    async fn collect_tenant(&self, tenant_id: TenantId) -> Result<()> {
        let label = tenant_id.to_string();

        let report = self.reporter.generate(tenant_id).await?;
        for (status, count) in status_label(&report.case_status_breakdown) {
            self.metrics.set_status_count(&label, status, count as i64);
        }
        self.metrics.set_escalated(&label, report.escalated_cases as i64);

        self.metrics.set_deadline_overdue(&label, "ack_7d", report.ack_overdue as i64);
        self.metrics.set_deadline_critical(&label, "ack_7d", report.ack_critical as i64);
        self.metrics.set_deadline_warning(&label, "ack_7d", report.ack_warning as i64);
        self.metrics.set_deadline_overdue(&label, "feedback_3m", report.feedback_overdue as i64);
        self.metrics.set_deadline_critical(&label, "feedback_3m", report.feedback_critical as i64);
        self.metrics.set_deadline_warning(&label, "feedback_3m", report.feedback_warning as i64);

        let now = Utc::now();
        let mut archival_overdue = 0i64;
        let mut deletion_overdue = 0i64;
        for deadline in self.deadlines.list_overdue_not_escalated(tenant_id, now).await? {
            match deadline.deadline_type {
                DeadlineType::Archival3y => archival_overdue += 1,
                DeadlineType::Deletion30d => deletion_overdue += 1,
                DeadlineType::Ack7d | DeadlineType::Feedback3m => {}
            }
        }
        self.metrics.set_deadline_overdue(&label, deadline_type_label(DeadlineType::Archival3y), archival_overdue);
        self.metrics.set_deadline_overdue(&label, deadline_type_label(DeadlineType::Deletion30d), deletion_overdue);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deadline_type_labels_are_stable() {
        assert_eq!(deadline_type_label(DeadlineType::Ack7d), "ack_7d");
        assert_eq!(deadline_type_label(DeadlineType::Deletion30d), "deletion_30d");
    }
}
