use prometheus::{IntCounterVec, IntGaugeVec, Opts};

use super::registry::MetricsRegistry;

/// Case and deadline gauges/counters exported for tenant-level compliance
/// monitoring. Values are set by a periodic collector in the domain layer
/// (grounded on [`crate::audit`]'s pattern of a thin, typed wrapper so
/// callers never touch `prometheus` directly); this type only owns the
/// metric definitions and their label contracts.
#[derive(Debug, Clone)]
pub struct CaseMetrics {
    pub cases_by_status: IntGaugeVec,
    pub cases_escalated: IntGaugeVec,
    pub deadlines_overdue: IntGaugeVec,
    pub deadlines_critical: IntGaugeVec,
    pub deadlines_warning: IntGaugeVec,
    pub reports_submitted_total: IntCounterVec,
    pub anon_submissions_total: IntCounterVec,
}

impl CaseMetrics {
    pub fn new(namespace: &str) -> Result<Self, prometheus::Error> {
        let cases_by_status = IntGaugeVec::new(
            Opts::new(format!("{namespace}_cases_by_status"), "Current number of cases in each status"),
            &["tenant_id", "status"],
        )?;

        let cases_escalated = IntGaugeVec::new(
            Opts::new(format!("{namespace}_cases_escalated"), "Current number of escalated cases"),
            &["tenant_id"],
        )?;

        let deadlines_overdue = IntGaugeVec::new(
            Opts::new(format!("{namespace}_deadlines_overdue"), "Current number of overdue statutory deadlines"),
            &["tenant_id", "deadline_type"],
        )?;

        let deadlines_critical = IntGaugeVec::new(
            Opts::new(
                format!("{namespace}_deadlines_critical"),
                "Current number of deadlines within the critical pre-warning window",
            ),
            &["tenant_id", "deadline_type"],
        )?;

        let deadlines_warning = IntGaugeVec::new(
            Opts::new(
                format!("{namespace}_deadlines_warning"),
                "Current number of deadlines within the warning pre-warning window",
            ),
            &["tenant_id", "deadline_type"],
        )?;

        let reports_submitted_total = IntCounterVec::new(
            Opts::new(format!("{namespace}_reports_submitted_total"), "Total number of reports submitted"),
            &["tenant_id", "channel"],
        )?;

        let anon_submissions_total = IntCounterVec::new(
            Opts::new(
                format!("{namespace}_anon_submissions_total"),
                "Total number of anonymous-channel submissions",
            ),
            &["tenant_id"],
        )?;

        Ok(Self {
            cases_by_status,
            cases_escalated,
            deadlines_overdue,
            deadlines_critical,
            deadlines_warning,
            reports_submitted_total,
            anon_submissions_total,
        })
    }

    pub fn register_all(&self, registry: &MetricsRegistry) -> Result<(), prometheus::Error> {
        registry.register(self.cases_by_status.clone())?;
        registry.register(self.cases_escalated.clone())?;
        registry.register(self.deadlines_overdue.clone())?;
        registry.register(self.deadlines_critical.clone())?;
        registry.register(self.deadlines_warning.clone())?;
        registry.register(self.reports_submitted_total.clone())?;
        registry.register(self.anon_submissions_total.clone())?;
        Ok(())
    }

    pub fn set_status_count(&self, tenant_id: &str, status: &str, count: i64) {
        self.cases_by_status.with_label_values(&[tenant_id, status]).set(count);
    }

    pub fn set_escalated(&self, tenant_id: &str, count: i64) {
        self.cases_escalated.with_label_values(&[tenant_id]).set(count);
    }

    pub fn set_deadline_overdue(&self, tenant_id: &str, deadline_type: &str, count: i64) {
        self.deadlines_overdue.with_label_values(&[tenant_id, deadline_type]).set(count);
    }

    pub fn set_deadline_critical(&self, tenant_id: &str, deadline_type: &str, count: i64) {
        self.deadlines_critical.with_label_values(&[tenant_id, deadline_type]).set(count);
    }

    pub fn set_deadline_warning(&self, tenant_id: &str, deadline_type: &str, count: i64) {
        self.deadlines_warning.with_label_values(&[tenant_id, deadline_type]).set(count);
    }

    pub fn inc_report_submitted(&self, tenant_id: &str, channel: &str) {
        self.reports_submitted_total.with_label_values(&[tenant_id, channel]).inc();
    }

    pub fn inc_anon_submission(&self, tenant_id: &str) {
        self.anon_submissions_total.with_label_values(&[tenant_id]).inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_builds_distinct_metric_families() {
        let metrics = CaseMetrics::new("hinschg_test").unwrap();
        metrics.set_status_count("tenant-a", "offen", 3);
        metrics.set_escalated("tenant-a", 1);
        metrics.inc_report_submitted("tenant-a", "web");
    }
}
