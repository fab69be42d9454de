//! Statutory deadline records and the traffic-light classifier (C5).
//!
//! The arithmetic here is pure and side-effect-free by design: persistence,
//! notification dispatch, and escalation bookkeeping live in
//! `crate::deadline::scheduler`, not here.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::tenant::TenantConfig;

pub const ACK_DAYS_DEFAULT: i64 = 7;
pub const FEEDBACK_DAYS_DEFAULT: i64 = 90;
pub const RETENTION_YEARS_DEFAULT: i64 = 3;
pub const YELLOW_WINDOW_DAYS: i64 = 14;
pub const REMINDER_WINDOW_DAYS: i64 = 2;
pub const DELETION_GRACE_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DeadlineType {
    Ack7d,
    Feedback3m,
    Archival3y,
    Deletion30d,
}

/// Per-case traffic light (spec.md §4.3's 14-day yellow window, strict `>`
/// for red). See [`CompliancePreWarning`] for the stricter threshold pair
/// used only by the aggregate compliance report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeadlineStatus {
    Done,
    Red,
    Yellow,
    Green,
}

/// One statutory timer on a case. Invariant: a case has at most one open
/// (`done_at.is_none()`) deadline of each `DeadlineType` - enforced by the
/// repository's unique partial index, not here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deadline {
    pub id: Uuid,
    pub case_id: Uuid,
    pub deadline_type: DeadlineType,
    pub due_at: DateTime<Utc>,
    pub done_at: Option<DateTime<Utc>>,
    pub reminder_sent: bool,
    pub escalated: bool,
    pub created_at: DateTime<Utc>,
}

impl Deadline {
    pub fn new(case_id: Uuid, deadline_type: DeadlineType, due_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            case_id,
            deadline_type,
            due_at,
            done_at: None,
            reminder_sent: false,
            escalated: false,
            created_at: Utc::now(),
        }
    }

    pub fn is_done(&self) -> bool {
        self.done_at.is_some()
    }

    pub fn mark_done(&mut self, now: DateTime<Utc>) {
        self.done_at = Some(now);
    }

    pub fn classify(&self, now: DateTime<Utc>) -> DeadlineStatus {
        classify(self.due_at, self.is_done(), now)
    }
}

/// `ack_deadline = eingegangen_am + 7d`, overridable per tenant within [1,7]
/// days (bounds enforced by `TenantConfig::validate`, not re-checked here).
pub fn ack_deadline(eingegangen_am: DateTime<Utc>, config: &TenantConfig) -> DateTime<Utc> {
    eingegangen_am + Duration::days(config.eingangsbestaetigung_tage.unwrap_or(ACK_DAYS_DEFAULT))
}

/// `feedback_deadline = eingegangen_am + 90d`, overridable within [30,90] days.
pub fn feedback_deadline(eingegangen_am: DateTime<Utc>, config: &TenantConfig) -> DateTime<Utc> {
    eingegangen_am + Duration::days(config.rueckmeldung_tage.unwrap_or(FEEDBACK_DAYS_DEFAULT))
}

/// Archival deadline fires `retention_years * 365` days after closure.
pub fn archival_deadline(closed_at: DateTime<Utc>, config: &TenantConfig) -> DateTime<Utc> {
    let years = config.aufbewahrung_jahre.unwrap_or(RETENTION_YEARS_DEFAULT);
    closed_at + Duration::days(years * 365)
}

/// Deletion deadline: 30 days after the archival period's own end.
pub fn deletion_deadline(archival_due_at: DateTime<Utc>) -> DateTime<Utc> {
    archival_due_at + Duration::days(DELETION_GRACE_DAYS)
}

/// `done` if completed; `red` if `now > due_at`; `yellow` if due within 14
/// days; `green` otherwise. At `now == due_at` the result is `yellow`, not
/// `red` - the red comparison is strict `>`.
pub fn classify(due_at: DateTime<Utc>, done: bool, now: DateTime<Utc>) -> DeadlineStatus {
    if done {
        return DeadlineStatus::Done;
    }
    if now > due_at {
        return DeadlineStatus::Red;
    }
    if due_at - now <= Duration::days(YELLOW_WINDOW_DAYS) {
        return DeadlineStatus::Yellow;
    }
    DeadlineStatus::Green
}

/// The next active deadline for a case: ack until acknowledged, then
/// feedback, then `None` (done).
pub fn next_active(acknowledged: bool, resolved: bool) -> Option<DeadlineType> {
    if !acknowledged {
        Some(DeadlineType::Ack7d)
    } else if !resolved {
        Some(DeadlineType::Feedback3m)
    } else {
        None
    }
}

/// Stricter 3-day/1-day warnstufe pair used only by the compliance report
/// (C12), grounded in `hinschg_compliance.py`. Kept distinct from
/// [`DeadlineStatus`] so the two never get conflated: the per-case traffic
/// light handlers see is always the 14-day one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompliancePreWarning {
    Critical,
    Warning,
    Ok,
}

pub fn classify_pre_warning(due_at: DateTime<Utc>, done: bool, now: DateTime<Utc>) -> CompliancePreWarning {
    if done {
        return CompliancePreWarning::Ok;
    }
    let remaining = due_at - now;
    if remaining <= Duration::days(1) {
        CompliancePreWarning::Critical
    } else if remaining <= Duration::days(3) {
        CompliancePreWarning::Warning
    } else {
        CompliancePreWarning::Ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ack_and_feedback_deadlines_use_statutory_defaults() {
        let config = TenantConfig::default();
        let base = Utc::now();
        assert_eq!(ack_deadline(base, &config), base + Duration::days(7));
        assert_eq!(feedback_deadline(base, &config), base + Duration::days(90));
    }

    #[test]
    fn tenant_override_shifts_deadline() {
        let config = TenantConfig {
            eingangsbestaetigung_tage: Some(3),
            ..TenantConfig::default()
        };
        let base = Utc::now();
        assert_eq!(ack_deadline(base, &config), base + Duration::days(3));
    }

    #[test]
    fn classify_is_green_well_before_due() {
        let now = Utc::now();
        let due = now + Duration::days(20);
        assert_eq!(classify(due, false, now), DeadlineStatus::Green);
    }

    #[test]
    fn classify_is_yellow_within_fourteen_days() {
        let now = Utc::now();
        let due = now + Duration::days(14);
        assert_eq!(classify(due, false, now), DeadlineStatus::Yellow);
    }

    #[test]
    fn classify_at_exact_due_instant_is_yellow_not_red() {
        let now = Utc::now();
        assert_eq!(classify(now, false, now), DeadlineStatus::Yellow);
    }

    #[test]
    fn classify_is_red_strictly_after_due() {
        let now = Utc::now();
        let due = now - Duration::seconds(1);
        assert_eq!(classify(due, false, now), DeadlineStatus::Red);
    }

    #[test]
    fn classify_done_overrides_everything() {
        let now = Utc::now();
        let due = now - Duration::days(100);
        assert_eq!(classify(due, true, now), DeadlineStatus::Done);
    }

    #[test]
    fn next_active_progresses_ack_then_feedback_then_done() {
        assert_eq!(next_active(false, false), Some(DeadlineType::Ack7d));
        assert_eq!(next_active(true, false), Some(DeadlineType::Feedback3m));
        assert_eq!(next_active(true, true), None);
    }
}
