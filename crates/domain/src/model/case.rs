//! The processing vessel around a report: status, history, and the
//! statutory operations that are distinct from status (C6).

use chrono::{DateTime, Utc};
use hinschg_core::{Error, Result, TenantId, UserId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

/// 9-state transition table (spec.md §4.2). Initial: `Offen`. Terminal:
/// `Abgeschlossen` (no outgoing transitions).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    Offen,
    Zugewiesen,
    InErmittlung,
    Stellungnahme,
    Massnahmen,
    Umsetzung,
    Abgeschlossen,
    Eingestellt,
    Eskaliert,
}

impl CaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaseStatus::Offen => "offen",
            CaseStatus::Zugewiesen => "zugewiesen",
            CaseStatus::InErmittlung => "in_ermittlung",
            CaseStatus::Stellungnahme => "stellungnahme",
            CaseStatus::Massnahmen => "massnahmen",
            CaseStatus::Umsetzung => "umsetzung",
            CaseStatus::Abgeschlossen => "abgeschlossen",
            CaseStatus::Eingestellt => "eingestellt",
            CaseStatus::Eskaliert => "eskaliert",
        }
    }

    /// Authoritative transition table. Transitions not listed here are
    /// rejected with `BadTransition` by `Case::transition`.
    pub fn can_transition_to(&self, next: CaseStatus) -> bool {
        use CaseStatus::*;
        matches!(
            (*self, next),
            (Offen, Zugewiesen)
                | (Offen, Eingestellt)
                | (Zugewiesen, InErmittlung)
                | (Zugewiesen, Eingestellt)
                | (Zugewiesen, Offen)
                | (InErmittlung, Stellungnahme)
                | (InErmittlung, Massnahmen)
                | (InErmittlung, Abgeschlossen)
                | (InErmittlung, Eingestellt)
                | (InErmittlung, Eskaliert)
                | (Stellungnahme, InErmittlung)
                | (Stellungnahme, Massnahmen)
                | (Stellungnahme, Abgeschlossen)
                | (Stellungnahme, Eskaliert)
                | (Massnahmen, Umsetzung)
                | (Massnahmen, Abgeschlossen)
                | (Massnahmen, Eskaliert)
                | (Umsetzung, Abgeschlossen)
                | (Umsetzung, Massnahmen)
                | (Eingestellt, Offen)
                | (Eskaliert, InErmittlung)
                | (Eskaliert, Abgeschlossen)
        )
    }
}

impl fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Niedrig,
    Mittel,
    Hoch,
    Kritisch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    Pursue,
    Close,
    Escalate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CaseEventType {
    StatusChange,
    Acknowledged,
    Resolved,
    ForwardedToOmbudsperson,
    RecommendationRecorded,
    NoteAdded,
    AttachmentAdded,
}

/// Append-only history entry tied to a case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseEvent {
    pub id: Uuid,
    pub case_id: Uuid,
    pub tenant_id: TenantId,
    pub event_type: CaseEventType,
    pub old_status: Option<CaseStatus>,
    pub new_status: Option<CaseStatus>,
    pub actor_id: Option<UserId>,
    pub description: String,
    pub metadata: Value,
    pub internal: bool,
    pub visible_to_reporter: bool,
    pub created_at: DateTime<Utc>,
}

impl CaseEvent {
    pub fn status_change(
        case_id: Uuid,
        tenant_id: TenantId,
        actor_id: Option<UserId>,
        old: CaseStatus,
        new: CaseStatus,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            case_id,
            tenant_id,
            event_type: CaseEventType::StatusChange,
            old_status: Some(old),
            new_status: Some(new),
            actor_id,
            description: format!("status changed from {old} to {new}"),
            metadata: Value::Null,
            internal: true,
            visible_to_reporter: false,
            created_at: Utc::now(),
        }
    }

    pub fn simple(
        case_id: Uuid,
        tenant_id: TenantId,
        actor_id: Option<UserId>,
        event_type: CaseEventType,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            case_id,
            tenant_id,
            event_type,
            old_status: None,
            new_status: None,
            actor_id,
            description: description.into(),
            metadata: Value::Null,
            internal: true,
            visible_to_reporter: false,
            created_at: Utc::now(),
        }
    }

    pub fn visible_to_reporter(mut self, visible: bool) -> Self {
        self.visible_to_reporter = visible;
        self
    }
}

/// Formats `<SLUG_UPPER[:10]>-YYYY-NNNN`. `NNNN` has no running sequence
/// behind it (no per-tenant counter table exists) - it is drawn from a CSPRNG,
/// which keeps case-number minting a pure, lock-free operation at the cost of
/// the field being a display label rather than a true ordinal.
pub fn generate_case_number(slug: &str, now: DateTime<Utc>) -> String {
    use rand::RngCore;
    let slug_upper: String = slug.chars().filter(|c| c.is_ascii_alphanumeric()).collect::<String>().to_uppercase();
    let truncated = &slug_upper[..slug_upper.len().min(10)];
    let suffix = rand::thread_rng().next_u32() % 10_000;
    format!("{}-{}-{:04}", truncated, now.format("%Y"), suffix)
}

/// A processing vessel around a report; 1:1 with `Report` within a tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Case {
    pub id: Uuid,
    pub tenant_id: TenantId,
    pub report_id: Uuid,
    pub case_number: String,
    pub status: CaseStatus,
    pub previous_status: Option<CaseStatus>,
    pub assignee: Option<UserId>,
    pub severity: Severity,
    pub eskaliert: bool,
    pub eskaliert_am: Option<DateTime<Utc>>,
    pub forwarded_to_ombudsperson_at: Option<DateTime<Utc>>,
    pub forwarded_to_ombudsperson_by: Option<UserId>,
    pub ombudsperson_recommendation: Option<Recommendation>,
    pub ombudsperson_reviewed_at: Option<DateTime<Utc>>,
    pub ombudsperson_reviewed_by: Option<UserId>,
    pub ombudsperson_notes_encrypted: Option<String>,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Case {
    pub fn new(tenant_id: TenantId, report_id: Uuid, case_number: impl Into<String>, severity: Severity) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            report_id,
            case_number: case_number.into(),
            status: CaseStatus::Offen,
            previous_status: None,
            assignee: None,
            severity,
            eskaliert: false,
            eskaliert_am: None,
            forwarded_to_ombudsperson_at: None,
            forwarded_to_ombudsperson_by: None,
            ombudsperson_recommendation: None,
            ombudsperson_reviewed_at: None,
            ombudsperson_reviewed_by: None,
            ombudsperson_notes_encrypted: None,
            acknowledged_at: None,
            resolved_at: None,
            closed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies every derived effect from spec.md §4.2 (closure timestamp,
    /// escalation flags). History/audit emission and deadline persistence
    /// are the caller's responsibility (`crate::case::service`), which holds
    /// the repository handles this plain model does not.
    pub fn transition(&mut self, next: CaseStatus, now: DateTime<Utc>) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(Error::bad_transition(self.status, next));
        }
        if next == CaseStatus::Zugewiesen && self.assignee.is_none() {
            return Err(Error::validation("zugewiesen requires a non-null assignee"));
        }

        self.previous_status = Some(self.status);
        self.status = next;
        self.updated_at = now;

        if next == CaseStatus::Abgeschlossen {
            self.closed_at = Some(now);
        }
        if next == CaseStatus::Eskaliert {
            self.eskaliert = true;
            self.eskaliert_am = Some(now);
        }
        Ok(())
    }

    /// At-most-once; completes the `ack_7d` deadline.
    pub fn acknowledge(&mut self, now: DateTime<Utc>) -> Result<()> {
        if self.acknowledged_at.is_some() {
            return Err(Error::conflict("case has already been acknowledged"));
        }
        self.acknowledged_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// At-most-once; completes the `feedback_3m` deadline.
    pub fn resolve(&mut self, now: DateTime<Utc>) -> Result<()> {
        if self.resolved_at.is_some() {
            return Err(Error::conflict("case has already been resolved"));
        }
        self.resolved_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// At-most-once; does not change status.
    pub fn forward_to_ombudsperson(&mut self, by: UserId, now: DateTime<Utc>) -> Result<()> {
        if self.forwarded_to_ombudsperson_at.is_some() {
            return Err(Error::conflict("case has already been forwarded to an ombudsperson"));
        }
        self.forwarded_to_ombudsperson_at = Some(now);
        self.forwarded_to_ombudsperson_by = Some(by);
        self.updated_at = now;
        Ok(())
    }

    /// Records the recommendation; requires a prior forward and rejects a
    /// repeat with `Conflict`. Escalation on `Recommendation::Escalate` is
    /// attempted separately by the caller via `transition` - it must not
    /// fail this call if the current status forbids it.
    pub fn record_recommendation(
        &mut self,
        by: UserId,
        recommendation: Recommendation,
        notes_encrypted: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if self.forwarded_to_ombudsperson_at.is_none() {
            return Err(Error::validation("case has not been forwarded to an ombudsperson"));
        }
        if let Some(existing) = self.ombudsperson_recommendation {
            return Err(Error::conflict(format!("recommendation already recorded: {existing:?}")));
        }
        self.ombudsperson_recommendation = Some(recommendation);
        self.ombudsperson_reviewed_at = Some(now);
        self.ombudsperson_reviewed_by = Some(by);
        self.ombudsperson_notes_encrypted = notes_encrypted;
        self.updated_at = now;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_case() -> Case {
        Case::new(TenantId(Uuid::new_v4()), Uuid::new_v4(), "HW-2026-0001", Severity::Mittel)
    }

    #[test]
    fn full_lifecycle_to_closure_sets_closed_at() {
        let mut case = new_case();
        case.assignee = Some(UserId(Uuid::new_v4()));
        let now = Utc::now();
        case.transition(CaseStatus::Zugewiesen, now).unwrap();
        case.transition(CaseStatus::InErmittlung, now).unwrap();
        case.transition(CaseStatus::Abgeschlossen, now).unwrap();
        assert_eq!(case.status, CaseStatus::Abgeschlossen);
        assert!(case.closed_at.is_some());
        assert_eq!(case.previous_status, Some(CaseStatus::InErmittlung));
    }

    #[test]
    fn direct_offen_to_massnahmen_is_rejected() {
        let mut case = new_case();
        let err = case.transition(CaseStatus::Massnahmen, Utc::now()).unwrap_err();
        assert_eq!(err.code, hinschg_core::ErrorCode::BadTransition);
    }

    #[test]
    fn zugewiesen_without_assignee_is_rejected() {
        let mut case = new_case();
        let err = case.transition(CaseStatus::Zugewiesen, Utc::now()).unwrap_err();
        assert_eq!(err.code, hinschg_core::ErrorCode::ValidationFailed);
    }

    #[test]
    fn abgeschlossen_has_no_outgoing_transitions() {
        let mut case = new_case();
        case.assignee = Some(UserId(Uuid::new_v4()));
        let now = Utc::now();
        case.transition(CaseStatus::Zugewiesen, now).unwrap();
        case.transition(CaseStatus::InErmittlung, now).unwrap();
        case.transition(CaseStatus::Abgeschlossen, now).unwrap();
        let err = case.transition(CaseStatus::Offen, now).unwrap_err();
        assert_eq!(err.code, hinschg_core::ErrorCode::BadTransition);
    }

    #[test]
    fn second_acknowledge_is_conflict() {
        let mut case = new_case();
        case.acknowledge(Utc::now()).unwrap();
        let err = case.acknowledge(Utc::now()).unwrap_err();
        assert_eq!(err.code, hinschg_core::ErrorCode::ResourceAlreadyExists);
    }

    #[test]
    fn recommendation_requires_prior_forward() {
        let mut case = new_case();
        let err = case
            .record_recommendation(UserId(Uuid::new_v4()), Recommendation::Pursue, None, Utc::now())
            .unwrap_err();
        assert_eq!(err.code, hinschg_core::ErrorCode::ValidationFailed);
    }

    #[test]
    fn second_recommendation_is_conflict_and_preserves_first() {
        let mut case = new_case();
        let reviewer = UserId(Uuid::new_v4());
        case.forward_to_ombudsperson(reviewer, Utc::now()).unwrap();
        case.record_recommendation(reviewer, Recommendation::Pursue, None, Utc::now()).unwrap();
        let err = case
            .record_recommendation(reviewer, Recommendation::Close, None, Utc::now())
            .unwrap_err();
        assert_eq!(err.code, hinschg_core::ErrorCode::ResourceAlreadyExists);
        assert_eq!(case.ombudsperson_recommendation, Some(Recommendation::Pursue));
    }

    #[test]
    fn eskaliert_sets_flag_and_timestamp() {
        let mut case = new_case();
        case.assignee = Some(UserId(Uuid::new_v4()));
        let now = Utc::now();
        case.transition(CaseStatus::Zugewiesen, now).unwrap();
        case.transition(CaseStatus::InErmittlung, now).unwrap();
        case.transition(CaseStatus::Eskaliert, now).unwrap();
        assert!(case.eskaliert);
        assert_eq!(case.eskaliert_am, Some(now));
    }
}
