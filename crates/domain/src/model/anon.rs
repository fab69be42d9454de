//! The parallel anonymous-channel entity, identified only by receipt code
//! (C8). No field here ever links back to a user or IP address.

use chrono::{DateTime, Utc};
use hinschg_core::TenantId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::report::{ReportCategory, ReportStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MessageDirection {
    ReporterToHandler,
    HandlerToReporter,
}

/// A report submitted without any identifying information. Contents are
/// still envelope-encrypted like a `Report`'s, keyed by `id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnonSubmission {
    pub id: Uuid,
    pub tenant_id: TenantId,
    pub receipt_code: String,
    pub case_number: String,
    pub titel_encrypted: String,
    pub beschreibung_encrypted: String,
    pub kategorie: ReportCategory,
    pub status: ReportStatus,
    pub eingegangen_am: DateTime<Utc>,
    pub eingangsbestaetigung_frist: DateTime<Utc>,
    pub rueckmeldung_frist: DateTime<Utc>,
    pub report_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AnonSubmission {
    pub fn new(
        tenant_id: TenantId,
        receipt_code: impl Into<String>,
        case_number: impl Into<String>,
        titel_encrypted: impl Into<String>,
        beschreibung_encrypted: impl Into<String>,
        kategorie: ReportCategory,
        eingegangen_am: DateTime<Utc>,
        eingangsbestaetigung_frist: DateTime<Utc>,
        rueckmeldung_frist: DateTime<Utc>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            receipt_code: receipt_code.into(),
            case_number: case_number.into(),
            titel_encrypted: titel_encrypted.into(),
            beschreibung_encrypted: beschreibung_encrypted.into(),
            kategorie,
            status: ReportStatus::Eingegangen,
            eingegangen_am,
            eingangsbestaetigung_frist,
            rueckmeldung_frist,
            report_id: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A two-way message tied to a submission, never to a person.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnonMessage {
    pub id: Uuid,
    pub tenant_id: TenantId,
    pub submission_id: Uuid,
    pub direction: MessageDirection,
    pub body_encrypted: String,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl AnonMessage {
    pub fn new(
        tenant_id: TenantId,
        submission_id: Uuid,
        direction: MessageDirection,
        body_encrypted: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            submission_id,
            direction,
            body_encrypted: body_encrypted.into(),
            read_at: None,
            created_at: Utc::now(),
        }
    }

    pub fn mark_read(&mut self, now: DateTime<Utc>) {
        self.read_at = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hinschg_core::security::ReceiptCode;

    #[test]
    fn new_submission_starts_eingegangen() {
        let now = Utc::now();
        let submission = AnonSubmission::new(
            TenantId(Uuid::new_v4()),
            ReceiptCode::generate(),
            "HW-2026-0001",
            "enc(titel)",
            "enc(beschreibung)",
            ReportCategory::Korruption,
            now,
            now + chrono::Duration::days(7),
            now + chrono::Duration::days(90),
        );
        assert_eq!(submission.status, ReportStatus::Eingegangen);
        assert!(submission.report_id.is_none());
    }

    #[test]
    fn message_starts_unread() {
        let msg = AnonMessage::new(
            TenantId(Uuid::new_v4()),
            Uuid::new_v4(),
            MessageDirection::ReporterToHandler,
            "enc(body)",
        );
        assert!(msg.read_at.is_none());
    }
}
