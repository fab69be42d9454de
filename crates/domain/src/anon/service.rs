//! Identity-free intake and lookup (C8). Every operation here accepts
//! nothing that could re-identify a reporter: no user id, no raw IP, no
//! session. Callers authenticate only by possessing the receipt code.

use chrono::Utc;
use hinschg_core::audit::{AuditEvent, EventType};
use hinschg_core::security::{EncryptionService, ReceiptCode};
use hinschg_core::session::SessionManager;
use hinschg_core::{AuditLogger, Error, Result, TenantId};
use std::sync::Arc;
use std::time::Duration as StdDuration;
use uuid::Uuid;

use crate::model::anon::{AnonMessage, AnonSubmission, MessageDirection};
use crate::model::case::generate_case_number;
use crate::model::deadline::{ack_deadline, feedback_deadline};
use crate::model::report::ReportCategory;
use crate::model::tenant::TenantConfig;

use super::repository::{AnonMessageRepository, AnonSubmissionRepository};

const MIN_DESCRIPTION_LEN: usize = 20;
const MAX_MESSAGE_LEN: usize = 4000;

/// 5 requests / 60s, per spec §4.4.
const RATE_LIMIT_COUNT: u32 = 5;
const RATE_LIMIT_WINDOW_SECONDS: i64 = 60;
/// Applied on every miss (invalid code or no match) so a cache/lookup miss
/// takes the same wall-clock time as a hit - no timing oracle on receipt
/// code guessing.
const MISS_DELAY: StdDuration = StdDuration::from_millis(100);

pub struct AnonIntake<'a> {
    pub titel: &'a str,
    pub beschreibung: &'a str,
    pub kategorie: ReportCategory,
    pub sprache: &'a str,
}

pub struct AnonService {
    submissions: Arc<dyn AnonSubmissionRepository>,
    messages: Arc<dyn AnonMessageRepository>,
    encryption: Arc<EncryptionService>,
    sessions: Arc<SessionManager>,
    audit: Arc<AuditLogger>,
}

impl AnonService {
    pub fn new(
        submissions: Arc<dyn AnonSubmissionRepository>,
        messages: Arc<dyn AnonMessageRepository>,
        encryption: Arc<EncryptionService>,
        sessions: Arc<SessionManager>,
        audit: Arc<AuditLogger>,
    ) -> Self {
        Self {
            submissions,
            messages,
            encryption,
            sessions,
            audit,
        }
    }

    /// Returns the persisted submission together with the unformatted
    /// receipt code - the only moment it exists outside storage.
    pub async fn submit(
        &self,
        tenant_id: TenantId,
        tenant_slug: &str,
        config: &TenantConfig,
        intake: AnonIntake<'_>,
    ) -> Result<(AnonSubmission, String)> {
        if intake.beschreibung.chars().count() < MIN_DESCRIPTION_LEN {
            return Err(Error::validation(format!(
                "description must be at least {MIN_DESCRIPTION_LEN} characters"
            )));
        }

        let now = Utc::now();
        let id = Uuid::new_v4();
        let receipt_code = ReceiptCode::generate();
        let case_number = generate_case_number(tenant_slug, now);

        let titel_encrypted = self.encryption.encrypt_field(intake.titel, &id.to_string(), "anon_titel")?;
        let beschreibung_encrypted = self.encryption.encrypt_field(intake.beschreibung, &id.to_string(), "anon_beschreibung")?;

        let mut submission = AnonSubmission::new(
            tenant_id,
            receipt_code.clone(),
            case_number,
            titel_encrypted,
            beschreibung_encrypted,
            intake.kategorie,
            now,
            ack_deadline(now, config),
            feedback_deadline(now, config),
        );
        submission.id = id;
        let _ = intake.sprache;

        let created = self.submissions.create(&submission).await?;

        self.audit
            .log_event(
                AuditEvent::builder(EventType::ResourceCreated, "anonymous submission received")
                    .tenant_id(tenant_id.0.to_string())
                    .resource("anon_submission", created.id.to_string())
                    .new_values(serde_json::json!({ "case_number": created.case_number, "kategorie": created.kategorie }))
                    .build(),
            )
            .await?;

        Ok((created, receipt_code))
    }

    /// Rate-limited status lookup. `limit_key` must already be derived by
    /// the caller from `X-Tor-Circuit-Id` or a shared anonymous bucket -
    /// never a client IP.
    pub async fn status(&self, limit_key: &str, receipt_code_input: &str) -> Result<AnonSubmission> {
        let bucket = format!("anon_lookup:anon:{limit_key}");
        let decision = self.sessions.check_rate_limit(&bucket, RATE_LIMIT_COUNT, RATE_LIMIT_WINDOW_SECONDS).await?;
        if !decision.allowed {
            return Err(Error::rate_limited("too many status lookups")
                .with_retry_after(decision.retry_after_seconds.unwrap_or(RATE_LIMIT_WINDOW_SECONDS as u64)));
        }

        let normalized = ReceiptCode::normalize(receipt_code_input);
        if !ReceiptCode::is_valid(&normalized) {
            tokio::time::sleep(MISS_DELAY).await;
            return Err(Error::not_found("no submission for this receipt code"));
        }

        match self.submissions.get_by_receipt_code(&normalized).await? {
            Some(submission) => Ok(submission),
            None => {
                tokio::time::sleep(MISS_DELAY).await;
                Err(Error::not_found("no submission for this receipt code"))
            }
        }
    }

    /// Two-way messaging, keyed only by receipt code. `direction` records
    /// which side is speaking; no actor identity is ever attached.
    pub async fn send_message(&self, receipt_code_input: &str, direction: MessageDirection, body: &str) -> Result<AnonMessage> {
        if body.chars().count() > MAX_MESSAGE_LEN {
            return Err(Error::validation(format!("message must not exceed {MAX_MESSAGE_LEN} characters")));
        }

        let normalized = ReceiptCode::normalize(receipt_code_input);
        let mut submission = self
            .submissions
            .get_by_receipt_code(&normalized)
            .await?
            .ok_or_else(|| Error::not_found("no submission for this receipt code"))?;

        let body_encrypted = self.encryption.encrypt_field(body, &submission.id.to_string(), "anon_message")?;
        let message = AnonMessage::new(submission.tenant_id, submission.id, direction, body_encrypted);
        let created = self.messages.create(&message).await?;

        submission.updated_at = Utc::now();
        self.submissions.update(&submission).await?;

        self.audit
            .log_event(
                AuditEvent::builder(EventType::ResourceCreated, "anonymous-channel message received")
                    .tenant_id(submission.tenant_id.0.to_string())
                    .resource("anon_submission", submission.id.to_string())
                    .build(),
            )
            .await?;

        Ok(created)
    }

    pub async fn list_messages(&self, tenant_id: TenantId, submission_id: Uuid) -> Result<Vec<AnonMessage>> {
        self.messages.list_by_submission(tenant_id, submission_id).await
    }
}

#[cfg(test)]
mod tests {
    #[test]
    fn rate_limit_matches_statutory_window() {
        assert_eq!(super::RATE_LIMIT_COUNT, 5);
        assert_eq!(super::RATE_LIMIT_WINDOW_SECONDS, 60);
    }
}
