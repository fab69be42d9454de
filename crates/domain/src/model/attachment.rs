//! Encrypted binary attachments referenced by a report.

use chrono::{DateTime, Utc};
use hinschg_core::TenantId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ScanResult {
    Pending,
    Clean,
    Infected,
    ScanFailed,
}

/// Metadata and ciphertext location for one uploaded file. The stored
/// filename is UUID-derived and leaks nothing about the original name or
/// upload order; the original filename is itself encrypted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub id: Uuid,
    pub tenant_id: TenantId,
    pub report_id: Uuid,
    pub stored_filename: String,
    pub original_filename_encrypted: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub plaintext_hash: String,
    pub ciphertext_hash: String,
    pub nonce: String,
    pub aead_tag: String,
    pub scan_result: ScanResult,
    pub scanned_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Attachment {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tenant_id: TenantId,
        report_id: Uuid,
        original_filename_encrypted: impl Into<String>,
        mime_type: impl Into<String>,
        size_bytes: i64,
        plaintext_hash: impl Into<String>,
        ciphertext_hash: impl Into<String>,
        nonce: impl Into<String>,
        aead_tag: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            report_id,
            stored_filename: Uuid::new_v4().to_string(),
            original_filename_encrypted: original_filename_encrypted.into(),
            mime_type: mime_type.into(),
            size_bytes,
            plaintext_hash: plaintext_hash.into(),
            ciphertext_hash: ciphertext_hash.into(),
            nonce: nonce.into(),
            aead_tag: aead_tag.into(),
            scan_result: ScanResult::Pending,
            scanned_at: None,
            created_at: Utc::now(),
        }
    }

    pub fn mark_scanned(&mut self, result: ScanResult, now: DateTime<Utc>) {
        self.scan_result = result;
        self.scanned_at = Some(now);
    }

    pub fn is_safe_to_serve(&self) -> bool {
        matches!(self.scan_result, ScanResult::Clean)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_attachment_starts_pending_and_gets_a_derived_stored_name() {
        let a = Attachment::new(
            TenantId(Uuid::new_v4()),
            Uuid::new_v4(),
            "enc(evidence.pdf)",
            "application/pdf",
            1024,
            "plaintexthash",
            "ciphertexthash",
            "nonce",
            "tag",
        );
        assert_eq!(a.scan_result, ScanResult::Pending);
        assert!(!a.is_safe_to_serve());
        assert_ne!(a.stored_filename, "evidence.pdf");
    }

    #[test]
    fn clean_scan_makes_it_safe_to_serve() {
        let mut a = Attachment::new(
            TenantId(Uuid::new_v4()),
            Uuid::new_v4(),
            "enc(evidence.pdf)",
            "application/pdf",
            1024,
            "p",
            "c",
            "n",
            "t",
        );
        a.mark_scanned(ScanResult::Clean, Utc::now());
        assert!(a.is_safe_to_serve());
    }

    #[test]
    fn infected_scan_is_never_safe_to_serve() {
        let mut a = Attachment::new(
            TenantId(Uuid::new_v4()),
            Uuid::new_v4(),
            "enc(evidence.pdf)",
            "application/pdf",
            1024,
            "p",
            "c",
            "n",
            "t",
        );
        a.mark_scanned(ScanResult::Infected, Utc::now());
        assert!(!a.is_safe_to_serve());
    }
}
