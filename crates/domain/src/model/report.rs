//! The central report entity (Hinweis) and its enums (C4).

use chrono::{DateTime, Utc};
use hinschg_core::TenantId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Categories bounded by HinSchG §2 (Sachlicher Anwendungsbereich).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ReportCategory {
    Korruption,
    Betrug,
    Geldwaesche,
    Steuerhinterziehung,
    Umweltverstoss,
    Verbraucherschutz,
    Datenschutz,
    Diskriminierung,
    Arbeitssicherheit,
    Produktsicherheit,
    Lebensmittelsicherheit,
    Vergaberecht,
    Wettbewerbsrecht,
    Finanzdienstleistungen,
    Kernsicherheit,
    Tiergesundheit,
    Sonstiges,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ReportPriority {
    Niedrig,
    Mittel,
    Hoch,
}

/// Report-level status - distinct from `CaseStatus`, which governs the
/// case opened around a report once intake is complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Eingegangen,
    Eingangsbestaetigung,
    InPruefung,
    InBearbeitung,
    Rueckmeldung,
    Abgeschlossen,
    Abgelehnt,
    Weitergeleitet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ReportChannel {
    Web,
    Anonym,
    Email,
    Telefon,
    Post,
}

/// The central entity. Personally identifying and free-text fields are
/// stored as envelope-encrypted ciphertext (`base64(salt‖nonce‖ct‖tag)`);
/// callers decrypt through the crypto service with the matching
/// `"<id>:<field>"` context, never inline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub id: Uuid,
    pub tenant_id: TenantId,
    pub reference_code: String,
    pub access_code_hash: String,
    pub titel_encrypted: String,
    pub beschreibung_encrypted: String,
    pub melder_name_encrypted: Option<String>,
    pub melder_email_encrypted: Option<String>,
    pub melder_telefon_encrypted: Option<String>,
    pub betroffene_personen_encrypted: Option<String>,
    pub kategorie: ReportCategory,
    pub prioritaet: ReportPriority,
    pub status: ReportStatus,
    pub kanal: ReportChannel,
    pub sprache: String,
    pub ip_hash: Option<String>,
    pub is_anonymous: bool,
    pub betroffene_abteilung: Option<String>,
    pub zeitraum_von: Option<DateTime<Utc>>,
    pub zeitraum_bis: Option<DateTime<Utc>>,
    pub schaetzung_schaden: Option<String>,
    pub tags: Vec<String>,
    pub eingegangen_am: DateTime<Utc>,
    pub eingangsbestaetigung_frist: DateTime<Utc>,
    pub eingangsbestaetigung_gesendet_am: Option<DateTime<Utc>>,
    pub rueckmeldung_frist: DateTime<Utc>,
    pub rueckmeldung_gesendet_am: Option<DateTime<Utc>>,
    pub aufbewahrung_bis: Option<DateTime<Utc>>,
    pub loeschung_geplant_am: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Report {
    /// `eingangsbestaetigung_frist_ueberfaellig`: true once the ack
    /// deadline has passed without an ack timestamp.
    pub fn eingangsbestaetigung_ueberfaellig(&self, now: DateTime<Utc>) -> bool {
        self.eingangsbestaetigung_gesendet_am.is_none() && now > self.eingangsbestaetigung_frist
    }

    pub fn rueckmeldung_ueberfaellig(&self, now: DateTime<Utc>) -> bool {
        self.rueckmeldung_gesendet_am.is_none() && now > self.rueckmeldung_frist
    }

    pub fn tage_seit_eingang(&self, now: DateTime<Utc>) -> i64 {
        (now - self.eingegangen_am).num_days()
    }
}

/// Generates `HW-<year>-<4 hex upper>`, e.g. `HW-2026-3F9A`.
pub fn generate_reference_code(now: DateTime<Utc>) -> String {
    use rand::RngCore;
    let mut bytes = [0u8; 2];
    rand::thread_rng().fill_bytes(&mut bytes);
    format!("HW-{}-{:02X}{:02X}", now.format("%Y"), bytes[0], bytes[1])
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    #[test]
    fn reference_code_matches_format() {
        let code = generate_reference_code(Utc::now());
        let re = Regex::new(r"^HW-\d{4}-[A-F0-9]{4}$").unwrap();
        assert!(re.is_match(&code), "{code} did not match expected format");
    }
}
