//! Tenant identity and per-tenant configuration (C14).

use chrono::{DateTime, Utc};
use hinschg_core::TenantId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrganizationSize {
    Small,
    Medium,
    Large,
}

/// Per-tenant overrides of the statutory deadline lengths, within the legal
/// bounds in `TenantConfig::validate`. A single typed struct rather than a
/// SQL column plus a JSON blob - the two divergent representations in
/// `original_source` are collapsed into this one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantConfig {
    /// Acknowledgement deadline override in days. Legal bound: [1, 7].
    pub eingangsbestaetigung_tage: Option<i64>,
    /// Feedback deadline override in days. Legal bound: [30, 90].
    pub rueckmeldung_tage: Option<i64>,
    /// Retention period override in years. Legal bound: [3, 10].
    pub aufbewahrung_jahre: Option<i64>,
    /// Feature flags the tenant has opted into (e.g. "anonymous_messaging").
    pub feature_flags: Vec<String>,
}

impl Default for TenantConfig {
    fn default() -> Self {
        Self {
            eingangsbestaetigung_tage: None,
            rueckmeldung_tage: None,
            aufbewahrung_jahre: None,
            feature_flags: Vec::new(),
        }
    }
}

impl TenantConfig {
    pub const ACK_DAYS_MIN: i64 = 1;
    pub const ACK_DAYS_MAX: i64 = 7;
    pub const FEEDBACK_DAYS_MIN: i64 = 30;
    pub const FEEDBACK_DAYS_MAX: i64 = 90;
    pub const RETENTION_YEARS_MIN: i64 = 3;
    pub const RETENTION_YEARS_MAX: i64 = 10;

    /// Validates every set override against its statutory bound. Returns a
    /// `Validation` error naming the offending field on the first failure.
    pub fn validate(&self) -> hinschg_core::Result<()> {
        use hinschg_core::Error;

        if let Some(days) = self.eingangsbestaetigung_tage {
            if !(Self::ACK_DAYS_MIN..=Self::ACK_DAYS_MAX).contains(&days) {
                return Err(Error::validation(format!(
                    "eingangsbestaetigung_tage must be between {} and {} days",
                    Self::ACK_DAYS_MIN,
                    Self::ACK_DAYS_MAX
                )));
            }
        }
        if let Some(days) = self.rueckmeldung_tage {
            if !(Self::FEEDBACK_DAYS_MIN..=Self::FEEDBACK_DAYS_MAX).contains(&days) {
                return Err(Error::validation(format!(
                    "rueckmeldung_tage must be between {} and {} days",
                    Self::FEEDBACK_DAYS_MIN,
                    Self::FEEDBACK_DAYS_MAX
                )));
            }
        }
        if let Some(years) = self.aufbewahrung_jahre {
            if !(Self::RETENTION_YEARS_MIN..=Self::RETENTION_YEARS_MAX).contains(&years) {
                return Err(Error::validation(format!(
                    "aufbewahrung_jahre must be between {} and {} years",
                    Self::RETENTION_YEARS_MIN,
                    Self::RETENTION_YEARS_MAX
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: TenantId,
    pub slug: String,
    pub display_name: String,
    pub organization_size: OrganizationSize,
    pub contact_email: String,
    pub ombudsperson_email: Option<String>,
    pub config: TenantConfig,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tenant {
    pub fn new(
        slug: impl Into<String>,
        display_name: impl Into<String>,
        organization_size: OrganizationSize,
        contact_email: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: TenantId(Uuid::new_v4()),
            slug: slug.into(),
            display_name: display_name.into(),
            organization_size,
            contact_email: contact_email.into(),
            ombudsperson_email: None,
            config: TenantConfig::default(),
            created_at: now,
            updated_at: now,
        }
    }
}
