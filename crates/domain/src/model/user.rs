//! Tenant-scoped users and roles (C15's subject side).
//!
//! Password hashing, MFA verification, and session/token issuance are an
//! upstream identity provider's job (spec Non-goals); `password_hash` here
//! is an opaque string this crate stores and compares against nothing.

use chrono::{DateTime, Utc};
use hinschg_core::{TenantId, UserId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Fixed role set. Capabilities per role are defined in `access.rs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Ombudsperson,
    Fallbearbeiter,
    Melder,
    Auditor,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Ombudsperson => "ombudsperson",
            Role::Fallbearbeiter => "fallbearbeiter",
            Role::Melder => "melder",
            Role::Auditor => "auditor",
        }
    }
}

/// Lockout kicks in after this many consecutive failed logins.
pub const FAILED_LOGIN_LOCKOUT_THRESHOLD: u32 = 5;
/// Lockout duration once the threshold is hit.
pub const LOCKOUT_DURATION_MINUTES: i64 = 15;

/// A tenant's user. Email uniqueness is per-tenant, never global - the
/// unique index is `(tenant_id, email)`, not `email` alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub tenant_id: TenantId,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub mfa_enabled: bool,
    pub failed_login_count: u32,
    pub locked_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(tenant_id: TenantId, email: impl Into<String>, password_hash: impl Into<String>, role: Role) -> Self {
        let now = Utc::now();
        Self {
            id: UserId(Uuid::new_v4()),
            tenant_id,
            email: email.into(),
            password_hash: password_hash.into(),
            role,
            mfa_enabled: false,
            failed_login_count: 0,
            locked_until: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        self.locked_until.map(|until| until > now).unwrap_or(false)
    }

    /// Records a failed login attempt. Past the threshold, locks the
    /// account for `LOCKOUT_DURATION_MINUTES` and resets the counter.
    pub fn record_failed_login(&mut self, now: DateTime<Utc>) {
        self.failed_login_count += 1;
        if self.failed_login_count >= FAILED_LOGIN_LOCKOUT_THRESHOLD {
            self.locked_until = Some(now + chrono::Duration::minutes(LOCKOUT_DURATION_MINUTES));
            self.failed_login_count = 0;
        }
        self.updated_at = now;
    }

    pub fn record_successful_login(&mut self, now: DateTime<Utc>) {
        self.failed_login_count = 0;
        self.locked_until = None;
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tenant() -> TenantId {
        TenantId(Uuid::new_v4())
    }

    #[test]
    fn new_user_starts_unlocked_with_zero_failures() {
        let user = User::new(tenant(), "a@example.com", "opaque-hash", Role::Melder);
        assert_eq!(user.failed_login_count, 0);
        assert!(!user.is_locked(Utc::now()));
    }

    #[test]
    fn threshold_failures_lock_the_account_and_reset_the_counter() {
        let mut user = User::new(tenant(), "a@example.com", "opaque-hash", Role::Melder);
        let now = Utc::now();
        for _ in 0..FAILED_LOGIN_LOCKOUT_THRESHOLD {
            user.record_failed_login(now);
        }
        assert_eq!(user.failed_login_count, 0);
        assert!(user.is_locked(now));
        assert!(!user.is_locked(now + chrono::Duration::minutes(LOCKOUT_DURATION_MINUTES + 1)));
    }

    #[test]
    fn successful_login_clears_lockout_state() {
        let mut user = User::new(tenant(), "a@example.com", "opaque-hash", Role::Melder);
        let now = Utc::now();
        user.record_failed_login(now);
        user.record_successful_login(now);
        assert_eq!(user.failed_login_count, 0);
        assert!(user.locked_until.is_none());
    }
}
