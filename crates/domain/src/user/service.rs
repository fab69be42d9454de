//! User provisioning and login-state bookkeeping (C15's subject side).
//!
//! Credential verification itself happens upstream (spec Non-goals); this
//! service stores the resulting `password_hash` opaquely and tracks the
//! failed-login counter and lockout window the upstream gateway consults
//! before it even attempts a credential check.

use chrono::Utc;
use hinschg_core::audit::{AuditEvent, EventSeverity, EventType};
use hinschg_core::{AuditLogger, Error, ErrorCode, Result, TenantId, UserId};
use std::sync::Arc;

use crate::model::user::{Role, User};
use crate::user::repository::UserRepository;

pub struct UserService {
    repository: Arc<dyn UserRepository>,
    audit: Arc<AuditLogger>,
}

impl UserService {
    pub fn new(repository: Arc<dyn UserRepository>, audit: Arc<AuditLogger>) -> Self {
        Self { repository, audit }
    }

    /// Provisions a user. `password_hash` is produced by the caller's
    /// identity layer; this service never sees a plaintext password.
    pub async fn create(
        &self,
        tenant_id: TenantId,
        email: impl Into<String>,
        password_hash: impl Into<String>,
        role: Role,
        actor_id: UserId,
    ) -> Result<User> {
        let email = email.into();
        if self.repository.get_by_email(tenant_id, &email).await?.is_some() {
            return Err(Error::conflict("email already in use for this tenant"));
        }

        let user = User::new(tenant_id, email, password_hash, role);
        let created = self.repository.create(&user).await?;

        self.audit
            .log_event(
                AuditEvent::builder(EventType::ResourceCreated, "user created")
                    .actor_id(actor_id.0.to_string())
                    .tenant_id(tenant_id.0.to_string())
                    .resource("user", created.id.0.to_string())
                    .new_values(serde_json::json!({ "email": created.email, "role": created.role.as_str() }))
                    .build(),
            )
            .await?;

        Ok(created)
    }

    pub async fn get(&self, tenant_id: TenantId, id: UserId) -> Result<User> {
        self.repository
            .get_by_id(tenant_id, id)
            .await?
            .ok_or_else(|| Error::not_found("user not found"))
    }

    pub async fn get_by_email(&self, tenant_id: TenantId, email: &str) -> Result<Option<User>> {
        self.repository.get_by_email(tenant_id, email).await
    }

    /// Reaffirms the lockout window before an upstream credential check is
    /// even attempted, so a locked account never reaches password
    /// comparison. Surfaces as the 423 status in the HTTP surface.
    pub fn ensure_not_locked(&self, user: &User) -> Result<()> {
        if user.is_locked(Utc::now()) {
            return Err(Error::new(ErrorCode::ResourceLocked, "account is locked"));
        }
        Ok(())
    }

    /// Called by the upstream identity layer after a failed credential
    /// check to advance the lockout counter.
    pub async fn record_failed_login(&self, mut user: User, actor_id: UserId) -> Result<User> {
        let now = Utc::now();
        let was_locked_by_this_attempt =
            user.failed_login_count + 1 >= crate::model::user::FAILED_LOGIN_LOCKOUT_THRESHOLD;
        user.record_failed_login(now);
        self.repository.update(&user).await?;

        if was_locked_by_this_attempt {
            self.audit
                .log_event(
                    AuditEvent::builder(EventType::SecurityPolicyViolation, "account locked after repeated failed logins")
                        .actor_id(actor_id.0.to_string())
                        .tenant_id(user.tenant_id.0.to_string())
                        .resource("user", user.id.0.to_string())
                        .severity(EventSeverity::Warning)
                        .build(),
                )
                .await?;
        }

        Ok(user)
    }

    pub async fn record_successful_login(&self, mut user: User) -> Result<User> {
        user.record_successful_login(Utc::now());
        self.repository.update(&user).await?;
        Ok(user)
    }

    pub async fn change_role(&self, tenant_id: TenantId, id: UserId, role: Role, actor_id: UserId) -> Result<User> {
        let mut user = self.get(tenant_id, id).await?;
        let previous_role = user.role;
        user.role = role;
        user.updated_at = Utc::now();
        self.repository.update(&user).await?;

        self.audit
            .log_event(
                AuditEvent::builder(EventType::ResourcePermissionChanged, "user role changed")
                    .actor_id(actor_id.0.to_string())
                    .tenant_id(tenant_id.0.to_string())
                    .resource("user", id.0.to_string())
                    .previous_values(serde_json::json!({ "role": previous_role.as_str() }))
                    .new_values(serde_json::json!({ "role": role.as_str() }))
                    .build(),
            )
            .await?;

        Ok(user)
    }

    pub async fn delete(&self, tenant_id: TenantId, id: UserId, actor_id: UserId) -> Result<()> {
        self.repository.delete(tenant_id, id).await?;

        self.audit
            .log_event(
                AuditEvent::builder(EventType::ResourceDeleted, "user deleted")
                    .actor_id(actor_id.0.to_string())
                    .tenant_id(tenant_id.0.to_string())
                    .resource("user", id.0.to_string())
                    .build(),
            )
            .await?;

        Ok(())
    }

    pub async fn list_by_tenant(&self, tenant_id: TenantId) -> Result<Vec<User>> {
        self.repository.list_by_tenant(tenant_id).await
    }
}
