//! Tenant onboarding and configuration (C3, C14).

use hinschg_core::audit::{AuditEvent, EventType};
use hinschg_core::{AuditLogger, Error, Result, TenantId};
use std::sync::Arc;
use uuid::Uuid;

use crate::model::tenant::{OrganizationSize, Tenant, TenantConfig};
use crate::tenant::repository::TenantRepository;

pub struct TenantService {
    repository: Arc<dyn TenantRepository>,
    audit: Arc<AuditLogger>,
}

impl TenantService {
    pub fn new(repository: Arc<dyn TenantRepository>, audit: Arc<AuditLogger>) -> Self {
        Self { repository, audit }
    }

    /// Onboards a new tenant. Slug uniqueness is enforced by the
    /// repository's unique index; a clash surfaces as `Conflict`.
    pub async fn onboard(
        &self,
        slug: impl Into<String>,
        display_name: impl Into<String>,
        organization_size: OrganizationSize,
        contact_email: impl Into<String>,
        actor_id: Uuid,
    ) -> Result<Tenant> {
        let slug = slug.into();
        if self.repository.get_by_slug(&slug).await?.is_some() {
            return Err(Error::conflict("tenant slug already exists"));
        }

        let tenant = Tenant::new(slug, display_name, organization_size, contact_email);
        let created = self.repository.create(&tenant).await?;

        self.audit
            .log_event(
                AuditEvent::builder(EventType::ResourceCreated, "tenant onboarded")
                    .actor_id(actor_id.to_string())
                    .resource("tenant", created.id.0.to_string())
                    .new_values(serde_json::json!({ "slug": created.slug }))
                    .build(),
            )
            .await?;

        Ok(created)
    }

    pub async fn get(&self, id: TenantId) -> Result<Tenant> {
        self.repository
            .get_by_id(id)
            .await?
            .ok_or_else(|| Error::not_found("tenant not found"))
    }

    pub async fn update_config(&self, id: TenantId, config: TenantConfig, actor_id: Uuid) -> Result<()> {
        config.validate()?;
        self.repository.update_config(id, &config).await?;

        self.audit
            .log_event(
                AuditEvent::builder(EventType::ConfigurationChanged, "tenant configuration updated")
                    .actor_id(actor_id.to_string())
                    .resource("tenant", id.0.to_string())
                    .new_values(serde_json::to_value(&config).unwrap_or(serde_json::Value::Null))
                    .build(),
            )
            .await?;

        Ok(())
    }

    /// Administrative-only deletion; cascades to every owned row.
    pub async fn delete(&self, id: TenantId, actor_id: Uuid) -> Result<()> {
        self.repository.delete(id).await?;

        self.audit
            .log_event(
                AuditEvent::builder(EventType::ResourceDeleted, "tenant deleted")
                    .actor_id(actor_id.to_string())
                    .resource("tenant", id.0.to_string())
                    .severity(hinschg_core::audit::EventSeverity::Warning)
                    .build(),
            )
            .await?;

        Ok(())
    }
}
