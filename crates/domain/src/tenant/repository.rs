//! Tenant persistence (C3, C14). The only repository in this crate that
//! does not carry a `tenant_id` predicate - a tenant is its own scope.

use async_trait::async_trait;
use chrono::Utc;
use hinschg_core::{Error, Result, TenantId};
use sqlx::{PgPool, Row};

use crate::model::tenant::{Tenant, TenantConfig};

#[async_trait]
pub trait TenantRepository: Send + Sync {
    async fn create(&self, tenant: &Tenant) -> Result<Tenant>;
    async fn get_by_id(&self, id: TenantId) -> Result<Option<Tenant>>;
    async fn get_by_slug(&self, slug: &str) -> Result<Option<Tenant>>;
    async fn update_config(&self, id: TenantId, config: &TenantConfig) -> Result<()>;
    async fn delete(&self, id: TenantId) -> Result<()>;
    async fn list(&self) -> Result<Vec<Tenant>>;
}

pub struct PostgresTenantRepository {
    pool: PgPool,
}

impl PostgresTenantRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_tenant(row: &sqlx::postgres::PgRow) -> Result<Tenant> {
        let config_json: serde_json::Value = row.get("config");
        let config: TenantConfig = serde_json::from_value(config_json).unwrap_or_default();
        Ok(Tenant {
            id: TenantId(row.get("id")),
            slug: row.get("slug"),
            display_name: row.get("display_name"),
            organization_size: row.get("organization_size"),
            contact_email: row.get("contact_email"),
            ombudsperson_email: row.get("ombudsperson_email"),
            config,
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        })
    }
}

#[async_trait]
impl TenantRepository for PostgresTenantRepository {
    async fn create(&self, tenant: &Tenant) -> Result<Tenant> {
        let config_json = serde_json::to_value(&tenant.config)?;
        sqlx::query(
            r#"
            INSERT INTO tenants (id, slug, display_name, organization_size, contact_email, ombudsperson_email, config, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(tenant.id.0)
        .bind(&tenant.slug)
        .bind(&tenant.display_name)
        .bind(tenant.organization_size)
        .bind(&tenant.contact_email)
        .bind(&tenant.ombudsperson_email)
        .bind(config_json)
        .bind(tenant.created_at)
        .bind(tenant.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                Error::conflict("tenant slug already exists")
            }
            other => Error::from(other),
        })?;
        Ok(tenant.clone())
    }

    async fn get_by_id(&self, id: TenantId) -> Result<Option<Tenant>> {
        let row = sqlx::query("SELECT * FROM tenants WHERE id = $1")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::row_to_tenant).transpose()
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Tenant>> {
        let row = sqlx::query("SELECT * FROM tenants WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::row_to_tenant).transpose()
    }

    async fn update_config(&self, id: TenantId, config: &TenantConfig) -> Result<()> {
        config.validate()?;
        let config_json = serde_json::to_value(config)?;
        let result = sqlx::query("UPDATE tenants SET config = $1, updated_at = $2 WHERE id = $3")
            .bind(config_json)
            .bind(Utc::now())
            .bind(id.0)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::not_found("tenant not found"));
        }
        Ok(())
    }

    async fn delete(&self, id: TenantId) -> Result<()> {
        // Cascades to every owned row (users, reports, cases, ...) via FK
        // ON DELETE CASCADE - see migrations.
        sqlx::query("DELETE FROM tenants WHERE id = $1")
            .bind(id.0)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Tenant>> {
        let rows = sqlx::query("SELECT * FROM tenants ORDER BY created_at ASC")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(Self::row_to_tenant).collect()
    }
}
