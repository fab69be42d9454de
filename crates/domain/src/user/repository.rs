//! User persistence (C15's subject side). Every query carries a
//! `tenant_id` predicate; email uniqueness is enforced per-tenant by a
//! `(tenant_id, email)` unique index, not a global one.

use async_trait::async_trait;
use hinschg_core::{Error, Result, TenantId, UserId};
use sqlx::{PgPool, Row};

use crate::model::user::User;

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: &User) -> Result<User>;
    async fn get_by_id(&self, tenant_id: TenantId, id: UserId) -> Result<Option<User>>;
    async fn get_by_email(&self, tenant_id: TenantId, email: &str) -> Result<Option<User>>;
    async fn update(&self, user: &User) -> Result<()>;
    async fn delete(&self, tenant_id: TenantId, id: UserId) -> Result<()>;
    async fn list_by_tenant(&self, tenant_id: TenantId) -> Result<Vec<User>>;
}

pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_user(row: &sqlx::postgres::PgRow) -> Result<User> {
        Ok(User {
            id: UserId(row.get("id")),
            tenant_id: TenantId(row.get("tenant_id")),
            email: row.get("email"),
            password_hash: row.get("password_hash"),
            role: row.get("role"),
            mfa_enabled: row.get("mfa_enabled"),
            failed_login_count: row.get::<i32, _>("failed_login_count") as u32,
            locked_until: row.get("locked_until"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        })
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn create(&self, user: &User) -> Result<User> {
        sqlx::query(
            r#"
            INSERT INTO users (id, tenant_id, email, password_hash, role, mfa_enabled, failed_login_count, locked_until, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(user.id.0)
        .bind(user.tenant_id.0)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role)
        .bind(user.mfa_enabled)
        .bind(user.failed_login_count as i32)
        .bind(user.locked_until)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                Error::conflict("email already in use for this tenant")
            }
            other => Error::from(other),
        })?;
        Ok(user.clone())
    }

    async fn get_by_id(&self, tenant_id: TenantId, id: UserId) -> Result<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE tenant_id = $1 AND id = $2")
            .bind(tenant_id.0)
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::row_to_user).transpose()
    }

    async fn get_by_email(&self, tenant_id: TenantId, email: &str) -> Result<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE tenant_id = $1 AND email = $2")
            .bind(tenant_id.0)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::row_to_user).transpose()
    }

    async fn update(&self, user: &User) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET email = $1, password_hash = $2, role = $3, mfa_enabled = $4,
                failed_login_count = $5, locked_until = $6, updated_at = $7
            WHERE tenant_id = $8 AND id = $9
            "#,
        )
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role)
        .bind(user.mfa_enabled)
        .bind(user.failed_login_count as i32)
        .bind(user.locked_until)
        .bind(user.updated_at)
        .bind(user.tenant_id.0)
        .bind(user.id.0)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(Error::not_found("user not found"));
        }
        Ok(())
    }

    async fn delete(&self, tenant_id: TenantId, id: UserId) -> Result<()> {
        sqlx::query("DELETE FROM users WHERE tenant_id = $1 AND id = $2")
            .bind(tenant_id.0)
            .bind(id.0)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_by_tenant(&self, tenant_id: TenantId) -> Result<Vec<User>> {
        let rows = sqlx::query("SELECT * FROM users WHERE tenant_id = $1 ORDER BY created_at ASC")
            .bind(tenant_id.0)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(Self::row_to_user).collect()
    }
}
