//! Deadline persistence (C5/C10). `deadlines` carries no `tenant_id` column
//! of its own - isolation is enforced by joining through the owning case,
//! mirroring spec.md §3's ownership chain (a report owns its case owns its
//! deadlines).

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use hinschg_core::{Error, Result, TenantId};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::model::deadline::{Deadline, DeadlineType};

#[async_trait]
pub trait DeadlineRepository: Send + Sync {
    async fn create(&self, deadline: &Deadline) -> Result<Deadline>;
    async fn get_open_by_case_and_type(&self, tenant_id: TenantId, case_id: Uuid, deadline_type: DeadlineType) -> Result<Option<Deadline>>;
    async fn mark_done(&self, tenant_id: TenantId, case_id: Uuid, deadline_type: DeadlineType, now: DateTime<Utc>) -> Result<()>;
    async fn list_overdue_not_escalated(&self, tenant_id: TenantId, now: DateTime<Utc>) -> Result<Vec<Deadline>>;
    async fn mark_escalated(&self, tenant_id: TenantId, id: Uuid) -> Result<()>;
    async fn list_upcoming_not_reminded(&self, tenant_id: TenantId, now: DateTime<Utc>, window: Duration) -> Result<Vec<Deadline>>;
    async fn mark_reminder_sent(&self, tenant_id: TenantId, id: Uuid) -> Result<()>;
}

pub struct PostgresDeadlineRepository {
    pool: PgPool,
}

impl PostgresDeadlineRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_deadline(row: &sqlx::postgres::PgRow) -> Result<Deadline> {
        Ok(Deadline {
            id: row.get("id"),
            case_id: row.get("case_id"),
            deadline_type: row.get("deadline_type"),
            due_at: row.get("due_at"),
            done_at: row.get("done_at"),
            reminder_sent: row.get("reminder_sent"),
            escalated: row.get("escalated"),
            created_at: row.get("created_at"),
        })
    }
}

#[async_trait]
impl DeadlineRepository for PostgresDeadlineRepository {
    async fn create(&self, deadline: &Deadline) -> Result<Deadline> {
        sqlx::query(
            r#"
            INSERT INTO deadlines (id, case_id, deadline_type, due_at, done_at, reminder_sent, escalated, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(deadline.id)
        .bind(deadline.case_id)
        .bind(deadline.deadline_type)
        .bind(deadline.due_at)
        .bind(deadline.done_at)
        .bind(deadline.reminder_sent)
        .bind(deadline.escalated)
        .bind(deadline.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                Error::conflict("an open deadline of this type already exists for the case")
            }
            other => Error::from(other),
        })?;
        Ok(deadline.clone())
    }

    async fn get_open_by_case_and_type(&self, tenant_id: TenantId, case_id: Uuid, deadline_type: DeadlineType) -> Result<Option<Deadline>> {
        let row = sqlx::query(
            r#"
            SELECT d.* FROM deadlines d
            JOIN cases c ON c.id = d.case_id
            WHERE c.tenant_id = $1 AND d.case_id = $2 AND d.deadline_type = $3 AND d.done_at IS NULL
            "#,
        )
        .bind(tenant_id.0)
        .bind(case_id)
        .bind(deadline_type)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(Self::row_to_deadline).transpose()
    }

    async fn mark_done(&self, tenant_id: TenantId, case_id: Uuid, deadline_type: DeadlineType, now: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE deadlines d SET done_at = $1
            FROM cases c
            WHERE c.id = d.case_id AND c.tenant_id = $2 AND d.case_id = $3 AND d.deadline_type = $4 AND d.done_at IS NULL
            "#,
        )
        .bind(now)
        .bind(tenant_id.0)
        .bind(case_id)
        .bind(deadline_type)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_overdue_not_escalated(&self, tenant_id: TenantId, now: DateTime<Utc>) -> Result<Vec<Deadline>> {
        let rows = sqlx::query(
            r#"
            SELECT d.* FROM deadlines d
            JOIN cases c ON c.id = d.case_id
            WHERE c.tenant_id = $1 AND d.done_at IS NULL AND d.due_at < $2 AND d.escalated = false
            ORDER BY d.due_at ASC
            "#,
        )
        .bind(tenant_id.0)
        .bind(now)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::row_to_deadline).collect()
    }

    async fn mark_escalated(&self, tenant_id: TenantId, id: Uuid) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE deadlines d SET escalated = true
            FROM cases c
            WHERE c.id = d.case_id AND c.tenant_id = $1 AND d.id = $2
            "#,
        )
        .bind(tenant_id.0)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_upcoming_not_reminded(&self, tenant_id: TenantId, now: DateTime<Utc>, window: Duration) -> Result<Vec<Deadline>> {
        let horizon = now + window;
        let rows = sqlx::query(
            r#"
            SELECT d.* FROM deadlines d
            JOIN cases c ON c.id = d.case_id
            WHERE c.tenant_id = $1 AND d.done_at IS NULL AND d.due_at >= $2 AND d.due_at < $3 AND d.reminder_sent = false
            ORDER BY d.due_at ASC
            "#,
        )
        .bind(tenant_id.0)
        .bind(now)
        .bind(horizon)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::row_to_deadline).collect()
    }

    async fn mark_reminder_sent(&self, tenant_id: TenantId, id: Uuid) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE deadlines d SET reminder_sent = true
            FROM cases c
            WHERE c.id = d.case_id AND c.tenant_id = $1 AND d.id = $2
            "#,
        )
        .bind(tenant_id.0)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
