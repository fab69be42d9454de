//! Case persistence and the locked read-modify-write used by every
//! status-changing operation (C6). Transitions acquire the case row with
//! `SELECT ... FOR UPDATE` before reading its current status, per the
//! locking discipline: a transition must never race another transition on
//! the same case.

use async_trait::async_trait;
use hinschg_core::{Error, Result, TenantId, UserId};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::model::case::{Case, CaseEvent};

#[async_trait]
pub trait CaseRepository: Send + Sync {
    async fn create(&self, case: &Case) -> Result<Case>;
    async fn get_by_id(&self, tenant_id: TenantId, id: Uuid) -> Result<Option<Case>>;
    async fn get_by_report_id(&self, tenant_id: TenantId, report_id: Uuid) -> Result<Option<Case>>;
    async fn list_by_tenant(&self, tenant_id: TenantId) -> Result<Vec<Case>>;
    async fn list_assigned(&self, tenant_id: TenantId, assignee: UserId) -> Result<Vec<Case>>;
    async fn list_forwarded_to_ombudsperson(&self, tenant_id: TenantId) -> Result<Vec<Case>>;
    async fn delete(&self, tenant_id: TenantId, id: Uuid) -> Result<()>;
    async fn append_event(&self, event: &CaseEvent) -> Result<CaseEvent>;
    async fn list_events(&self, tenant_id: TenantId, case_id: Uuid) -> Result<Vec<CaseEvent>>;

    /// Locks the case row for the duration of one transaction, hands the
    /// current model to `mutate`, persists whatever `mutate` changed, and
    /// appends `event` (if any) - atomically. `mutate` returning `Err`
    /// aborts the transaction; nothing is written.
    async fn apply_locked(
        &self,
        tenant_id: TenantId,
        id: Uuid,
        mutate: Box<dyn FnOnce(&mut Case) -> Result<()> + Send>,
        event: Option<CaseEvent>,
    ) -> Result<Case>;
}

pub struct PostgresCaseRepository {
    pool: PgPool,
}

impl PostgresCaseRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_case(row: &sqlx::postgres::PgRow) -> Result<Case> {
        Ok(Case {
            id: row.get("id"),
            tenant_id: TenantId(row.get("tenant_id")),
            report_id: row.get("report_id"),
            case_number: row.get("case_number"),
            status: row.get("status"),
            previous_status: row.get("previous_status"),
            assignee: row.get::<Option<Uuid>, _>("assignee").map(UserId),
            severity: row.get("severity"),
            eskaliert: row.get("eskaliert"),
            eskaliert_am: row.get("eskaliert_am"),
            forwarded_to_ombudsperson_at: row.get("forwarded_to_ombudsperson_at"),
            forwarded_to_ombudsperson_by: row.get::<Option<Uuid>, _>("forwarded_to_ombudsperson_by").map(UserId),
            ombudsperson_recommendation: row.get("ombudsperson_recommendation"),
            ombudsperson_reviewed_at: row.get("ombudsperson_reviewed_at"),
            ombudsperson_reviewed_by: row.get::<Option<Uuid>, _>("ombudsperson_reviewed_by").map(UserId),
            ombudsperson_notes_encrypted: row.get("ombudsperson_notes_encrypted"),
            acknowledged_at: row.get("acknowledged_at"),
            resolved_at: row.get("resolved_at"),
            closed_at: row.get("closed_at"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        })
    }

    fn row_to_event(row: &sqlx::postgres::PgRow) -> Result<CaseEvent> {
        Ok(CaseEvent {
            id: row.get("id"),
            case_id: row.get("case_id"),
            tenant_id: TenantId(row.get("tenant_id")),
            event_type: row.get("event_type"),
            old_status: row.get("old_status"),
            new_status: row.get("new_status"),
            actor_id: row.get::<Option<Uuid>, _>("actor_id").map(UserId),
            description: row.get("description"),
            metadata: row.get("metadata"),
            internal: row.get("internal"),
            visible_to_reporter: row.get("visible_to_reporter"),
            created_at: row.get("created_at"),
        })
    }

    async fn update_case_tx(tx: &mut sqlx::Transaction<'_, sqlx::Postgres>, case: &Case) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE cases SET
                status = $1, previous_status = $2, assignee = $3, severity = $4,
                eskaliert = $5, eskaliert_am = $6,
                forwarded_to_ombudsperson_at = $7, forwarded_to_ombudsperson_by = $8,
                ombudsperson_recommendation = $9, ombudsperson_reviewed_at = $10, ombudsperson_reviewed_by = $11,
                ombudsperson_notes_encrypted = $12, acknowledged_at = $13, resolved_at = $14,
                closed_at = $15, updated_at = $16
            WHERE tenant_id = $17 AND id = $18
            "#,
        )
        .bind(case.status)
        .bind(case.previous_status)
        .bind(case.assignee.map(|u| u.0))
        .bind(case.severity)
        .bind(case.eskaliert)
        .bind(case.eskaliert_am)
        .bind(case.forwarded_to_ombudsperson_at)
        .bind(case.forwarded_to_ombudsperson_by.map(|u| u.0))
        .bind(case.ombudsperson_recommendation)
        .bind(case.ombudsperson_reviewed_at)
        .bind(case.ombudsperson_reviewed_by.map(|u| u.0))
        .bind(&case.ombudsperson_notes_encrypted)
        .bind(case.acknowledged_at)
        .bind(case.resolved_at)
        .bind(case.closed_at)
        .bind(case.updated_at)
        .bind(case.tenant_id.0)
        .bind(case.id)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    async fn insert_event_tx(tx: &mut sqlx::Transaction<'_, sqlx::Postgres>, event: &CaseEvent) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO case_events (
                id, case_id, tenant_id, event_type, old_status, new_status, actor_id,
                description, metadata, internal, visible_to_reporter, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(event.id)
        .bind(event.case_id)
        .bind(event.tenant_id.0)
        .bind(event.event_type)
        .bind(event.old_status)
        .bind(event.new_status)
        .bind(event.actor_id.map(|u| u.0))
        .bind(&event.description)
        .bind(&event.metadata)
        .bind(event.internal)
        .bind(event.visible_to_reporter)
        .bind(event.created_at)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl CaseRepository for PostgresCaseRepository {
    async fn create(&self, case: &Case) -> Result<Case> {
        sqlx::query(
            r#"
            INSERT INTO cases (
                id, tenant_id, report_id, case_number, status, previous_status, assignee, severity,
                eskaliert, eskaliert_am, forwarded_to_ombudsperson_at, forwarded_to_ombudsperson_by,
                ombudsperson_recommendation, ombudsperson_reviewed_at, ombudsperson_reviewed_by,
                ombudsperson_notes_encrypted, acknowledged_at, resolved_at, closed_at, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21)
            "#,
        )
        .bind(case.id)
        .bind(case.tenant_id.0)
        .bind(case.report_id)
        .bind(&case.case_number)
        .bind(case.status)
        .bind(case.previous_status)
        .bind(case.assignee.map(|u| u.0))
        .bind(case.severity)
        .bind(case.eskaliert)
        .bind(case.eskaliert_am)
        .bind(case.forwarded_to_ombudsperson_at)
        .bind(case.forwarded_to_ombudsperson_by.map(|u| u.0))
        .bind(case.ombudsperson_recommendation)
        .bind(case.ombudsperson_reviewed_at)
        .bind(case.ombudsperson_reviewed_by.map(|u| u.0))
        .bind(&case.ombudsperson_notes_encrypted)
        .bind(case.acknowledged_at)
        .bind(case.resolved_at)
        .bind(case.closed_at)
        .bind(case.created_at)
        .bind(case.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                Error::conflict("case already exists for this report, or case number clashes")
            }
            other => Error::from(other),
        })?;
        Ok(case.clone())
    }

    async fn get_by_id(&self, tenant_id: TenantId, id: Uuid) -> Result<Option<Case>> {
        let row = sqlx::query("SELECT * FROM cases WHERE tenant_id = $1 AND id = $2")
            .bind(tenant_id.0)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::row_to_case).transpose()
    }

    async fn get_by_report_id(&self, tenant_id: TenantId, report_id: Uuid) -> Result<Option<Case>> {
        let row = sqlx::query("SELECT * FROM cases WHERE tenant_id = $1 AND report_id = $2")
            .bind(tenant_id.0)
            .bind(report_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::row_to_case).transpose()
    }

    async fn list_by_tenant(&self, tenant_id: TenantId) -> Result<Vec<Case>> {
        let rows = sqlx::query("SELECT * FROM cases WHERE tenant_id = $1 ORDER BY created_at DESC")
            .bind(tenant_id.0)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(Self::row_to_case).collect()
    }

    async fn list_assigned(&self, tenant_id: TenantId, assignee: UserId) -> Result<Vec<Case>> {
        let rows = sqlx::query("SELECT * FROM cases WHERE tenant_id = $1 AND assignee = $2 ORDER BY created_at DESC")
            .bind(tenant_id.0)
            .bind(assignee.0)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(Self::row_to_case).collect()
    }

    async fn list_forwarded_to_ombudsperson(&self, tenant_id: TenantId) -> Result<Vec<Case>> {
        let rows = sqlx::query(
            "SELECT * FROM cases WHERE tenant_id = $1 AND forwarded_to_ombudsperson_at IS NOT NULL ORDER BY forwarded_to_ombudsperson_at DESC",
        )
        .bind(tenant_id.0)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::row_to_case).collect()
    }

    async fn delete(&self, tenant_id: TenantId, id: Uuid) -> Result<()> {
        // Cascades to case_events, deadlines via FK; the report row survives.
        sqlx::query("DELETE FROM cases WHERE tenant_id = $1 AND id = $2")
            .bind(tenant_id.0)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn append_event(&self, event: &CaseEvent) -> Result<CaseEvent> {
        sqlx::query(
            r#"
            INSERT INTO case_events (
                id, case_id, tenant_id, event_type, old_status, new_status, actor_id,
                description, metadata, internal, visible_to_reporter, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(event.id)
        .bind(event.case_id)
        .bind(event.tenant_id.0)
        .bind(event.event_type)
        .bind(event.old_status)
        .bind(event.new_status)
        .bind(event.actor_id.map(|u| u.0))
        .bind(&event.description)
        .bind(&event.metadata)
        .bind(event.internal)
        .bind(event.visible_to_reporter)
        .bind(event.created_at)
        .execute(&self.pool)
        .await?;
        Ok(event.clone())
    }

    async fn list_events(&self, tenant_id: TenantId, case_id: Uuid) -> Result<Vec<CaseEvent>> {
        let rows = sqlx::query("SELECT * FROM case_events WHERE tenant_id = $1 AND case_id = $2 ORDER BY created_at ASC")
            .bind(tenant_id.0)
            .bind(case_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(Self::row_to_event).collect()
    }

    async fn apply_locked(
        &self,
        tenant_id: TenantId,
        id: Uuid,
        mutate: Box<dyn FnOnce(&mut Case) -> Result<()> + Send>,
        event: Option<CaseEvent>,
    ) -> Result<Case> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT * FROM cases WHERE tenant_id = $1 AND id = $2 FOR UPDATE")
            .bind(tenant_id.0)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| Error::not_found("case not found"))?;
        let mut case = Self::row_to_case(&row)?;

        mutate(&mut case)?;

        Self::update_case_tx(&mut tx, &case).await?;
        if let Some(event) = event {
            Self::insert_event_tx(&mut tx, &event).await?;
        }

        tx.commit().await?;
        Ok(case)
    }
}
