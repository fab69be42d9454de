//! Anonymous-channel persistence (C8). Lookup by receipt code is a global
//! index, not tenant-scoped - mirroring `ReportRepository::get_by_access_code_hash` -
//! since the unauthenticated caller presents only the code, never a tenant.

use async_trait::async_trait;
use hinschg_core::{Error, Result, TenantId};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::model::anon::{AnonMessage, AnonSubmission};

#[async_trait]
pub trait AnonSubmissionRepository: Send + Sync {
    async fn create(&self, submission: &AnonSubmission) -> Result<AnonSubmission>;
    async fn get_by_receipt_code(&self, receipt_code: &str) -> Result<Option<AnonSubmission>>;
    async fn update(&self, submission: &AnonSubmission) -> Result<()>;
}

#[async_trait]
pub trait AnonMessageRepository: Send + Sync {
    async fn create(&self, message: &AnonMessage) -> Result<AnonMessage>;
    async fn list_by_submission(&self, tenant_id: TenantId, submission_id: Uuid) -> Result<Vec<AnonMessage>>;
}

pub struct PostgresAnonRepository {
    pool: PgPool,
}

impl PostgresAnonRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_submission(row: &sqlx::postgres::PgRow) -> Result<AnonSubmission> {
        Ok(AnonSubmission {
            id: row.get("id"),
            tenant_id: TenantId(row.get("tenant_id")),
            receipt_code: row.get("receipt_code"),
            case_number: row.get("case_number"),
            titel_encrypted: row.get("titel_encrypted"),
            beschreibung_encrypted: row.get("beschreibung_encrypted"),
            kategorie: row.get("kategorie"),
            status: row.get("status"),
            eingegangen_am: row.get("eingegangen_am"),
            eingangsbestaetigung_frist: row.get("eingangsbestaetigung_frist"),
            rueckmeldung_frist: row.get("rueckmeldung_frist"),
            report_id: row.get("report_id"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        })
    }

    fn row_to_message(row: &sqlx::postgres::PgRow) -> Result<AnonMessage> {
        Ok(AnonMessage {
            id: row.get("id"),
            tenant_id: TenantId(row.get("tenant_id")),
            submission_id: row.get("submission_id"),
            direction: row.get("direction"),
            body_encrypted: row.get("body_encrypted"),
            read_at: row.get("read_at"),
            created_at: row.get("created_at"),
        })
    }
}

#[async_trait]
impl AnonSubmissionRepository for PostgresAnonRepository {
    async fn create(&self, submission: &AnonSubmission) -> Result<AnonSubmission> {
        sqlx::query(
            r#"
            INSERT INTO anon_submissions (
                id, tenant_id, receipt_code, case_number, titel_encrypted, beschreibung_encrypted,
                kategorie, status, eingegangen_am, eingangsbestaetigung_frist, rueckmeldung_frist,
                report_id, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(submission.id)
        .bind(submission.tenant_id.0)
        .bind(&submission.receipt_code)
        .bind(&submission.case_number)
        .bind(&submission.titel_encrypted)
        .bind(&submission.beschreibung_encrypted)
        .bind(submission.kategorie)
        .bind(submission.status)
        .bind(submission.eingegangen_am)
        .bind(submission.eingangsbestaetigung_frist)
        .bind(submission.rueckmeldung_frist)
        .bind(submission.report_id)
        .bind(submission.created_at)
        .bind(submission.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => Error::conflict("receipt code already exists"),
            other => Error::from(other),
        })?;
        Ok(submission.clone())
    }

    async fn get_by_receipt_code(&self, receipt_code: &str) -> Result<Option<AnonSubmission>> {
        let row = sqlx::query("SELECT * FROM anon_submissions WHERE receipt_code = $1")
            .bind(receipt_code)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::row_to_submission).transpose()
    }

    async fn update(&self, submission: &AnonSubmission) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE anon_submissions SET
                status = $1, report_id = $2, updated_at = $3
            WHERE tenant_id = $4 AND id = $5
            "#,
        )
        .bind(submission.status)
        .bind(submission.report_id)
        .bind(submission.updated_at)
        .bind(submission.tenant_id.0)
        .bind(submission.id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(Error::not_found("anonymous submission not found"));
        }
        Ok(())
    }
}

#[async_trait]
impl AnonMessageRepository for PostgresAnonRepository {
    async fn create(&self, message: &AnonMessage) -> Result<AnonMessage> {
        sqlx::query(
            r#"
            INSERT INTO anon_messages (id, tenant_id, submission_id, direction, body_encrypted, read_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(message.id)
        .bind(message.tenant_id.0)
        .bind(message.submission_id)
        .bind(message.direction)
        .bind(&message.body_encrypted)
        .bind(message.read_at)
        .bind(message.created_at)
        .execute(&self.pool)
        .await?;
        Ok(message.clone())
    }

    async fn list_by_submission(&self, tenant_id: TenantId, submission_id: Uuid) -> Result<Vec<AnonMessage>> {
        let rows = sqlx::query(
            "SELECT * FROM anon_messages WHERE tenant_id = $1 AND submission_id = $2 ORDER BY created_at ASC",
        )
        .bind(tenant_id.0)
        .bind(submission_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::row_to_message).collect()
    }
}
