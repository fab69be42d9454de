//! Report persistence (C4/C7). Every query carries a `tenant_id` predicate.

use async_trait::async_trait;
use hinschg_core::{Error, Result, TenantId};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::model::report::Report;

#[async_trait]
pub trait ReportRepository: Send + Sync {
    async fn create(&self, report: &Report) -> Result<Report>;
    async fn get_by_id(&self, tenant_id: TenantId, id: Uuid) -> Result<Option<Report>>;
    async fn get_by_access_code_hash(&self, access_code_hash: &str) -> Result<Option<Report>>;
    async fn get_by_reference_code(&self, tenant_id: TenantId, reference_code: &str) -> Result<Option<Report>>;
    async fn update(&self, report: &Report) -> Result<()>;
    async fn delete(&self, tenant_id: TenantId, id: Uuid) -> Result<()>;
    async fn list_by_tenant(&self, tenant_id: TenantId) -> Result<Vec<Report>>;
}

pub struct PostgresReportRepository {
    pool: PgPool,
}

impl PostgresReportRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_report(row: &sqlx::postgres::PgRow) -> Result<Report> {
        Ok(Report {
            id: row.get("id"),
            tenant_id: TenantId(row.get("tenant_id")),
            reference_code: row.get("reference_code"),
            access_code_hash: row.get("access_code_hash"),
            titel_encrypted: row.get("titel_encrypted"),
            beschreibung_encrypted: row.get("beschreibung_encrypted"),
            melder_name_encrypted: row.get("melder_name_encrypted"),
            melder_email_encrypted: row.get("melder_email_encrypted"),
            melder_telefon_encrypted: row.get("melder_telefon_encrypted"),
            betroffene_personen_encrypted: row.get("betroffene_personen_encrypted"),
            kategorie: row.get("kategorie"),
            prioritaet: row.get("prioritaet"),
            status: row.get("status"),
            kanal: row.get("kanal"),
            sprache: row.get("sprache"),
            ip_hash: row.get("ip_hash"),
            is_anonymous: row.get("is_anonymous"),
            betroffene_abteilung: row.get("betroffene_abteilung"),
            zeitraum_von: row.get("zeitraum_von"),
            zeitraum_bis: row.get("zeitraum_bis"),
            schaetzung_schaden: row.get("schaetzung_schaden"),
            tags: row.get("tags"),
            eingegangen_am: row.get("eingegangen_am"),
            eingangsbestaetigung_frist: row.get("eingangsbestaetigung_frist"),
            eingangsbestaetigung_gesendet_am: row.get("eingangsbestaetigung_gesendet_am"),
            rueckmeldung_frist: row.get("rueckmeldung_frist"),
            rueckmeldung_gesendet_am: row.get("rueckmeldung_gesendet_am"),
            aufbewahrung_bis: row.get("aufbewahrung_bis"),
            loeschung_geplant_am: row.get("loeschung_geplant_am"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        })
    }
}

#[async_trait]
impl ReportRepository for PostgresReportRepository {
    async fn create(&self, report: &Report) -> Result<Report> {
        sqlx::query(
            r#"
            INSERT INTO reports (
                id, tenant_id, reference_code, access_code_hash, titel_encrypted, beschreibung_encrypted,
                melder_name_encrypted, melder_email_encrypted, melder_telefon_encrypted, betroffene_personen_encrypted,
                kategorie, prioritaet, status, kanal, sprache, ip_hash, is_anonymous, betroffene_abteilung,
                zeitraum_von, zeitraum_bis, schaetzung_schaden, tags,
                eingegangen_am, eingangsbestaetigung_frist, eingangsbestaetigung_gesendet_am,
                rueckmeldung_frist, rueckmeldung_gesendet_am, aufbewahrung_bis, loeschung_geplant_am,
                created_at, updated_at
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18,
                $19, $20, $21, $22, $23, $24, $25, $26, $27, $28, $29, $30, $31
            )
            "#,
        )
        .bind(report.id)
        .bind(report.tenant_id.0)
        .bind(&report.reference_code)
        .bind(&report.access_code_hash)
        .bind(&report.titel_encrypted)
        .bind(&report.beschreibung_encrypted)
        .bind(&report.melder_name_encrypted)
        .bind(&report.melder_email_encrypted)
        .bind(&report.melder_telefon_encrypted)
        .bind(&report.betroffene_personen_encrypted)
        .bind(report.kategorie)
        .bind(report.prioritaet)
        .bind(report.status)
        .bind(report.kanal)
        .bind(&report.sprache)
        .bind(&report.ip_hash)
        .bind(report.is_anonymous)
        .bind(&report.betroffene_abteilung)
        .bind(report.zeitraum_von)
        .bind(report.zeitraum_bis)
        .bind(&report.schaetzung_schaden)
        .bind(&report.tags)
        .bind(report.eingegangen_am)
        .bind(report.eingangsbestaetigung_frist)
        .bind(report.eingangsbestaetigung_gesendet_am)
        .bind(report.rueckmeldung_frist)
        .bind(report.rueckmeldung_gesendet_am)
        .bind(report.aufbewahrung_bis)
        .bind(report.loeschung_geplant_am)
        .bind(report.created_at)
        .bind(report.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                Error::conflict("reference code or access code already exists")
            }
            other => Error::from(other),
        })?;
        Ok(report.clone())
    }

    async fn get_by_id(&self, tenant_id: TenantId, id: Uuid) -> Result<Option<Report>> {
        let row = sqlx::query("SELECT * FROM reports WHERE tenant_id = $1 AND id = $2")
            .bind(tenant_id.0)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::row_to_report).transpose()
    }

    async fn get_by_access_code_hash(&self, access_code_hash: &str) -> Result<Option<Report>> {
        let row = sqlx::query("SELECT * FROM reports WHERE access_code_hash = $1")
            .bind(access_code_hash)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::row_to_report).transpose()
    }

    async fn get_by_reference_code(&self, tenant_id: TenantId, reference_code: &str) -> Result<Option<Report>> {
        let row = sqlx::query("SELECT * FROM reports WHERE tenant_id = $1 AND reference_code = $2")
            .bind(tenant_id.0)
            .bind(reference_code)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::row_to_report).transpose()
    }

    async fn update(&self, report: &Report) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE reports SET
                status = $1, prioritaet = $2, betroffene_abteilung = $3, schaetzung_schaden = $4, tags = $5,
                eingangsbestaetigung_gesendet_am = $6, rueckmeldung_gesendet_am = $7,
                aufbewahrung_bis = $8, loeschung_geplant_am = $9, updated_at = $10
            WHERE tenant_id = $11 AND id = $12
            "#,
        )
        .bind(report.status)
        .bind(report.prioritaet)
        .bind(&report.betroffene_abteilung)
        .bind(&report.schaetzung_schaden)
        .bind(&report.tags)
        .bind(report.eingangsbestaetigung_gesendet_am)
        .bind(report.rueckmeldung_gesendet_am)
        .bind(report.aufbewahrung_bis)
        .bind(report.loeschung_geplant_am)
        .bind(report.updated_at)
        .bind(report.tenant_id.0)
        .bind(report.id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(Error::not_found("report not found"));
        }
        Ok(())
    }

    async fn delete(&self, tenant_id: TenantId, id: Uuid) -> Result<()> {
        // Cascades to the owned case, its events/deadlines, and attachments via FK.
        sqlx::query("DELETE FROM reports WHERE tenant_id = $1 AND id = $2")
            .bind(tenant_id.0)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_by_tenant(&self, tenant_id: TenantId) -> Result<Vec<Report>> {
        let rows = sqlx::query("SELECT * FROM reports WHERE tenant_id = $1 ORDER BY eingegangen_am DESC")
            .bind(tenant_id.0)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(Self::row_to_report).collect()
    }
}
