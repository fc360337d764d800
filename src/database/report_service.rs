//! Field inspection reports: per-job-order roll-up documents.

use anyhow::{Context, Result};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::FieldInspectionReport;

pub struct ReportService {
    pool: PgPool,
}

/// Insert payload produced by the document worker after rendering.
#[derive(Debug, Clone)]
pub struct NewFieldReport {
    pub job_order_id: i64,
    pub pdf_uri: String,
    pub pdf_sha256: String,
    pub summary: String,
    pub generated_by: i64,
}

impl ReportService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert_generated(&self, new: NewFieldReport) -> Result<FieldInspectionReport> {
        let report = sqlx::query_as::<_, FieldInspectionReport>(
            r#"
            INSERT INTO field_inspection_reports (
                job_order_id, pdf_uri, pdf_sha256, summary, share_link_token,
                created_by, updated_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            RETURNING *
            "#,
        )
        .bind(new.job_order_id)
        .bind(&new.pdf_uri)
        .bind(&new.pdf_sha256)
        .bind(&new.summary)
        .bind(Uuid::new_v4())
        .bind(new.generated_by)
        .fetch_one(&self.pool)
        .await
        .context("Failed to insert field inspection report")?;

        tracing::info!(
            "Generated field inspection report {} for job order {}",
            report.id,
            report.job_order_id
        );
        Ok(report)
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<FieldInspectionReport>> {
        sqlx::query_as::<_, FieldInspectionReport>(
            "SELECT * FROM field_inspection_reports WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch field inspection report")
    }

    /// Public share-link lookup.
    pub async fn find_by_token(&self, token: Uuid) -> Result<Option<FieldInspectionReport>> {
        sqlx::query_as::<_, FieldInspectionReport>(
            "SELECT * FROM field_inspection_reports WHERE share_link_token = $1",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch field inspection report by share token")
    }

    pub async fn list_for_job_order(
        &self,
        job_order_id: i64,
    ) -> Result<Vec<FieldInspectionReport>> {
        sqlx::query_as::<_, FieldInspectionReport>(
            r#"
            SELECT * FROM field_inspection_reports
            WHERE job_order_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(job_order_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list field inspection reports")
    }

    /// Record who the report was dispatched to.
    pub async fn mark_sent(&self, id: i64, recipient: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE field_inspection_reports
            SET sent_to = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(recipient)
        .execute(&self.pool)
        .await
        .context("Failed to mark field inspection report sent")?;
        Ok(())
    }
}
