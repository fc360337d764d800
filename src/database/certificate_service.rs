//! Certificate records. Rows are inserted by the document worker once the
//! rendered artifact is stored; this service handles reads and the
//! publication status flips.

use anyhow::{Context, Result};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{Certificate, CertificateStatus};

pub struct CertificateService {
    pool: PgPool,
}

/// Insert payload produced by the document worker after rendering.
#[derive(Debug, Clone)]
pub struct NewCertificate {
    pub inspection_id: i64,
    pub generated_by: i64,
    pub pdf_uri: String,
    pub pdf_sha256: String,
    pub qr_code: String,
    pub approval_chain: serde_json::Value,
}

impl CertificateService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert_generated(&self, new: NewCertificate) -> Result<Certificate> {
        let certificate = sqlx::query_as::<_, Certificate>(
            r#"
            INSERT INTO certificates (
                inspection_id, generated_by, pdf_uri, pdf_sha256, qr_code,
                approval_chain, status, share_link_token, created_by, updated_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, 'GENERATED', $7, $2, $2)
            RETURNING *
            "#,
        )
        .bind(new.inspection_id)
        .bind(new.generated_by)
        .bind(&new.pdf_uri)
        .bind(&new.pdf_sha256)
        .bind(&new.qr_code)
        .bind(&new.approval_chain)
        .bind(Uuid::new_v4())
        .fetch_one(&self.pool)
        .await
        .context("Failed to insert certificate")?;

        tracing::info!(
            "Generated certificate {} for inspection {}",
            certificate.qr_code,
            certificate.inspection_id
        );
        Ok(certificate)
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Certificate>> {
        sqlx::query_as::<_, Certificate>("SELECT * FROM certificates WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch certificate")
    }

    pub async fn find_by_inspection(&self, inspection_id: i64) -> Result<Option<Certificate>> {
        sqlx::query_as::<_, Certificate>("SELECT * FROM certificates WHERE inspection_id = $1")
            .bind(inspection_id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch certificate by inspection")
    }

    /// Public share-link lookup. Only published certificates resolve.
    pub async fn find_published_by_token(&self, token: Uuid) -> Result<Option<Certificate>> {
        sqlx::query_as::<_, Certificate>(
            "SELECT * FROM certificates WHERE share_link_token = $1 AND status = 'PUBLISHED'",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch certificate by share token")
    }

    /// The certificate backing a piece of equipment's latest approved
    /// inspection, if one has been issued.
    pub async fn find_latest_for_equipment(&self, equipment_id: i64) -> Result<Option<Certificate>> {
        sqlx::query_as::<_, Certificate>(
            r#"
            SELECT ct.* FROM certificates ct
            JOIN inspections i ON i.id = ct.inspection_id
            JOIN job_line_items li ON li.id = i.job_line_item_id
            WHERE li.equipment_id = $1 AND i.status = 'APPROVED'
            ORDER BY ct.issued_date DESC
            LIMIT 1
            "#,
        )
        .bind(equipment_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch latest certificate for equipment")
    }

    pub async fn list(&self, status: Option<CertificateStatus>) -> Result<Vec<Certificate>> {
        sqlx::query_as::<_, Certificate>(
            r#"
            SELECT * FROM certificates
            WHERE ($1::TEXT IS NULL OR status = $1)
            ORDER BY issued_date DESC
            "#,
        )
        .bind(status.map(|s| s.as_str().to_string()))
        .fetch_all(&self.pool)
        .await
        .context("Failed to list certificates")
    }

    /// Certificates visible to a portal account: published ones on the
    /// client record whose contact email matches the account's email.
    pub async fn list_for_client_user(&self, user_id: i64) -> Result<Vec<Certificate>> {
        sqlx::query_as::<_, Certificate>(
            r#"
            SELECT ct.* FROM certificates ct
            JOIN inspections i ON i.id = ct.inspection_id
            JOIN job_line_items li ON li.id = i.job_line_item_id
            JOIN job_orders jo ON jo.id = li.job_order_id
            JOIN clients c ON c.id = jo.client_id
            WHERE c.email = (SELECT email FROM users WHERE id = $1)
              AND ct.status = 'PUBLISHED'
            ORDER BY ct.issued_date DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list certificates for client user")
    }

    pub async fn list_for_job_order(&self, job_order_id: i64) -> Result<Vec<Certificate>> {
        sqlx::query_as::<_, Certificate>(
            r#"
            SELECT ct.* FROM certificates ct
            JOIN inspections i ON i.id = ct.inspection_id
            JOIN job_line_items li ON li.id = i.job_line_item_id
            WHERE li.job_order_id = $1
            ORDER BY ct.issued_date
            "#,
        )
        .bind(job_order_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list certificates for job order")
    }
}
