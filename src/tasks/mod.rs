//! Async document-generation queue.
//!
//! Certificate and report rendering runs out-of-band: API handlers enqueue
//! a job and return its id immediately, and the worker drains the queue.
//! Claims take `FOR UPDATE SKIP LOCKED`, so concurrent workers never pick
//! up the same job. Failed jobs stay on the table with their error for
//! operator inspection; there are no automatic retries.

pub mod worker;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentJobKind {
    CertificateRender,
    FieldReportRender,
    Notification,
}

impl DocumentJobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CertificateRender => "CERTIFICATE_RENDER",
            Self::FieldReportRender => "FIELD_REPORT_RENDER",
            Self::Notification => "NOTIFICATION",
        }
    }
}

impl std::fmt::Display for DocumentJobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<String> for DocumentJobKind {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.as_str() {
            "CERTIFICATE_RENDER" => Ok(Self::CertificateRender),
            "FIELD_REPORT_RENDER" => Ok(Self::FieldReportRender),
            "NOTIFICATION" => Ok(Self::Notification),
            _ => Err(format!("Unknown document job kind: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentJobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl DocumentJobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Processing => "PROCESSING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for DocumentJobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<String> for DocumentJobStatus {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.as_str() {
            "PENDING" => Ok(Self::Pending),
            "PROCESSING" => Ok(Self::Processing),
            "COMPLETED" => Ok(Self::Completed),
            "FAILED" => Ok(Self::Failed),
            _ => Err(format!("Unknown document job status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DocumentJob {
    pub id: i64,
    pub job_id: Uuid,
    #[sqlx(try_from = "String")]
    pub kind: DocumentJobKind,
    pub payload: serde_json::Value,
    #[sqlx(try_from = "String")]
    pub status: DocumentJobStatus,
    pub error: Option<String>,
    pub requested_by: Option<i64>,
    pub queued_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// Payload of a CERTIFICATE_RENDER job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertificateRenderPayload {
    pub inspection_id: i64,
    pub requested_by: i64,
}

/// Payload of a FIELD_REPORT_RENDER job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldReportRenderPayload {
    pub job_order_id: i64,
    /// Where the finished report should be sent.
    pub recipient: String,
    pub requested_by: i64,
}

pub struct DocumentJobQueue {
    pool: PgPool,
}

impl DocumentJobQueue {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn enqueue<P: Serialize>(
        &self,
        kind: DocumentJobKind,
        payload: &P,
        requested_by: Option<i64>,
    ) -> Result<DocumentJob> {
        let payload =
            serde_json::to_value(payload).context("Failed to serialize job payload")?;

        let job = sqlx::query_as::<_, DocumentJob>(
            r#"
            INSERT INTO document_jobs (job_id, kind, payload, requested_by)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(kind.as_str())
        .bind(&payload)
        .bind(requested_by)
        .fetch_one(&self.pool)
        .await
        .context("Failed to enqueue document job")?;

        tracing::info!("Enqueued {} job {}", job.kind, job.job_id);
        Ok(job)
    }

    pub async fn find_by_job_id(&self, job_id: Uuid) -> Result<Option<DocumentJob>> {
        sqlx::query_as::<_, DocumentJob>("SELECT * FROM document_jobs WHERE job_id = $1")
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch document job")
    }

    /// Claim the oldest pending job, marking it PROCESSING. Returns None
    /// when the queue is empty.
    pub async fn claim(&self) -> Result<Option<DocumentJob>> {
        sqlx::query_as::<_, DocumentJob>(
            r#"
            WITH next AS (
                SELECT id FROM document_jobs
                WHERE status = 'PENDING'
                ORDER BY queued_at
                LIMIT 1
                FOR UPDATE SKIP LOCKED
            )
            UPDATE document_jobs d
            SET status = 'PROCESSING', started_at = NOW()
            FROM next
            WHERE d.id = next.id
            RETURNING d.*
            "#,
        )
        .fetch_optional(&self.pool)
        .await
        .context("Failed to claim document job")
    }

    pub async fn mark_completed(&self, id: i64) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE document_jobs
            SET status = 'COMPLETED', finished_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .context("Failed to mark job completed")?;
        Ok(())
    }

    pub async fn mark_failed(&self, id: i64, error: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE document_jobs
            SET status = 'FAILED', error = $2, finished_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(error)
        .execute(&self.pool)
        .await
        .context("Failed to mark job failed")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_kind_round_trip() {
        assert_eq!(
            DocumentJobKind::try_from("FIELD_REPORT_RENDER".to_string()).unwrap(),
            DocumentJobKind::FieldReportRender
        );
        assert!(DocumentJobKind::try_from("PDF".to_string()).is_err());
    }

    #[test]
    fn test_certificate_payload_round_trip() {
        let payload = CertificateRenderPayload {
            inspection_id: 42,
            requested_by: 7,
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["inspection_id"], 42);
        let back: CertificateRenderPayload = serde_json::from_value(value).unwrap();
        assert_eq!(back.inspection_id, 42);
        assert_eq!(back.requested_by, 7);
    }
}
