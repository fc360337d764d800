//! Field inspection reports: consolidated per-job-order documents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct FieldInspectionReport {
    pub id: i64,
    pub job_order_id: i64,
    pub pdf_uri: String,
    pub pdf_sha256: String,
    /// One-line totals (inspections / approved / pending) written by the
    /// document worker.
    pub summary: String,
    pub sent_to: String,
    pub share_link_token: Uuid,
    pub created_by: Option<i64>,
    pub updated_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
