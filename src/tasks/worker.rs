//! Document worker.
//!
//! Single consumer that drains the document job queue: renders certificates
//! and field reports, stores the artifacts, and delivers notifications.
//! Claims use FOR UPDATE SKIP LOCKED, so several workers can run side by
//! side without double-processing.
//!
//! NOTE: All queries use runtime-checked sqlx::query() instead of compile-time
//! sqlx::query!() macros because the tables are created by migrations that may
//! not exist at compile time.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, Utc};
use rust_decimal::Decimal;
use serde_json::json;
use sqlx::{FromRow, PgPool};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::database::{
    CertificateService, ClientService, InspectionService, JobOrderService, NewCertificate,
    NewFieldReport, ReportService, UserService,
};
use crate::error::LifecycleError;
use crate::models::{format_certificate_number, InspectionStatus};
use crate::notify::{Notification, Notifier};
use crate::render::{
    AnswerLine, CertificateContext, DocumentRenderer, EquipmentSummary, FieldReportContext,
    ReportInspectionLine,
};
use crate::storage::{keys, sha256_hex, BlobStore};

use super::{
    CertificateRenderPayload, DocumentJob, DocumentJobKind, DocumentJobQueue,
    FieldReportRenderPayload,
};

/// Polling interval when queue is empty
const POLL_INTERVAL_MS: u64 = 100;

/// Backoff interval after error
const ERROR_BACKOFF_MS: u64 = 1000;

/// External URLs and branding baked into rendered documents.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Base URL of the portal; verification and share links hang off it.
    pub frontend_url: String,
    pub company_name: String,
}

impl WorkerConfig {
    pub fn from_env() -> Self {
        Self {
            frontend_url: std::env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            company_name: std::env::var("COMPANY_NAME")
                .unwrap_or_else(|_| "TUV Inspection Services".to_string()),
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Job-order context joined in for certificate rendering. Equipment columns
/// are nullable because a line item may not reference a concrete unit.
#[derive(Debug, FromRow)]
struct CertificateSubjectRow {
    po_reference: String,
    site_location: String,
    client_name: String,
    client_email: String,
    tag_code: Option<String>,
    equipment_type: Option<String>,
    manufacturer: Option<String>,
    model: Option<String>,
    serial_number: Option<String>,
    swl: Option<Decimal>,
    equipment_location: Option<String>,
}

#[derive(Debug, FromRow)]
struct ApprovalNameRow {
    approver_id: i64,
    approver_name: String,
    decision: String,
    comment: String,
    decided_at: Option<DateTime<Utc>>,
}

#[derive(Debug, FromRow)]
struct ReportLineRow {
    inspection_id: i64,
    status: String,
    inspector_name: String,
    equipment_tag: String,
    start_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
}

fn report_summary(po_reference: &str, total: i64, approved: i64, pending: i64) -> String {
    format!(
        "Field Inspection Report for {}. Total inspections: {}. Approved: {}, Pending: {}.",
        po_reference, total, approved, pending
    )
}

pub struct DocumentWorker {
    pool: PgPool,
    queue: DocumentJobQueue,
    renderer: Arc<dyn DocumentRenderer>,
    store: Arc<dyn BlobStore>,
    notifier: Arc<dyn Notifier>,
    config: WorkerConfig,
}

impl DocumentWorker {
    pub fn new(
        pool: PgPool,
        renderer: Arc<dyn DocumentRenderer>,
        store: Arc<dyn BlobStore>,
        notifier: Arc<dyn Notifier>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            queue: DocumentJobQueue::new(pool.clone()),
            pool,
            renderer,
            store,
            notifier,
            config,
        }
    }

    /// Start the worker loop (blocks until shutdown signal)
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!("Document worker started");

        loop {
            if *shutdown.borrow() {
                info!("Document worker shutting down");
                break;
            }

            match self.process_one().await {
                Ok(true) => {
                    // Processed a job, immediately check for more
                    continue;
                }
                Ok(false) => {
                    // Queue empty, wait before polling again
                    tokio::select! {
                        _ = tokio::time::sleep(Duration::from_millis(POLL_INTERVAL_MS)) => {}
                        _ = shutdown.changed() => {
                            if *shutdown.borrow() {
                                info!("Document worker shutting down");
                                break;
                            }
                        }
                    }
                }
                Err(e) => {
                    error!(?e, "Error processing document job");
                    tokio::time::sleep(Duration::from_millis(ERROR_BACKOFF_MS)).await;
                }
            }
        }
    }

    /// Process one job from the queue.
    /// Returns Ok(true) if a job was processed, Ok(false) if queue empty.
    async fn process_one(&self) -> Result<bool> {
        let Some(job) = self.queue.claim().await? else {
            return Ok(false);
        };

        debug!(job_id = %job.job_id, kind = %job.kind, "Processing document job");

        let outcome = match job.kind {
            DocumentJobKind::CertificateRender => self.process_certificate(&job).await,
            DocumentJobKind::FieldReportRender => self.process_field_report(&job).await,
            DocumentJobKind::Notification => self.process_notification(&job).await,
        };

        match outcome {
            Ok(()) => {
                self.queue.mark_completed(job.id).await?;
            }
            Err(e) => {
                // The job stays on the table as FAILED for operator review.
                warn!(job_id = %job.job_id, error = %e, "Document job failed");
                self.queue.mark_failed(job.id, &format!("{:#}", e)).await?;
            }
        }
        Ok(true)
    }

    async fn process_certificate(&self, job: &DocumentJob) -> Result<()> {
        let payload: CertificateRenderPayload = serde_json::from_value(job.payload.clone())
            .context("Failed to decode certificate render payload")?;

        let inspections = InspectionService::new(self.pool.clone());
        let inspection = inspections
            .find_by_id(payload.inspection_id)
            .await?
            .ok_or(LifecycleError::NotFound {
                entity: "inspection",
                id: payload.inspection_id,
            })?;

        // Approval is checked again here: the queue is asynchronous, so the
        // inspection may have changed since the job was enqueued.
        if inspection.status != InspectionStatus::Approved {
            return Err(LifecycleError::NotApproved { id: inspection.id }.into());
        }

        let certificates = CertificateService::new(self.pool.clone());
        if certificates.find_by_inspection(inspection.id).await?.is_some() {
            return Err(LifecycleError::CertificateExists { id: inspection.id }.into());
        }

        let subject = sqlx::query_as::<_, CertificateSubjectRow>(
            r#"
            SELECT
                jo.po_reference,
                jo.site_location,
                c.name AS client_name,
                c.email AS client_email,
                e.tag_code,
                e.equipment_type,
                e.manufacturer,
                e.model,
                e.serial_number,
                e.swl,
                e.location AS equipment_location
            FROM job_line_items jli
            JOIN job_orders jo ON jo.id = jli.job_order_id
            JOIN clients c ON c.id = jo.client_id
            LEFT JOIN equipment e ON e.id = jli.equipment_id
            WHERE jli.id = $1
            "#,
        )
        .bind(inspection.job_line_item_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(LifecycleError::NotFound {
            entity: "job line item",
            id: inspection.job_line_item_id,
        })?;

        let users = UserService::new(self.pool.clone());
        let inspector_name = match inspection.inspector_id {
            Some(user_id) => users
                .find_by_id(user_id)
                .await?
                .map(|u| u.full_name())
                .unwrap_or_else(|| "Unassigned".to_string()),
            None => "Unassigned".to_string(),
        };

        let approvals = sqlx::query_as::<_, ApprovalNameRow>(
            r#"
            SELECT
                a.approver_id,
                COALESCE(NULLIF(TRIM(u.first_name || ' ' || u.last_name), ''), u.username)
                    AS approver_name,
                a.decision,
                a.comment,
                a.decided_at
            FROM approvals a
            JOIN users u ON u.id = a.approver_id
            WHERE a.entity_type = 'INSPECTION' AND a.entity_id = $1
            ORDER BY a.decided_at
            "#,
        )
        .bind(inspection.id)
        .fetch_all(&self.pool)
        .await?;

        let approver_name = approvals
            .iter()
            .rev()
            .find(|a| a.decision == "APPROVED")
            .map(|a| a.approver_name.clone())
            .unwrap_or_default();

        let answers = inspections
            .list_answers(inspection.id)
            .await?
            .into_iter()
            .map(|a| AnswerLine {
                question_key: a.question_key,
                result: a.result.as_str().to_string(),
                comment: a.comment,
            })
            .collect();

        let is_safe = !inspections.has_unsafe_answer(inspection.id).await?;

        let issued_date = Utc::now();
        let certificate_number = format_certificate_number(issued_date.year(), inspection.id);
        let verification_url = format!(
            "{}/verify/{}",
            self.config.frontend_url.trim_end_matches('/'),
            certificate_number
        );

        let equipment = subject.tag_code.map(|tag_code| EquipmentSummary {
            tag_code,
            equipment_type: subject.equipment_type.unwrap_or_default(),
            manufacturer: subject.manufacturer.unwrap_or_default(),
            model: subject.model.unwrap_or_default(),
            serial_number: subject.serial_number.unwrap_or_default(),
            swl: subject.swl.map(|v| v.to_string()),
            location: subject.equipment_location.unwrap_or_default(),
        });

        let ctx = CertificateContext {
            certificate_number: certificate_number.clone(),
            verification_url: verification_url.clone(),
            issued_date,
            is_safe,
            approver_name,
            inspector_name,
            client_name: subject.client_name,
            po_reference: subject.po_reference.clone(),
            site_location: subject.site_location,
            equipment,
            answers,
            company_name: self.config.company_name.clone(),
        };

        let document = self.renderer.render_certificate(&ctx)?;
        let key = keys::certificate(&certificate_number, document.extension);
        let pdf_uri = self
            .store
            .store(&key, &document.bytes, document.content_type)
            .await?;
        let pdf_sha256 = sha256_hex(&document.bytes);

        let approval_chain = json!({
            "generated_by": payload.requested_by,
            "generated_at": issued_date,
            "is_safe": is_safe,
            "approvals": approvals
                .iter()
                .map(|a| json!({
                    "approver_id": a.approver_id,
                    "approver_name": a.approver_name,
                    "decision": a.decision,
                    "comment": a.comment,
                    "decided_at": a.decided_at,
                }))
                .collect::<Vec<_>>(),
        });

        let certificate = certificates
            .insert_generated(NewCertificate {
                inspection_id: inspection.id,
                generated_by: payload.requested_by,
                pdf_uri,
                pdf_sha256,
                qr_code: certificate_number,
                approval_chain,
            })
            .await?;

        let notification = Notification::CertificateIssued {
            certificate_id: certificate.id,
            recipient: subject.client_email,
            public_url: verification_url,
            po_reference: subject.po_reference,
        };
        self.queue
            .enqueue(
                DocumentJobKind::Notification,
                &notification,
                Some(payload.requested_by),
            )
            .await?;

        Ok(())
    }

    async fn process_field_report(&self, job: &DocumentJob) -> Result<()> {
        let payload: FieldReportRenderPayload = serde_json::from_value(job.payload.clone())
            .context("Failed to decode field report render payload")?;

        let order = JobOrderService::new(self.pool.clone())
            .find_by_id(payload.job_order_id)
            .await?
            .ok_or(LifecycleError::NotFound {
                entity: "job order",
                id: payload.job_order_id,
            })?;

        let client = ClientService::new(self.pool.clone())
            .find_by_id(order.client_id)
            .await?
            .ok_or(LifecycleError::NotFound {
                entity: "client",
                id: order.client_id,
            })?;

        let lines = sqlx::query_as::<_, ReportLineRow>(
            r#"
            SELECT
                i.id AS inspection_id,
                i.status,
                COALESCE(NULLIF(TRIM(u.first_name || ' ' || u.last_name), ''),
                         u.username, 'Unassigned') AS inspector_name,
                COALESCE(e.tag_code, jli.description) AS equipment_tag,
                i.start_time,
                i.end_time
            FROM inspections i
            JOIN job_line_items jli ON jli.id = i.job_line_item_id
            LEFT JOIN users u ON u.id = i.inspector_id
            LEFT JOIN equipment e ON e.id = jli.equipment_id
            WHERE jli.job_order_id = $1
            ORDER BY i.id
            "#,
        )
        .bind(order.id)
        .fetch_all(&self.pool)
        .await?;

        let total = lines.len() as i64;
        let approved = lines
            .iter()
            .filter(|l| l.status == InspectionStatus::Approved.as_str())
            .count() as i64;
        let pending = lines
            .iter()
            .filter(|l| l.status == InspectionStatus::Submitted.as_str())
            .count() as i64;
        let summary = report_summary(&order.po_reference, total, approved, pending);

        let generated_at = Utc::now();
        let ctx = FieldReportContext {
            job_order_id: order.id,
            po_reference: order.po_reference.clone(),
            client_name: client.name,
            site_location: order.site_location,
            generated_at,
            total_inspections: total,
            approved_inspections: approved,
            pending_inspections: pending,
            inspections: lines
                .into_iter()
                .map(|l| ReportInspectionLine {
                    inspection_id: l.inspection_id,
                    status: l.status,
                    inspector_name: l.inspector_name,
                    equipment_tag: l.equipment_tag,
                    start_time: l.start_time,
                    end_time: l.end_time,
                })
                .collect(),
            company_name: self.config.company_name.clone(),
        };

        let document = self.renderer.render_field_report(&ctx)?;
        let stamp = generated_at.format("%Y%m%d_%H%M%S").to_string();
        let key = keys::field_report(order.id, &stamp, document.extension);
        let pdf_uri = self
            .store
            .store(&key, &document.bytes, document.content_type)
            .await?;
        let pdf_sha256 = sha256_hex(&document.bytes);

        let report = ReportService::new(self.pool.clone())
            .insert_generated(NewFieldReport {
                job_order_id: order.id,
                pdf_uri,
                pdf_sha256,
                summary,
                generated_by: payload.requested_by,
            })
            .await?;

        let share_url = format!(
            "{}/public/reports/{}",
            self.config.frontend_url.trim_end_matches('/'),
            report.share_link_token
        );
        let notification = Notification::FieldReportReady {
            report_id: report.id,
            recipient: payload.recipient,
            share_url,
            po_reference: order.po_reference,
        };
        self.queue
            .enqueue(
                DocumentJobKind::Notification,
                &notification,
                Some(payload.requested_by),
            )
            .await?;

        Ok(())
    }

    async fn process_notification(&self, job: &DocumentJob) -> Result<()> {
        let notification: Notification = serde_json::from_value(job.payload.clone())
            .context("Failed to decode notification payload")?;

        self.notifier.notify(&notification).await?;

        // Delivery receipt for field reports; other kinds carry no record.
        if let Notification::FieldReportReady {
            report_id,
            recipient,
            ..
        } = &notification
        {
            ReportService::new(self.pool.clone())
                .mark_sent(*report_id, recipient)
                .await?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_summary_wording() {
        let summary = report_summary("PO-889", 5, 3, 2);
        assert_eq!(
            summary,
            "Field Inspection Report for PO-889. Total inspections: 5. Approved: 3, Pending: 2."
        );
    }

    #[test]
    fn test_report_summary_empty_order() {
        let summary = report_summary("PO-1", 0, 0, 0);
        assert!(summary.contains("Total inspections: 0"));
    }
}
