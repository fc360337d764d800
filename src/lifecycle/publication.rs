//! Publication: the moment a job order's results become visible to the
//! client portal and public share links.
//!
//! Publishing flips every generated certificate under the order to
//! PUBLISHED, stamps the order itself, and appends the audit trail, all in
//! one transaction. Revoking pulls the same records back.

use anyhow::Context;
use serde_json::json;
use sqlx::PgPool;

use crate::database::audit_log::{AuditAction, AuditLogger, NewAuditEntry};
use crate::error::{LifecycleError, LifecycleResult};
use crate::lifecycle::guard;
use crate::models::{JobOrder, JobOrderStatus, Publication, PublicationStatus, User};

const AUDIT_ENTITY: &str = "JOB_ORDER";

pub struct PublicationLifecycle {
    pool: PgPool,
}

impl PublicationLifecycle {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Publish a job order. Requires at least one approved inspection under
    /// the order; anything less means there is nothing for the client to
    /// see yet.
    pub async fn publish(
        &self,
        job_order_id: i64,
        note: &str,
        actor: &User,
        ip: Option<String>,
    ) -> LifecycleResult<Publication> {
        guard::require_publisher(actor, "publish job order")?;

        let mut tx = self.pool.begin().await?;

        let order =
            sqlx::query_as::<_, JobOrder>("SELECT * FROM job_orders WHERE id = $1 FOR UPDATE")
                .bind(job_order_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(LifecycleError::NotFound {
                    entity: "job order",
                    id: job_order_id,
                })?;

        if order.status.is_terminal() {
            return Err(LifecycleError::InvalidTransition {
                entity: "job order",
                id: job_order_id,
                from: order.status.to_string(),
                to: JobOrderStatus::Published.to_string(),
            });
        }

        let approved: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM inspections i
            JOIN job_line_items li ON li.id = i.job_line_item_id
            WHERE li.job_order_id = $1 AND i.status = 'APPROVED'
            "#,
        )
        .bind(job_order_id)
        .fetch_one(&mut *tx)
        .await?;

        if approved == 0 {
            return Err(LifecycleError::NothingToPublish { id: job_order_id });
        }

        let published_certificates = sqlx::query(
            r#"
            UPDATE certificates SET status = 'PUBLISHED', updated_by = $2, updated_at = NOW()
            WHERE status = 'GENERATED' AND inspection_id IN (
                SELECT i.id FROM inspections i
                JOIN job_line_items li ON li.id = i.job_line_item_id
                WHERE li.job_order_id = $1
            )
            "#,
        )
        .bind(job_order_id)
        .bind(actor.id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let publication = sqlx::query_as::<_, Publication>(
            r#"
            INSERT INTO publications (
                job_order_id, published_by, published_at, status, note,
                created_by, updated_by
            )
            VALUES ($1, $2, NOW(), 'PUBLISHED', $3, $2, $2)
            RETURNING *
            "#,
        )
        .bind(job_order_id)
        .bind(actor.id)
        .bind(note)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE job_orders
            SET status = 'PUBLISHED', updated_by = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(job_order_id)
        .bind(actor.id)
        .execute(&mut *tx)
        .await?;

        AuditLogger::record(
            &mut *tx,
            NewAuditEntry {
                user_id: Some(actor.id),
                action: AuditAction::Publish,
                entity_type: AUDIT_ENTITY,
                entity_id: job_order_id,
                changes: json!({
                    "status": JobOrderStatus::Published.as_str(),
                    "note": note,
                }),
                ip_address: ip,
            },
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            "Published job order {} ({} certificates went live)",
            job_order_id,
            published_certificates
        );
        Ok(publication)
    }

    /// Revoke a published job order: certificates drop back to GENERATED
    /// and the order returns to COMPLETED.
    pub async fn revoke(
        &self,
        job_order_id: i64,
        note: &str,
        actor: &User,
        ip: Option<String>,
    ) -> LifecycleResult<Publication> {
        guard::require_publisher(actor, "revoke publication")?;

        let mut tx = self.pool.begin().await?;

        let order =
            sqlx::query_as::<_, JobOrder>("SELECT * FROM job_orders WHERE id = $1 FOR UPDATE")
                .bind(job_order_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(LifecycleError::NotFound {
                    entity: "job order",
                    id: job_order_id,
                })?;

        if order.status != JobOrderStatus::Published {
            return Err(LifecycleError::InvalidTransition {
                entity: "job order",
                id: job_order_id,
                from: order.status.to_string(),
                to: PublicationStatus::Revoked.to_string(),
            });
        }

        let publication = sqlx::query_as::<_, Publication>(
            r#"
            UPDATE publications
            SET status = 'REVOKED', note = $2, updated_by = $3, updated_at = NOW()
            WHERE id = (
                SELECT id FROM publications
                WHERE job_order_id = $1 AND status = 'PUBLISHED'
                ORDER BY published_at DESC
                LIMIT 1
            )
            RETURNING *
            "#,
        )
        .bind(job_order_id)
        .bind(note)
        .bind(actor.id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(LifecycleError::NotFound {
            entity: "publication",
            id: job_order_id,
        })?;

        sqlx::query(
            r#"
            UPDATE certificates SET status = 'GENERATED', updated_by = $2, updated_at = NOW()
            WHERE status = 'PUBLISHED' AND inspection_id IN (
                SELECT i.id FROM inspections i
                JOIN job_line_items li ON li.id = i.job_line_item_id
                WHERE li.job_order_id = $1
            )
            "#,
        )
        .bind(job_order_id)
        .bind(actor.id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE job_orders
            SET status = 'COMPLETED', updated_by = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(job_order_id)
        .bind(actor.id)
        .execute(&mut *tx)
        .await?;

        AuditLogger::record(
            &mut *tx,
            NewAuditEntry {
                user_id: Some(actor.id),
                action: AuditAction::Revoke,
                entity_type: AUDIT_ENTITY,
                entity_id: job_order_id,
                changes: json!({
                    "status": PublicationStatus::Revoked.as_str(),
                    "note": note,
                }),
                ip_address: ip,
            },
        )
        .await?;

        tx.commit().await?;

        tracing::info!("Revoked publication of job order {}", job_order_id);
        Ok(publication)
    }

    pub async fn list_for_job_order(
        &self,
        job_order_id: i64,
    ) -> anyhow::Result<Vec<Publication>> {
        sqlx::query_as::<_, Publication>(
            r#"
            SELECT * FROM publications
            WHERE job_order_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(job_order_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list publications")
    }
}
