//! Inspection lifecycle transitions.
//!
//! Every transition locks the inspection row, checks the caller's role and
//! the version token, applies the status change, and appends the audit
//! trail inside the same transaction. A stale version token means another
//! transition landed first; the caller gets a conflict and must reload.

use std::collections::BTreeSet;

use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;

use crate::checklist::ChecklistRegistry;
use crate::database::audit_log::{AuditAction, AuditLogger, NewAuditEntry};
use crate::error::{LifecycleError, LifecycleResult};
use crate::lifecycle::guard;
use crate::models::{
    AnswerResult, ApprovalDecision, Inspection, InspectionAnswer, InspectionStatus, JobLineItem,
    JobOrder, LineItemStatus, User,
};

const AUDIT_ENTITY: &str = "INSPECTION";

#[derive(Debug, Clone, Deserialize)]
pub struct RecordAnswerRequest {
    pub question_key: String,
    pub result: AnswerResult,
    #[serde(default)]
    pub comment: String,
}

pub struct InspectionLifecycle {
    pool: PgPool,
}

impl InspectionLifecycle {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn lock_inspection(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        inspection_id: i64,
    ) -> LifecycleResult<Inspection> {
        sqlx::query_as::<_, Inspection>("SELECT * FROM inspections WHERE id = $1 FOR UPDATE")
            .bind(inspection_id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or(LifecycleError::NotFound {
                entity: "inspection",
                id: inspection_id,
            })
    }

    fn check_version(inspection: &Inspection, expected_version: i32) -> LifecycleResult<()> {
        if inspection.version == expected_version {
            Ok(())
        } else {
            Err(LifecycleError::VersionConflict {
                entity: "inspection",
                id: inspection.id,
            })
        }
    }

    async fn write_status(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        inspection: &Inspection,
        to: InspectionStatus,
        set_start: bool,
        set_end: bool,
        actor: &User,
    ) -> LifecycleResult<Inspection> {
        let updated = sqlx::query_as::<_, Inspection>(
            r#"
            UPDATE inspections
            SET status = $3,
                version = version + 1,
                start_time = CASE WHEN $4 THEN NOW() ELSE start_time END,
                end_time = CASE WHEN $5 THEN NOW() ELSE end_time END,
                updated_by = $6,
                updated_at = NOW()
            WHERE id = $1 AND version = $2
            RETURNING *
            "#,
        )
        .bind(inspection.id)
        .bind(inspection.version)
        .bind(to.as_str())
        .bind(set_start)
        .bind(set_end)
        .bind(actor.id)
        .fetch_optional(&mut **tx)
        .await?
        // The row is locked, so a missed swap here cannot happen; treat it
        // as a conflict anyway rather than panic.
        .ok_or(LifecycleError::VersionConflict {
            entity: "inspection",
            id: inspection.id,
        })?;
        Ok(updated)
    }

    async fn write_line_item_status(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        line_item_id: i64,
        status: LineItemStatus,
        actor: &User,
    ) -> LifecycleResult<()> {
        sqlx::query(
            r#"
            UPDATE job_line_items
            SET status = $2, updated_by = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(line_item_id)
        .bind(status.as_str())
        .bind(actor.id)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    async fn audit_status(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        inspection_id: i64,
        to: InspectionStatus,
        actor: &User,
        ip: Option<String>,
    ) -> LifecycleResult<()> {
        AuditLogger::record(
            &mut **tx,
            NewAuditEntry {
                user_id: Some(actor.id),
                action: AuditAction::Update,
                entity_type: AUDIT_ENTITY,
                entity_id: inspection_id,
                changes: json!({ "status": to.as_str() }),
                ip_address: ip,
            },
        )
        .await?;
        Ok(())
    }

    /// Put an inspector on a draft inspection and mark its line item
    /// ASSIGNED.
    pub async fn assign(
        &self,
        inspection_id: i64,
        inspector_id: i64,
        expected_version: i32,
        actor: &User,
        ip: Option<String>,
    ) -> LifecycleResult<Inspection> {
        guard::require_inspector(actor, "assign inspection")?;

        let mut tx = self.pool.begin().await?;
        let inspection = Self::lock_inspection(&mut tx, inspection_id).await?;
        Self::check_version(&inspection, expected_version)?;

        if inspection.status != InspectionStatus::Draft {
            return Err(LifecycleError::ExecutionClosed {
                entity: "inspection",
                id: inspection_id,
                status: inspection.status.to_string(),
            });
        }

        let updated = sqlx::query_as::<_, Inspection>(
            r#"
            UPDATE inspections
            SET inspector_id = $3, version = version + 1, updated_by = $4, updated_at = NOW()
            WHERE id = $1 AND version = $2
            RETURNING *
            "#,
        )
        .bind(inspection_id)
        .bind(inspection.version)
        .bind(inspector_id)
        .bind(actor.id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(LifecycleError::VersionConflict {
            entity: "inspection",
            id: inspection_id,
        })?;

        Self::write_line_item_status(
            &mut tx,
            inspection.job_line_item_id,
            LineItemStatus::Assigned,
            actor,
        )
        .await?;

        AuditLogger::record(
            &mut *tx,
            NewAuditEntry {
                user_id: Some(actor.id),
                action: AuditAction::Update,
                entity_type: AUDIT_ENTITY,
                entity_id: inspection_id,
                changes: json!({ "inspector_id": inspector_id }),
                ip_address: ip,
            },
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            "Assigned inspection {} to inspector {}",
            inspection_id,
            inspector_id
        );
        Ok(updated)
    }

    /// Create DRAFT inspections for a job order's line items and put them on
    /// an inspector. An empty item set targets every line item on the order.
    /// Items that already carry an inspection are skipped, so the call can
    /// be replayed with a widening item set. Returns the ids of the
    /// inspections it created.
    pub async fn assign_line_items(
        &self,
        job_order_id: i64,
        inspector_id: i64,
        line_item_ids: &[i64],
        actor: &User,
        ip: Option<String>,
    ) -> LifecycleResult<Vec<i64>> {
        guard::require_scheduler(actor, "assign line items")?;

        let mut tx = self.pool.begin().await?;

        // The order row lock serializes concurrent bulk assigns, keeping the
        // lacks-an-inspection check below race free.
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
            return Err(LifecycleError::ExecutionClosed {
                entity: "job order",
                id: job_order_id,
                status: order.status.to_string(),
            });
        }

        // The target must be someone who can execute inspections; a missing
        // user and a portal account answer the same way.
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(inspector_id)
            .fetch_optional(&mut *tx)
            .await?
            .filter(|u| guard::INSPECTOR_ROLES.contains(&u.role))
            .ok_or(LifecycleError::NotFound {
                entity: "inspector",
                id: inspector_id,
            })?;

        let items = if line_item_ids.is_empty() {
            sqlx::query_as::<_, JobLineItem>(
                "SELECT * FROM job_line_items WHERE job_order_id = $1 ORDER BY id",
            )
            .bind(job_order_id)
            .fetch_all(&mut *tx)
            .await?
        } else {
            let requested: BTreeSet<i64> = line_item_ids.iter().copied().collect();
            let ids: Vec<i64> = requested.iter().copied().collect();
            let items =
                sqlx::query_as::<_, JobLineItem>("SELECT * FROM job_line_items WHERE id = ANY($1)")
                    .bind(&ids)
                    .fetch_all(&mut *tx)
                    .await?;
            if let Some(missing) = requested
                .iter()
                .find(|id| !items.iter().any(|item| item.id == **id))
            {
                return Err(LifecycleError::NotFound {
                    entity: "line item",
                    id: *missing,
                });
            }
            for item in &items {
                if item.job_order_id != job_order_id {
                    return Err(LifecycleError::LineItemMismatch {
                        line_item_id: item.id,
                        job_order_id,
                    });
                }
            }
            items
        };

        let item_ids: Vec<i64> = items.iter().map(|item| item.id).collect();
        let covered: Vec<i64> = sqlx::query_scalar(
            "SELECT DISTINCT job_line_item_id FROM inspections WHERE job_line_item_id = ANY($1)",
        )
        .bind(&item_ids)
        .fetch_all(&mut *tx)
        .await?;

        let mut created = Vec::new();
        for item in items.iter().filter(|item| !covered.contains(&item.id)) {
            let inspection_id: i64 = sqlx::query_scalar(
                r#"
                INSERT INTO inspections (job_line_item_id, inspector_id, created_by, updated_by)
                VALUES ($1, $2, $3, $3)
                RETURNING id
                "#,
            )
            .bind(item.id)
            .bind(inspector_id)
            .bind(actor.id)
            .fetch_one(&mut *tx)
            .await?;

            Self::write_line_item_status(&mut tx, item.id, LineItemStatus::Assigned, actor)
                .await?;

            AuditLogger::record(
                &mut *tx,
                NewAuditEntry {
                    user_id: Some(actor.id),
                    action: AuditAction::Create,
                    entity_type: AUDIT_ENTITY,
                    entity_id: inspection_id,
                    changes: json!({
                        "job_line_item_id": item.id,
                        "inspector_id": inspector_id,
                    }),
                    ip_address: ip.clone(),
                },
            )
            .await?;

            created.push(inspection_id);
        }

        tx.commit().await?;

        tracing::info!(
            "Assigned {} line items on job order {} to inspector {} ({} inspections created)",
            item_ids.len(),
            job_order_id,
            inspector_id,
            created.len()
        );
        Ok(created)
    }

    /// DRAFT -> IN_PROGRESS. Stamps the start time.
    pub async fn start(
        &self,
        inspection_id: i64,
        expected_version: i32,
        actor: &User,
        ip: Option<String>,
    ) -> LifecycleResult<Inspection> {
        guard::require_inspector(actor, "start inspection")?;

        let mut tx = self.pool.begin().await?;
        let inspection = Self::lock_inspection(&mut tx, inspection_id).await?;
        guard::require_owner_or_admin(actor, &inspection)?;
        Self::check_version(&inspection, expected_version)?;
        guard::require_transition(&inspection, InspectionStatus::InProgress)?;

        let updated = Self::write_status(
            &mut tx,
            &inspection,
            InspectionStatus::InProgress,
            true,
            false,
            actor,
        )
        .await?;

        Self::write_line_item_status(
            &mut tx,
            inspection.job_line_item_id,
            LineItemStatus::InProgress,
            actor,
        )
        .await?;

        Self::audit_status(&mut tx, inspection_id, InspectionStatus::InProgress, actor, ip)
            .await?;

        tx.commit().await?;

        tracing::info!("Started inspection {}", inspection_id);
        Ok(updated)
    }

    /// IN_PROGRESS -> SUBMITTED. Stamps the end time and hands the
    /// inspection to the approval queue.
    pub async fn submit(
        &self,
        inspection_id: i64,
        expected_version: i32,
        actor: &User,
        ip: Option<String>,
    ) -> LifecycleResult<Inspection> {
        guard::require_inspector(actor, "submit inspection")?;

        let mut tx = self.pool.begin().await?;
        let inspection = Self::lock_inspection(&mut tx, inspection_id).await?;
        guard::require_owner_or_admin(actor, &inspection)?;
        Self::check_version(&inspection, expected_version)?;
        guard::require_transition(&inspection, InspectionStatus::Submitted)?;

        let updated = Self::write_status(
            &mut tx,
            &inspection,
            InspectionStatus::Submitted,
            false,
            true,
            actor,
        )
        .await?;

        Self::audit_status(&mut tx, inspection_id, InspectionStatus::Submitted, actor, ip)
            .await?;

        tx.commit().await?;

        tracing::info!("Submitted inspection {}", inspection_id);
        Ok(updated)
    }

    /// SUBMITTED -> APPROVED. Records the approval decision and completes
    /// the line item.
    pub async fn approve(
        &self,
        inspection_id: i64,
        expected_version: i32,
        comment: &str,
        actor: &User,
        ip: Option<String>,
    ) -> LifecycleResult<Inspection> {
        self.decide(
            inspection_id,
            expected_version,
            ApprovalDecision::Approved,
            comment,
            actor,
            ip,
        )
        .await
    }

    /// SUBMITTED -> REJECTED. A comment explaining the rejection is
    /// mandatory.
    pub async fn reject(
        &self,
        inspection_id: i64,
        expected_version: i32,
        comment: &str,
        actor: &User,
        ip: Option<String>,
    ) -> LifecycleResult<Inspection> {
        if comment.trim().is_empty() {
            return Err(LifecycleError::MissingComment);
        }
        self.decide(
            inspection_id,
            expected_version,
            ApprovalDecision::Rejected,
            comment,
            actor,
            ip,
        )
        .await
    }

    async fn decide(
        &self,
        inspection_id: i64,
        expected_version: i32,
        decision: ApprovalDecision,
        comment: &str,
        actor: &User,
        ip: Option<String>,
    ) -> LifecycleResult<Inspection> {
        guard::require_approver(actor, "decide inspection")?;

        let (to, audit_action) = match decision {
            ApprovalDecision::Approved => (InspectionStatus::Approved, AuditAction::Approve),
            ApprovalDecision::Rejected => (InspectionStatus::Rejected, AuditAction::Reject),
            ApprovalDecision::Pending => {
                return Err(LifecycleError::InvalidTransition {
                    entity: "inspection",
                    id: inspection_id,
                    from: InspectionStatus::Submitted.to_string(),
                    to: "PENDING".to_string(),
                })
            }
        };

        let mut tx = self.pool.begin().await?;
        let inspection = Self::lock_inspection(&mut tx, inspection_id).await?;
        Self::check_version(&inspection, expected_version)?;
        guard::require_transition(&inspection, to)?;

        let updated =
            Self::write_status(&mut tx, &inspection, to, false, false, actor).await?;

        sqlx::query(
            r#"
            INSERT INTO approvals (entity_type, entity_id, approver_id, decision, comment, decided_at)
            VALUES ('INSPECTION', $1, $2, $3, $4, NOW())
            "#,
        )
        .bind(inspection_id)
        .bind(actor.id)
        .bind(decision.as_str())
        .bind(comment)
        .execute(&mut *tx)
        .await?;

        if decision == ApprovalDecision::Approved {
            Self::write_line_item_status(
                &mut tx,
                inspection.job_line_item_id,
                LineItemStatus::Completed,
                actor,
            )
            .await?;
        }

        Self::audit_status(&mut tx, inspection_id, to, actor, ip.clone()).await?;
        AuditLogger::record(
            &mut *tx,
            NewAuditEntry {
                user_id: Some(actor.id),
                action: audit_action,
                entity_type: AUDIT_ENTITY,
                entity_id: inspection_id,
                changes: json!({ "decision": decision.as_str(), "comment": comment }),
                ip_address: ip,
            },
        )
        .await?;

        tx.commit().await?;

        tracing::info!("Inspection {} decided: {}", inspection_id, decision);
        Ok(updated)
    }

    /// Record one checklist answer. The inspection must still be in
    /// execution and the question must belong to its checklist template.
    pub async fn record_answer(
        &self,
        registry: &ChecklistRegistry,
        inspection_id: i64,
        req: &RecordAnswerRequest,
    ) -> LifecycleResult<InspectionAnswer> {
        let inspection = sqlx::query_as::<_, Inspection>("SELECT * FROM inspections WHERE id = $1")
            .bind(inspection_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(LifecycleError::NotFound {
                entity: "inspection",
                id: inspection_id,
            })?;

        if !inspection.status.accepts_answers() {
            return Err(LifecycleError::ExecutionClosed {
                entity: "inspection",
                id: inspection_id,
                status: inspection.status.to_string(),
            });
        }

        registry.validate_question(&inspection.checklist_template, &req.question_key)?;

        let answer = sqlx::query_as::<_, InspectionAnswer>(
            r#"
            INSERT INTO inspection_answers (inspection_id, question_key, result, comment)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (inspection_id, question_key)
            DO UPDATE SET result = EXCLUDED.result, comment = EXCLUDED.comment,
                          updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(inspection_id)
        .bind(&req.question_key)
        .bind(req.result.as_str())
        .bind(&req.comment)
        .fetch_one(&self.pool)
        .await?;

        Ok(answer)
    }
}
