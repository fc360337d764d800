//! Tool registry: categories, checkout and return, usage logs, incidents,
//! and calibration history.

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use sqlx::PgPool;

use crate::error::{LifecycleError, LifecycleResult};
use crate::models::{
    Calibration, IncidentSeverity, IncidentType, Tool, ToolAssignment, ToolAssignmentStatus,
    ToolAssignmentType, ToolCategory, ToolIncident, ToolStatus, ToolUsageLog,
};

pub struct ToolService {
    pool: PgPool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateToolCategoryRequest {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub requires_calibration: bool,
    pub calibration_interval_days: Option<i32>,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateToolRequest {
    pub name: String,
    pub serial_number: String,
    pub category_id: Option<i64>,
    #[serde(default)]
    pub location: String,
    pub calibration_due: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutToolRequest {
    pub assignment_type: ToolAssignmentType,
    pub assigned_user_id: Option<i64>,
    pub job_order_id: Option<i64>,
    pub equipment_id: Option<i64>,
    pub client_id: Option<i64>,
    pub expected_return: Option<NaiveDate>,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportIncidentRequest {
    pub incident_type: IncidentType,
    pub severity: IncidentSeverity,
    pub occurred_on: Option<NaiveDate>,
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecordCalibrationRequest {
    pub calibration_date: NaiveDate,
    pub next_due: NaiveDate,
    pub certificate_uri: Option<String>,
    #[serde(default)]
    pub notes: String,
}

impl ToolService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_category(
        &self,
        req: CreateToolCategoryRequest,
        actor: i64,
    ) -> Result<ToolCategory> {
        let category = sqlx::query_as::<_, ToolCategory>(
            r#"
            INSERT INTO tool_categories (
                code, name, description, requires_calibration,
                calibration_interval_days, notes, created_by, updated_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            RETURNING *
            "#,
        )
        .bind(&req.code)
        .bind(&req.name)
        .bind(&req.description)
        .bind(req.requires_calibration)
        .bind(req.calibration_interval_days)
        .bind(&req.notes)
        .bind(actor)
        .fetch_one(&self.pool)
        .await
        .context("Failed to create tool category")?;

        tracing::info!("Created tool category {} ({})", category.id, category.code);
        Ok(category)
    }

    pub async fn list_categories(&self) -> Result<Vec<ToolCategory>> {
        sqlx::query_as::<_, ToolCategory>("SELECT * FROM tool_categories ORDER BY code")
            .fetch_all(&self.pool)
            .await
            .context("Failed to list tool categories")
    }

    pub async fn create_tool(&self, req: CreateToolRequest, actor: i64) -> Result<Tool> {
        // New tools inherit the assignment mode of their category.
        let mode: Option<String> = match req.category_id {
            Some(category_id) => {
                sqlx::query_scalar(
                    "SELECT default_assignment_type FROM tool_categories WHERE id = $1",
                )
                .bind(category_id)
                .fetch_optional(&self.pool)
                .await
                .context("Failed to resolve tool category")?
            }
            None => None,
        };

        let tool = sqlx::query_as::<_, Tool>(
            r#"
            INSERT INTO tools (
                name, serial_number, category_id, assignment_mode, location,
                calibration_due, created_by, updated_by
            )
            VALUES ($1, $2, $3, COALESCE($4, 'INDIVIDUAL'), $5, $6, $7, $7)
            RETURNING *
            "#,
        )
        .bind(&req.name)
        .bind(&req.serial_number)
        .bind(req.category_id)
        .bind(mode)
        .bind(&req.location)
        .bind(req.calibration_due)
        .bind(actor)
        .fetch_one(&self.pool)
        .await
        .context("Failed to create tool")?;

        tracing::info!("Registered tool {} ({})", tool.id, tool.serial_number);
        Ok(tool)
    }

    pub async fn find_tool(&self, id: i64) -> Result<Option<Tool>> {
        sqlx::query_as::<_, Tool>("SELECT * FROM tools WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch tool")
    }

    pub async fn list_tools(
        &self,
        status: Option<ToolStatus>,
        category_id: Option<i64>,
    ) -> Result<Vec<Tool>> {
        sqlx::query_as::<_, Tool>(
            r#"
            SELECT * FROM tools
            WHERE ($1::TEXT IS NULL OR status = $1)
              AND ($2::BIGINT IS NULL OR category_id = $2)
            ORDER BY serial_number
            "#,
        )
        .bind(status.map(|s| s.as_str().to_string()))
        .bind(category_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list tools")
    }

    /// Tools whose calibration due date has passed.
    pub async fn list_calibration_overdue(&self, today: NaiveDate) -> Result<Vec<Tool>> {
        sqlx::query_as::<_, Tool>(
            r#"
            SELECT * FROM tools
            WHERE calibration_due IS NOT NULL AND calibration_due < $1
              AND status NOT IN ('LOST', 'RETIRED')
            ORDER BY calibration_due
            "#,
        )
        .bind(today)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list calibration-overdue tools")
    }

    /// Check a tool out against a user, job order, equipment, or client.
    /// The tool must be AVAILABLE and not overdue for calibration; the
    /// assignment and the CHECKOUT usage log commit together with the
    /// status flip.
    pub async fn checkout(
        &self,
        tool_id: i64,
        req: CheckoutToolRequest,
        actor: i64,
    ) -> LifecycleResult<ToolAssignment> {
        let mut tx = self.pool.begin().await?;

        let tool = sqlx::query_as::<_, Tool>("SELECT * FROM tools WHERE id = $1 FOR UPDATE")
            .bind(tool_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(LifecycleError::NotFound {
                entity: "tool",
                id: tool_id,
            })?;

        if tool.status != ToolStatus::Available {
            return Err(LifecycleError::InvalidTransition {
                entity: "tool",
                id: tool_id,
                from: tool.status.to_string(),
                to: ToolStatus::Assigned.to_string(),
            });
        }

        let today = Utc::now().date_naive();
        if tool.is_overdue_for_calibration(today) {
            return Err(LifecycleError::CalibrationOverdue {
                id: tool_id,
                due: tool.calibration_due.unwrap_or(today),
            });
        }

        let assignment = sqlx::query_as::<_, ToolAssignment>(
            r#"
            INSERT INTO tool_assignments (
                tool_id, assignment_type, assigned_user_id, job_order_id,
                equipment_id, client_id, expected_return, notes,
                created_by, updated_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
            RETURNING *
            "#,
        )
        .bind(tool_id)
        .bind(req.assignment_type.as_str())
        .bind(req.assigned_user_id)
        .bind(req.job_order_id)
        .bind(req.equipment_id)
        .bind(req.client_id)
        .bind(req.expected_return)
        .bind(&req.notes)
        .bind(actor)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE tools
            SET status = 'ASSIGNED', assigned_to = $2, updated_by = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(tool_id)
        .bind(req.assigned_user_id)
        .bind(actor)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO tool_usage_logs (tool_id, assignment_id, event_type, performed_by, notes)
            VALUES ($1, $2, 'CHECKOUT', $3, $4)
            "#,
        )
        .bind(tool_id)
        .bind(assignment.id)
        .bind(actor)
        .bind(&req.notes)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!("Checked out tool {} (assignment {})", tool_id, assignment.id);
        Ok(assignment)
    }

    /// Return a tool from an active assignment. LOST and DAMAGED outcomes
    /// keep the tool out of the available pool.
    pub async fn checkin(
        &self,
        assignment_id: i64,
        outcome: ToolAssignmentStatus,
        notes: &str,
        actor: i64,
    ) -> LifecycleResult<ToolAssignment> {
        if outcome == ToolAssignmentStatus::Active {
            return Err(LifecycleError::InvalidTransition {
                entity: "tool assignment",
                id: assignment_id,
                from: ToolAssignmentStatus::Active.to_string(),
                to: outcome.to_string(),
            });
        }

        let mut tx = self.pool.begin().await?;

        let assignment = sqlx::query_as::<_, ToolAssignment>(
            r#"
            UPDATE tool_assignments
            SET status = $2, returned_on = NOW(), notes = $3, updated_by = $4,
                updated_at = NOW()
            WHERE id = $1 AND status = 'ACTIVE'
            RETURNING *
            "#,
        )
        .bind(assignment_id)
        .bind(outcome.as_str())
        .bind(notes)
        .bind(actor)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(LifecycleError::NotFound {
            entity: "active tool assignment",
            id: assignment_id,
        })?;

        let tool_status = match outcome {
            ToolAssignmentStatus::Lost => ToolStatus::Lost,
            ToolAssignmentStatus::Damaged => ToolStatus::Maintenance,
            _ => ToolStatus::Available,
        };

        sqlx::query(
            r#"
            UPDATE tools
            SET status = $2, assigned_to = NULL, updated_by = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(assignment.tool_id)
        .bind(tool_status.as_str())
        .bind(actor)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO tool_usage_logs (tool_id, assignment_id, event_type, performed_by, notes)
            VALUES ($1, $2, 'CHECKIN', $3, $4)
            "#,
        )
        .bind(assignment.tool_id)
        .bind(assignment.id)
        .bind(actor)
        .bind(notes)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            "Checked in tool {} (assignment {}, outcome {})",
            assignment.tool_id,
            assignment.id,
            outcome
        );
        Ok(assignment)
    }

    pub async fn list_assignments(&self, tool_id: i64) -> Result<Vec<ToolAssignment>> {
        sqlx::query_as::<_, ToolAssignment>(
            "SELECT * FROM tool_assignments WHERE tool_id = $1 ORDER BY assigned_on DESC",
        )
        .bind(tool_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list tool assignments")
    }

    pub async fn list_usage(&self, tool_id: i64) -> Result<Vec<ToolUsageLog>> {
        sqlx::query_as::<_, ToolUsageLog>(
            "SELECT * FROM tool_usage_logs WHERE tool_id = $1 ORDER BY occurred_at DESC",
        )
        .bind(tool_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list tool usage")
    }

    pub async fn report_incident(
        &self,
        tool_id: i64,
        req: ReportIncidentRequest,
        actor: i64,
    ) -> Result<ToolIncident> {
        let incident = sqlx::query_as::<_, ToolIncident>(
            r#"
            INSERT INTO tool_incidents (
                tool_id, incident_type, severity, occurred_on, description,
                created_by, updated_by
            )
            VALUES ($1, $2, $3, COALESCE($4, CURRENT_DATE), $5, $6, $6)
            RETURNING *
            "#,
        )
        .bind(tool_id)
        .bind(req.incident_type.as_str())
        .bind(req.severity.as_str())
        .bind(req.occurred_on)
        .bind(&req.description)
        .bind(actor)
        .fetch_one(&self.pool)
        .await
        .context("Failed to report tool incident")?;

        // A loss report takes the tool out of circulation immediately.
        if req.incident_type == IncidentType::Loss {
            sqlx::query(
                "UPDATE tools SET status = 'LOST', updated_by = $2, updated_at = NOW() WHERE id = $1",
            )
            .bind(tool_id)
            .bind(actor)
            .execute(&self.pool)
            .await
            .context("Failed to mark tool lost")?;
        }

        tracing::warn!(
            "Incident {} ({}) reported on tool {}",
            incident.id,
            incident.incident_type,
            tool_id
        );
        Ok(incident)
    }

    pub async fn resolve_incident(
        &self,
        incident_id: i64,
        resolution_notes: &str,
        actor: i64,
    ) -> Result<Option<ToolIncident>> {
        sqlx::query_as::<_, ToolIncident>(
            r#"
            UPDATE tool_incidents
            SET resolved_on = CURRENT_DATE, resolution_notes = $2, updated_by = $3,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(incident_id)
        .bind(resolution_notes)
        .bind(actor)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to resolve tool incident")
    }

    pub async fn list_incidents(&self, tool_id: Option<i64>) -> Result<Vec<ToolIncident>> {
        sqlx::query_as::<_, ToolIncident>(
            r#"
            SELECT * FROM tool_incidents
            WHERE ($1::BIGINT IS NULL OR tool_id = $1)
            ORDER BY occurred_on DESC, id DESC
            "#,
        )
        .bind(tool_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list tool incidents")
    }

    /// Record a calibration and roll the tool's due date forward. A tool
    /// parked in CALIBRATION status returns to AVAILABLE.
    pub async fn record_calibration(
        &self,
        tool_id: i64,
        req: RecordCalibrationRequest,
        actor: i64,
    ) -> LifecycleResult<Calibration> {
        let mut tx = self.pool.begin().await?;

        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM tools WHERE id = $1)")
            .bind(tool_id)
            .fetch_one(&mut *tx)
            .await?;
        if !exists {
            return Err(LifecycleError::NotFound {
                entity: "tool",
                id: tool_id,
            });
        }

        let calibration = sqlx::query_as::<_, Calibration>(
            r#"
            INSERT INTO calibrations (
                tool_id, calibration_date, next_due, certificate_uri, notes,
                created_by, updated_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            RETURNING *
            "#,
        )
        .bind(tool_id)
        .bind(req.calibration_date)
        .bind(req.next_due)
        .bind(req.certificate_uri)
        .bind(&req.notes)
        .bind(actor)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE tools
            SET calibration_due = $2,
                status = CASE WHEN status = 'CALIBRATION' THEN 'AVAILABLE' ELSE status END,
                updated_by = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(tool_id)
        .bind(req.next_due)
        .bind(actor)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO tool_usage_logs (tool_id, event_type, performed_by, notes)
            VALUES ($1, 'CALIBRATION', $2, $3)
            "#,
        )
        .bind(tool_id)
        .bind(actor)
        .bind(&req.notes)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            "Recorded calibration for tool {}, next due {}",
            tool_id,
            req.next_due
        );
        Ok(calibration)
    }

    pub async fn list_calibrations(&self, tool_id: i64) -> Result<Vec<Calibration>> {
        sqlx::query_as::<_, Calibration>(
            "SELECT * FROM calibrations WHERE tool_id = $1 ORDER BY calibration_date DESC",
        )
        .bind(tool_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list calibrations")
    }
}
