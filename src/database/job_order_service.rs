//! Job orders and their line items.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use sqlx::{PgPool, Row};

use crate::models::{
    FinanceStatus, JobLineItem, JobOrder, JobOrderStatus, JobOrderSummary, LineItemStatus,
};

pub struct JobOrderService {
    pool: PgPool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateJobOrderRequest {
    pub client_id: i64,
    #[serde(default)]
    pub po_reference: String,
    #[serde(default)]
    pub site_location: String,
    pub scheduled_start: Option<DateTime<Utc>>,
    pub scheduled_end: Option<DateTime<Utc>>,
    pub tentative_date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateJobOrderRequest {
    pub po_reference: Option<String>,
    pub site_location: Option<String>,
    pub scheduled_start: Option<DateTime<Utc>>,
    pub scheduled_end: Option<DateTime<Utc>>,
    pub tentative_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub invoice_number: Option<String>,
    pub finance_status: Option<FinanceStatus>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateLineItemRequest {
    pub equipment_id: Option<i64>,
    pub item_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
}

fn default_quantity() -> i32 {
    1
}

impl JobOrderService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, req: CreateJobOrderRequest, actor: i64) -> Result<JobOrder> {
        let order = sqlx::query_as::<_, JobOrder>(
            r#"
            INSERT INTO job_orders (
                client_id, po_reference, site_location, scheduled_start,
                scheduled_end, tentative_date, notes, created_by, updated_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
            RETURNING *
            "#,
        )
        .bind(req.client_id)
        .bind(&req.po_reference)
        .bind(&req.site_location)
        .bind(req.scheduled_start)
        .bind(req.scheduled_end)
        .bind(req.tentative_date)
        .bind(&req.notes)
        .bind(actor)
        .fetch_one(&self.pool)
        .await
        .context("Failed to create job order")?;

        tracing::info!(
            "Created job order {} for client {}",
            order.id,
            order.client_id
        );
        Ok(order)
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<JobOrder>> {
        sqlx::query_as::<_, JobOrder>("SELECT * FROM job_orders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch job order")
    }

    pub async fn list(
        &self,
        client_id: Option<i64>,
        status: Option<JobOrderStatus>,
    ) -> Result<Vec<JobOrder>> {
        let orders = sqlx::query_as::<_, JobOrder>(
            r#"
            SELECT * FROM job_orders
            WHERE ($1::BIGINT IS NULL OR client_id = $1)
              AND ($2::TEXT IS NULL OR status = $2)
            ORDER BY created_at DESC
            "#,
        )
        .bind(client_id)
        .bind(status.map(|s| s.as_str().to_string()))
        .fetch_all(&self.pool)
        .await
        .context("Failed to list job orders")?;
        Ok(orders)
    }

    /// Job orders visible to a portal account: those of the clients it
    /// registered itself.
    /// Orders an inspector is involved with: any order carrying an
    /// inspection assigned to them, plus orders they created.
    pub async fn list_for_inspector(&self, user_id: i64) -> Result<Vec<JobOrder>> {
        sqlx::query_as::<_, JobOrder>(
            r#"
            SELECT DISTINCT jo.* FROM job_orders jo
            LEFT JOIN job_line_items li ON li.job_order_id = jo.id
            LEFT JOIN inspections i ON i.job_line_item_id = li.id
            WHERE jo.created_by = $1 OR i.inspector_id = $1
            ORDER BY jo.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list job orders for inspector")
    }

    /// Orders visible to a portal account: those of the client record whose
    /// contact email matches the account's email.
    pub async fn list_for_client_user(&self, user_id: i64) -> Result<Vec<JobOrder>> {
        sqlx::query_as::<_, JobOrder>(
            r#"
            SELECT jo.* FROM job_orders jo
            JOIN clients c ON c.id = jo.client_id
            WHERE c.email = (SELECT email FROM users WHERE id = $1)
            ORDER BY jo.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list job orders for client user")
    }

    pub async fn update(
        &self,
        id: i64,
        req: UpdateJobOrderRequest,
        actor: i64,
    ) -> Result<Option<JobOrder>> {
        let order = sqlx::query_as::<_, JobOrder>(
            r#"
            UPDATE job_orders SET
                po_reference = COALESCE($2, po_reference),
                site_location = COALESCE($3, site_location),
                scheduled_start = COALESCE($4, scheduled_start),
                scheduled_end = COALESCE($5, scheduled_end),
                tentative_date = COALESCE($6, tentative_date),
                notes = COALESCE($7, notes),
                invoice_number = COALESCE($8, invoice_number),
                finance_status = COALESCE($9, finance_status),
                updated_by = $10,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(req.po_reference)
        .bind(req.site_location)
        .bind(req.scheduled_start)
        .bind(req.scheduled_end)
        .bind(req.tentative_date)
        .bind(req.notes)
        .bind(req.invoice_number)
        .bind(req.finance_status.map(|s| s.as_str().to_string()))
        .bind(actor)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to update job order")?;

        if let Some(ref o) = order {
            tracing::info!("Updated job order {}", o.id);
        }
        Ok(order)
    }

    /// Plain status write. Lifecycle rules (publication, terminal states)
    /// are enforced by the callers in `lifecycle`.
    pub async fn set_status(
        &self,
        id: i64,
        status: JobOrderStatus,
        actor: i64,
    ) -> Result<Option<JobOrder>> {
        sqlx::query_as::<_, JobOrder>(
            r#"
            UPDATE job_orders
            SET status = $2, updated_by = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status.as_str())
        .bind(actor)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to set job order status")
    }

    pub async fn add_line_item(
        &self,
        job_order_id: i64,
        req: CreateLineItemRequest,
        actor: i64,
    ) -> Result<JobLineItem> {
        let item = sqlx::query_as::<_, JobLineItem>(
            r#"
            INSERT INTO job_line_items (
                job_order_id, equipment_id, item_type, description, quantity,
                created_by, updated_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            RETURNING *
            "#,
        )
        .bind(job_order_id)
        .bind(req.equipment_id)
        .bind(&req.item_type)
        .bind(&req.description)
        .bind(req.quantity)
        .bind(actor)
        .fetch_one(&self.pool)
        .await
        .context("Failed to add line item")?;

        tracing::info!("Added line item {} to job order {}", item.id, job_order_id);
        Ok(item)
    }

    pub async fn find_line_item(&self, id: i64) -> Result<Option<JobLineItem>> {
        sqlx::query_as::<_, JobLineItem>("SELECT * FROM job_line_items WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch line item")
    }

    pub async fn list_line_items(&self, job_order_id: i64) -> Result<Vec<JobLineItem>> {
        sqlx::query_as::<_, JobLineItem>(
            "SELECT * FROM job_line_items WHERE job_order_id = $1 ORDER BY id",
        )
        .bind(job_order_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list line items")
    }

    pub async fn set_line_item_status(
        &self,
        id: i64,
        status: LineItemStatus,
        actor: i64,
    ) -> Result<Option<JobLineItem>> {
        sqlx::query_as::<_, JobLineItem>(
            r#"
            UPDATE job_line_items
            SET status = $2, updated_by = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status.as_str())
        .bind(actor)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to set line item status")
    }

    pub async fn delete_line_item(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM job_line_items WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete line item")?;
        Ok(result.rows_affected() > 0)
    }

    /// Aggregated inspection progress over all line items of a job order.
    pub async fn summary(&self, job_order_id: i64) -> Result<JobOrderSummary> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(DISTINCT li.id) AS line_item_count,
                COUNT(i.id) AS inspection_total,
                COUNT(i.id) FILTER (WHERE i.status = 'DRAFT') AS inspections_draft,
                COUNT(i.id) FILTER (WHERE i.status = 'IN_PROGRESS') AS inspections_in_progress,
                COUNT(i.id) FILTER (WHERE i.status = 'SUBMITTED') AS inspections_submitted,
                COUNT(i.id) FILTER (WHERE i.status = 'APPROVED') AS inspections_approved,
                COUNT(i.id) FILTER (WHERE i.status = 'REJECTED') AS inspections_rejected
            FROM job_line_items li
            LEFT JOIN inspections i ON i.job_line_item_id = li.id
            WHERE li.job_order_id = $1
            "#,
        )
        .bind(job_order_id)
        .fetch_one(&self.pool)
        .await
        .context("Failed to summarise job order")?;

        Ok(JobOrderSummary {
            job_order_id,
            line_item_count: row.try_get("line_item_count")?,
            inspection_total: row.try_get("inspection_total")?,
            inspections_draft: row.try_get("inspections_draft")?,
            inspections_in_progress: row.try_get("inspections_in_progress")?,
            inspections_submitted: row.try_get("inspections_submitted")?,
            inspections_approved: row.try_get("inspections_approved")?,
            inspections_rejected: row.try_get("inspections_rejected")?,
        })
    }
}
