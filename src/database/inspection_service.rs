//! Storage layer for inspections, answers, and photo references.
//!
//! Lifecycle transitions (assign, start, submit, approve, reject) live in
//! `lifecycle::inspection`; this service covers plain reads and writes that
//! carry no state-machine rules of their own.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;

use crate::models::{Inspection, InspectionAnswer, InspectionStatus, PhotoRef};

pub struct InspectionService {
    pool: PgPool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateInspectionRequest {
    pub job_line_item_id: i64,
    pub inspector_id: Option<i64>,
    #[serde(default)]
    pub checklist_template: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateInspectionRequest {
    pub checklist_template: Option<String>,
    pub geo_location_lat: Option<Decimal>,
    pub geo_location_lng: Option<Decimal>,
    pub inspector_signature_uri: Option<String>,
    pub client_signature_uri: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AttachPhotoRequest {
    pub answer_id: Option<i64>,
    pub file_uri: String,
    pub slot_name: String,
    pub geotag_lat: Option<Decimal>,
    pub geotag_lng: Option<Decimal>,
}

impl InspectionService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, req: CreateInspectionRequest, actor: i64) -> Result<Inspection> {
        let inspection = sqlx::query_as::<_, Inspection>(
            r#"
            INSERT INTO inspections (
                job_line_item_id, inspector_id, checklist_template,
                created_by, updated_by
            )
            VALUES ($1, $2, $3, $4, $4)
            RETURNING *
            "#,
        )
        .bind(req.job_line_item_id)
        .bind(req.inspector_id)
        .bind(&req.checklist_template)
        .bind(actor)
        .fetch_one(&self.pool)
        .await
        .context("Failed to create inspection")?;

        tracing::info!(
            "Created inspection {} on line item {}",
            inspection.id,
            inspection.job_line_item_id
        );
        Ok(inspection)
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Inspection>> {
        sqlx::query_as::<_, Inspection>("SELECT * FROM inspections WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch inspection")
    }

    pub async fn list(
        &self,
        inspector_id: Option<i64>,
        status: Option<InspectionStatus>,
    ) -> Result<Vec<Inspection>> {
        sqlx::query_as::<_, Inspection>(
            r#"
            SELECT * FROM inspections
            WHERE ($1::BIGINT IS NULL OR inspector_id = $1)
              AND ($2::TEXT IS NULL OR status = $2)
            ORDER BY created_at DESC
            "#,
        )
        .bind(inspector_id)
        .bind(status.map(|s| s.as_str().to_string()))
        .fetch_all(&self.pool)
        .await
        .context("Failed to list inspections")
    }

    pub async fn list_for_job_order(&self, job_order_id: i64) -> Result<Vec<Inspection>> {
        sqlx::query_as::<_, Inspection>(
            r#"
            SELECT i.* FROM inspections i
            JOIN job_line_items li ON li.id = i.job_line_item_id
            WHERE li.job_order_id = $1
            ORDER BY i.id
            "#,
        )
        .bind(job_order_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list inspections for job order")
    }

    /// Inspections visible to a portal account: approved work on the
    /// client record whose contact email matches the account's email.
    pub async fn list_for_client_user(&self, user_id: i64) -> Result<Vec<Inspection>> {
        sqlx::query_as::<_, Inspection>(
            r#"
            SELECT i.* FROM inspections i
            JOIN job_line_items li ON li.id = i.job_line_item_id
            JOIN job_orders jo ON jo.id = li.job_order_id
            JOIN clients c ON c.id = jo.client_id
            WHERE c.email = (SELECT email FROM users WHERE id = $1)
              AND i.status = 'APPROVED'
            ORDER BY i.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list inspections for client user")
    }

    /// Most recent approved inspections for a piece of equipment, newest
    /// first. Backs the public sticker lookup.
    pub async fn list_recent_approved_for_equipment(
        &self,
        equipment_id: i64,
        limit: i64,
    ) -> Result<Vec<Inspection>> {
        sqlx::query_as::<_, Inspection>(
            r#"
            SELECT i.* FROM inspections i
            JOIN job_line_items li ON li.id = i.job_line_item_id
            WHERE li.equipment_id = $1 AND i.status = 'APPROVED'
            ORDER BY i.updated_at DESC
            LIMIT $2
            "#,
        )
        .bind(equipment_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list approved inspections for equipment")
    }

    /// Update execution metadata. Callers gate this on the inspection still
    /// accepting answers.
    pub async fn update(
        &self,
        id: i64,
        req: UpdateInspectionRequest,
        actor: i64,
    ) -> Result<Option<Inspection>> {
        let inspection = sqlx::query_as::<_, Inspection>(
            r#"
            UPDATE inspections SET
                checklist_template = COALESCE($2, checklist_template),
                geo_location_lat = COALESCE($3, geo_location_lat),
                geo_location_lng = COALESCE($4, geo_location_lng),
                inspector_signature_uri = COALESCE($5, inspector_signature_uri),
                client_signature_uri = COALESCE($6, client_signature_uri),
                updated_by = $7,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(req.checklist_template)
        .bind(req.geo_location_lat)
        .bind(req.geo_location_lng)
        .bind(req.inspector_signature_uri)
        .bind(req.client_signature_uri)
        .bind(actor)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to update inspection")?;

        if let Some(ref i) = inspection {
            tracing::info!("Updated inspection {}", i.id);
        }
        Ok(inspection)
    }

    pub async fn list_answers(&self, inspection_id: i64) -> Result<Vec<InspectionAnswer>> {
        sqlx::query_as::<_, InspectionAnswer>(
            "SELECT * FROM inspection_answers WHERE inspection_id = $1 ORDER BY question_key",
        )
        .bind(inspection_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list answers")
    }

    /// Whether any answer on the inspection is NOT_SAFE. Drives the safe /
    /// not-safe verdict on certificates.
    pub async fn has_unsafe_answer(&self, inspection_id: i64) -> Result<bool> {
        let row: (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM inspection_answers
                WHERE inspection_id = $1 AND result = 'NOT_SAFE'
            )
            "#,
        )
        .bind(inspection_id)
        .fetch_one(&self.pool)
        .await
        .context("Failed to check for unsafe answers")?;
        Ok(row.0)
    }

    pub async fn attach_photo(
        &self,
        inspection_id: i64,
        req: AttachPhotoRequest,
    ) -> Result<PhotoRef> {
        let photo = sqlx::query_as::<_, PhotoRef>(
            r#"
            INSERT INTO photo_refs (
                inspection_id, answer_id, file_uri, slot_name, geotag_lat, geotag_lng
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(inspection_id)
        .bind(req.answer_id)
        .bind(&req.file_uri)
        .bind(&req.slot_name)
        .bind(req.geotag_lat)
        .bind(req.geotag_lng)
        .fetch_one(&self.pool)
        .await
        .context("Failed to attach photo")?;

        tracing::info!(
            "Attached photo {} to inspection {} (slot {})",
            photo.id,
            inspection_id,
            photo.slot_name
        );
        Ok(photo)
    }

    pub async fn list_photos(&self, inspection_id: i64) -> Result<Vec<PhotoRef>> {
        sqlx::query_as::<_, PhotoRef>(
            "SELECT * FROM photo_refs WHERE inspection_id = $1 ORDER BY id",
        )
        .bind(inspection_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list photos")
    }
}
