//! Equipment registry: the physical assets that get inspected.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;

use crate::models::Equipment;

pub struct EquipmentService {
    pool: PgPool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateEquipmentRequest {
    pub client_id: i64,
    pub tag_code: String,
    pub equipment_type: String,
    #[serde(default)]
    pub manufacturer: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub serial_number: String,
    pub swl: Option<Decimal>,
    #[serde(default)]
    pub location: String,
    pub next_due: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateEquipmentRequest {
    pub equipment_type: Option<String>,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub swl: Option<Decimal>,
    pub location: Option<String>,
    pub next_due: Option<NaiveDate>,
}

impl EquipmentService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, req: CreateEquipmentRequest, actor: i64) -> Result<Equipment> {
        let equipment = sqlx::query_as::<_, Equipment>(
            r#"
            INSERT INTO equipment (
                client_id, tag_code, equipment_type, manufacturer, model,
                serial_number, swl, location, next_due, created_by, updated_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10)
            RETURNING *
            "#,
        )
        .bind(req.client_id)
        .bind(&req.tag_code)
        .bind(&req.equipment_type)
        .bind(&req.manufacturer)
        .bind(&req.model)
        .bind(&req.serial_number)
        .bind(req.swl)
        .bind(&req.location)
        .bind(req.next_due)
        .bind(actor)
        .fetch_one(&self.pool)
        .await
        .context("Failed to create equipment")?;

        tracing::info!(
            "Registered equipment {} ({}) for client {}",
            equipment.id,
            equipment.tag_code,
            equipment.client_id
        );
        Ok(equipment)
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Equipment>> {
        sqlx::query_as::<_, Equipment>("SELECT * FROM equipment WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch equipment")
    }

    pub async fn find_by_tag_code(&self, tag_code: &str) -> Result<Option<Equipment>> {
        sqlx::query_as::<_, Equipment>("SELECT * FROM equipment WHERE tag_code = $1")
            .bind(tag_code)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch equipment by tag code")
    }

    pub async fn list(&self, client_id: Option<i64>) -> Result<Vec<Equipment>> {
        let rows = match client_id {
            Some(client_id) => {
                sqlx::query_as::<_, Equipment>(
                    "SELECT * FROM equipment WHERE client_id = $1 ORDER BY tag_code",
                )
                .bind(client_id)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, Equipment>("SELECT * FROM equipment ORDER BY tag_code")
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .context("Failed to list equipment")?;
        Ok(rows)
    }

    /// Equipment whose next inspection falls within `days` of `today`,
    /// including anything already overdue.
    pub async fn list_due_within(&self, today: NaiveDate, days: i64) -> Result<Vec<Equipment>> {
        let horizon = today + chrono::Duration::days(days);
        sqlx::query_as::<_, Equipment>(
            r#"
            SELECT * FROM equipment
            WHERE next_due IS NOT NULL AND next_due <= $1
            ORDER BY next_due, tag_code
            "#,
        )
        .bind(horizon)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list due equipment")
    }

    pub async fn update(
        &self,
        id: i64,
        req: UpdateEquipmentRequest,
        actor: i64,
    ) -> Result<Option<Equipment>> {
        let equipment = sqlx::query_as::<_, Equipment>(
            r#"
            UPDATE equipment SET
                equipment_type = COALESCE($2, equipment_type),
                manufacturer = COALESCE($3, manufacturer),
                model = COALESCE($4, model),
                serial_number = COALESCE($5, serial_number),
                swl = COALESCE($6, swl),
                location = COALESCE($7, location),
                next_due = COALESCE($8, next_due),
                updated_by = $9,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(req.equipment_type)
        .bind(req.manufacturer)
        .bind(req.model)
        .bind(req.serial_number)
        .bind(req.swl)
        .bind(req.location)
        .bind(req.next_due)
        .bind(actor)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to update equipment")?;

        if let Some(ref e) = equipment {
            tracing::info!("Updated equipment {}", e.id);
        }
        Ok(equipment)
    }

    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM equipment WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete equipment")?;
        Ok(result.rows_affected() > 0)
    }
}
