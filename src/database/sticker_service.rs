//! QR sticker inventory: batch generation, assignment, public resolution.

use anyhow::{Context, Result};
use sqlx::PgPool;

use crate::error::{LifecycleError, LifecycleResult};
use crate::models::{format_sticker_code, parse_sticker_sequence, Sticker, StickerStatus};

/// Largest batch a single generate call may produce.
pub const MAX_BATCH_SIZE: i64 = 1000;

pub struct StickerService {
    pool: PgPool,
}

impl StickerService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Generate a batch of stickers, numbering on from the highest existing
    /// code. The QR payload points at the public resolve endpoint.
    pub async fn generate_batch(
        &self,
        count: i64,
        public_base_url: &str,
        actor: i64,
    ) -> LifecycleResult<Vec<Sticker>> {
        if !(1..=MAX_BATCH_SIZE).contains(&count) {
            return Err(LifecycleError::StickerBatchSize(count));
        }

        let mut tx = self.pool.begin().await?;

        // Codes are fixed-width, so MAX() over the text column yields the
        // highest sequence.
        let last_code: Option<String> =
            sqlx::query_scalar("SELECT MAX(sticker_code) FROM stickers")
                .fetch_one(&mut *tx)
                .await?;
        let start = last_code
            .as_deref()
            .and_then(parse_sticker_sequence)
            .unwrap_or(0)
            + 1;

        let mut stickers = Vec::with_capacity(count as usize);
        for sequence in start..start + count {
            let code = format_sticker_code(sequence);
            let qr_payload = format!("{}/public/stickers/{}", public_base_url, code);
            let sticker = sqlx::query_as::<_, Sticker>(
                r#"
                INSERT INTO stickers (sticker_code, qr_payload, created_by, updated_by)
                VALUES ($1, $2, $3, $3)
                RETURNING *
                "#,
            )
            .bind(&code)
            .bind(&qr_payload)
            .bind(actor)
            .fetch_one(&mut *tx)
            .await?;
            stickers.push(sticker);
        }

        tx.commit().await?;

        tracing::info!(
            "Generated {} stickers ({} .. {})",
            count,
            format_sticker_code(start),
            format_sticker_code(start + count - 1)
        );
        Ok(stickers)
    }

    /// Bind an available sticker to a piece of equipment. Any sticker
    /// already assigned to that equipment is retired to HISTORICAL.
    pub async fn assign(
        &self,
        sticker_id: i64,
        equipment_id: i64,
        actor: i64,
    ) -> LifecycleResult<Sticker> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, Sticker>("SELECT * FROM stickers WHERE id = $1")
            .bind(sticker_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(LifecycleError::NotFound {
                entity: "sticker",
                id: sticker_id,
            })?;

        if current.status != StickerStatus::Available {
            return Err(LifecycleError::InvalidTransition {
                entity: "sticker",
                id: sticker_id,
                from: current.status.to_string(),
                to: StickerStatus::Assigned.to_string(),
            });
        }

        sqlx::query(
            r#"
            UPDATE stickers
            SET status = 'HISTORICAL', updated_by = $2, updated_at = NOW()
            WHERE assigned_equipment_id = $1 AND status = 'ASSIGNED'
            "#,
        )
        .bind(equipment_id)
        .bind(actor)
        .execute(&mut *tx)
        .await?;

        let sticker = sqlx::query_as::<_, Sticker>(
            r#"
            UPDATE stickers
            SET status = 'ASSIGNED', assigned_equipment_id = $2, assigned_at = NOW(),
                assigned_by = $3, updated_by = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(sticker_id)
        .bind(equipment_id)
        .bind(actor)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            "Assigned sticker {} to equipment {}",
            sticker.sticker_code,
            equipment_id
        );
        Ok(sticker)
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Sticker>> {
        sqlx::query_as::<_, Sticker>("SELECT * FROM stickers WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch sticker")
    }

    pub async fn find_by_code(&self, code: &str) -> Result<Option<Sticker>> {
        sqlx::query_as::<_, Sticker>("SELECT * FROM stickers WHERE sticker_code = $1")
            .bind(code)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch sticker by code")
    }

    pub async fn list(&self, status: Option<StickerStatus>) -> Result<Vec<Sticker>> {
        sqlx::query_as::<_, Sticker>(
            r#"
            SELECT * FROM stickers
            WHERE ($1::TEXT IS NULL OR status = $1)
            ORDER BY sticker_code
            "#,
        )
        .bind(status.map(|s| s.as_str().to_string()))
        .fetch_all(&self.pool)
        .await
        .context("Failed to list stickers")
    }
}
