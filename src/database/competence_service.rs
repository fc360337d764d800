//! Competence authorizations and their supporting evidence.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use sqlx::PgPool;

use crate::models::{
    AuthorizationLevel, AuthorizationStatus, CompetenceAuthorization, CompetenceEvidence,
    EvidenceType,
};

pub struct CompetenceService {
    pool: PgPool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateAuthorizationRequest {
    pub user_id: i64,
    pub service_id: Option<i64>,
    #[serde(default)]
    pub discipline: String,
    pub level: AuthorizationLevel,
    #[serde(default)]
    pub scope_notes: String,
    pub valid_from: Option<NaiveDate>,
    pub valid_until: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddEvidenceRequest {
    pub evidence_type: EvidenceType,
    #[serde(default)]
    pub issued_by: String,
    pub issued_on: Option<NaiveDate>,
    #[serde(default)]
    pub reference_code: String,
    pub document_uri: Option<String>,
    #[serde(default)]
    pub notes: String,
}

impl CompetenceService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_authorization(
        &self,
        req: CreateAuthorizationRequest,
        actor: i64,
    ) -> Result<CompetenceAuthorization> {
        let authorization = sqlx::query_as::<_, CompetenceAuthorization>(
            r#"
            INSERT INTO competence_authorizations (
                user_id, service_id, discipline, level, scope_notes,
                valid_from, valid_until, created_by, updated_by
            )
            VALUES ($1, $2, $3, $4, $5, COALESCE($6, CURRENT_DATE), $7, $8, $8)
            RETURNING *
            "#,
        )
        .bind(req.user_id)
        .bind(req.service_id)
        .bind(&req.discipline)
        .bind(req.level.as_str())
        .bind(&req.scope_notes)
        .bind(req.valid_from)
        .bind(req.valid_until)
        .bind(actor)
        .fetch_one(&self.pool)
        .await
        .context("Failed to create competence authorization")?;

        tracing::info!(
            "Authorized user {} at {} (authorization {})",
            authorization.user_id,
            authorization.level,
            authorization.id
        );
        Ok(authorization)
    }

    pub async fn find_authorization(&self, id: i64) -> Result<Option<CompetenceAuthorization>> {
        sqlx::query_as::<_, CompetenceAuthorization>(
            "SELECT * FROM competence_authorizations WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch competence authorization")
    }

    pub async fn list_for_user(&self, user_id: i64) -> Result<Vec<CompetenceAuthorization>> {
        sqlx::query_as::<_, CompetenceAuthorization>(
            r#"
            SELECT * FROM competence_authorizations
            WHERE user_id = $1
            ORDER BY valid_from DESC, id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list authorizations for user")
    }

    /// Authorizations valid today for a service and discipline, highest
    /// level first. Used when picking inspectors for scheduled work.
    /// The validity window check lives on the model, not in SQL; levels
    /// order by rank rather than by their text tokens.
    pub async fn list_valid_for_service(
        &self,
        service_id: i64,
        discipline: &str,
        today: NaiveDate,
    ) -> Result<Vec<CompetenceAuthorization>> {
        let mut authorizations = sqlx::query_as::<_, CompetenceAuthorization>(
            r#"
            SELECT * FROM competence_authorizations
            WHERE service_id = $1 AND discipline = $2 AND status = 'ACTIVE'
            ORDER BY user_id
            "#,
        )
        .bind(service_id)
        .bind(discipline)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list valid authorizations for service")?;

        authorizations.retain(|a| a.is_valid_on(today));
        authorizations.sort_by(|a, b| b.level.cmp(&a.level).then(a.user_id.cmp(&b.user_id)));
        Ok(authorizations)
    }

    pub async fn set_status(
        &self,
        id: i64,
        status: AuthorizationStatus,
        actor: i64,
    ) -> Result<Option<CompetenceAuthorization>> {
        let authorization = sqlx::query_as::<_, CompetenceAuthorization>(
            r#"
            UPDATE competence_authorizations
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
        .context("Failed to set authorization status")?;

        if let Some(ref a) = authorization {
            tracing::info!("Authorization {} set to {}", a.id, a.status);
        }
        Ok(authorization)
    }

    pub async fn record_assessment(
        &self,
        id: i64,
        assessed_on: NaiveDate,
        actor: i64,
    ) -> Result<Option<CompetenceAuthorization>> {
        sqlx::query_as::<_, CompetenceAuthorization>(
            r#"
            UPDATE competence_authorizations
            SET last_assessed = $2, updated_by = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(assessed_on)
        .bind(actor)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to record assessment")
    }

    pub async fn add_evidence(
        &self,
        authorization_id: i64,
        req: AddEvidenceRequest,
    ) -> Result<CompetenceEvidence> {
        sqlx::query_as::<_, CompetenceEvidence>(
            r#"
            INSERT INTO competence_evidence (
                authorization_id, evidence_type, issued_by, issued_on,
                reference_code, document_uri, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(authorization_id)
        .bind(req.evidence_type.as_str())
        .bind(&req.issued_by)
        .bind(req.issued_on)
        .bind(&req.reference_code)
        .bind(req.document_uri)
        .bind(&req.notes)
        .fetch_one(&self.pool)
        .await
        .context("Failed to add competence evidence")
    }

    pub async fn list_evidence(&self, authorization_id: i64) -> Result<Vec<CompetenceEvidence>> {
        sqlx::query_as::<_, CompetenceEvidence>(
            "SELECT * FROM competence_evidence WHERE authorization_id = $1 ORDER BY id",
        )
        .bind(authorization_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list competence evidence")
    }

    /// Flip ACTIVE authorizations whose validity window has closed to
    /// EXPIRED. Returns how many were expired.
    pub async fn expire_lapsed(&self, today: NaiveDate) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE competence_authorizations
            SET status = 'EXPIRED', updated_at = NOW()
            WHERE status = 'ACTIVE' AND valid_until IS NOT NULL AND valid_until < $1
            "#,
        )
        .bind(today)
        .execute(&self.pool)
        .await
        .context("Failed to expire lapsed authorizations")?;
        Ok(result.rows_affected())
    }
}
