//! Service master registry and versioned governance records.
//!
//! Version numbers are allocated per service inside the insert itself; the
//! UNIQUE (service_id, version_number) constraint backstops concurrent
//! drafts. Publishing a version pins it as the service's current version.

use anyhow::{Context, Result};
use serde::Deserialize;
use sqlx::PgPool;

use crate::models::{
    ChecklistLevel, RequirementLevel, Service, ServiceCategory, ServiceStatus, ServiceVersion,
    StickerPolicy,
};

pub struct ServiceRegistry {
    pool: PgPool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateServiceRequest {
    pub code: String,
    pub name_en: String,
    #[serde(default)]
    pub name_ar: String,
    pub category: ServiceCategory,
    #[serde(default)]
    pub discipline: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateServiceRequest {
    pub name_en: Option<String>,
    pub name_ar: Option<String>,
    pub discipline: Option<String>,
    pub status: Option<ServiceStatus>,
    pub description: Option<String>,
}

fn default_requirement() -> RequirementLevel {
    RequirementLevel::NotRequired
}

fn default_checklist_level() -> ChecklistLevel {
    ChecklistLevel::Simplified
}

fn default_sticker_policy() -> StickerPolicy {
    StickerPolicy::NotApplicable
}

fn empty_json_array() -> serde_json::Value {
    serde_json::Value::Array(Vec::new())
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateServiceVersionRequest {
    #[serde(default = "default_requirement")]
    pub requires_equipment: RequirementLevel,
    #[serde(default = "default_requirement")]
    pub requires_person: RequirementLevel,
    #[serde(default)]
    pub checklist_template: String,
    #[serde(default = "default_checklist_level")]
    pub default_checklist_level: ChecklistLevel,
    #[serde(default = "default_checklist_level")]
    pub minimum_checklist_level: ChecklistLevel,
    #[serde(default)]
    pub allow_bulk_all_ok: bool,
    #[serde(default)]
    pub require_photo_evidence: bool,
    #[serde(default)]
    pub require_document_evidence: bool,
    #[serde(default = "default_sticker_policy")]
    pub sticker_policy: StickerPolicy,
    #[serde(default)]
    pub approval_required: bool,
    #[serde(default = "empty_json_array")]
    pub approver_roles: serde_json::Value,
    pub validity_max_months: Option<i32>,
    #[serde(default = "empty_json_array")]
    pub validity_options: serde_json::Value,
    #[serde(default = "empty_json_array")]
    pub output_definitions: serde_json::Value,
    #[serde(default = "empty_json_array")]
    pub standards: serde_json::Value,
    #[serde(default)]
    pub notes: String,
}

impl ServiceRegistry {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, req: CreateServiceRequest, actor: i64) -> Result<Service> {
        let service = sqlx::query_as::<_, Service>(
            r#"
            INSERT INTO services (
                code, name_en, name_ar, category, discipline, description,
                created_by, updated_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            RETURNING *
            "#,
        )
        .bind(&req.code)
        .bind(&req.name_en)
        .bind(&req.name_ar)
        .bind(req.category.as_str())
        .bind(&req.discipline)
        .bind(&req.description)
        .bind(actor)
        .fetch_one(&self.pool)
        .await
        .context("Failed to create service")?;

        tracing::info!("Created service {} ({})", service.id, service.code);
        Ok(service)
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Service>> {
        sqlx::query_as::<_, Service>("SELECT * FROM services WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch service")
    }

    pub async fn find_by_code(&self, code: &str) -> Result<Option<Service>> {
        sqlx::query_as::<_, Service>("SELECT * FROM services WHERE code = $1")
            .bind(code)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch service by code")
    }

    pub async fn list(&self, category: Option<ServiceCategory>) -> Result<Vec<Service>> {
        let services = match category {
            Some(category) => {
                sqlx::query_as::<_, Service>(
                    "SELECT * FROM services WHERE category = $1 ORDER BY code",
                )
                .bind(category.as_str())
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, Service>("SELECT * FROM services ORDER BY code")
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .context("Failed to list services")?;
        Ok(services)
    }

    pub async fn update(
        &self,
        id: i64,
        req: UpdateServiceRequest,
        actor: i64,
    ) -> Result<Option<Service>> {
        let service = sqlx::query_as::<_, Service>(
            r#"
            UPDATE services SET
                name_en = COALESCE($2, name_en),
                name_ar = COALESCE($3, name_ar),
                discipline = COALESCE($4, discipline),
                status = COALESCE($5, status),
                description = COALESCE($6, description),
                updated_by = $7,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(req.name_en)
        .bind(req.name_ar)
        .bind(req.discipline)
        .bind(req.status.map(|s| s.as_str().to_string()))
        .bind(req.description)
        .bind(actor)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to update service")?;

        if let Some(ref s) = service {
            tracing::info!("Updated service {}", s.id);
        }
        Ok(service)
    }

    /// Create a new draft version. The version number continues the
    /// service's sequence.
    pub async fn create_version(
        &self,
        service_id: i64,
        req: CreateServiceVersionRequest,
        actor: i64,
    ) -> Result<ServiceVersion> {
        let version = sqlx::query_as::<_, ServiceVersion>(
            r#"
            INSERT INTO service_versions (
                service_id, version_number,
                requires_equipment, requires_person,
                checklist_template, default_checklist_level, minimum_checklist_level,
                allow_bulk_all_ok, require_photo_evidence, require_document_evidence,
                sticker_policy, approval_required, approver_roles,
                validity_max_months, validity_options, output_definitions,
                standards, notes, created_by, updated_by
            )
            SELECT
                $1, COALESCE(MAX(version_number), 0) + 1,
                $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $18
            FROM service_versions WHERE service_id = $1
            RETURNING *
            "#,
        )
        .bind(service_id)
        .bind(req.requires_equipment.as_str())
        .bind(req.requires_person.as_str())
        .bind(&req.checklist_template)
        .bind(req.default_checklist_level.as_str())
        .bind(req.minimum_checklist_level.as_str())
        .bind(req.allow_bulk_all_ok)
        .bind(req.require_photo_evidence)
        .bind(req.require_document_evidence)
        .bind(req.sticker_policy.as_str())
        .bind(req.approval_required)
        .bind(&req.approver_roles)
        .bind(req.validity_max_months)
        .bind(&req.validity_options)
        .bind(&req.output_definitions)
        .bind(&req.standards)
        .bind(&req.notes)
        .bind(actor)
        .fetch_one(&self.pool)
        .await
        .context("Failed to create service version")?;

        tracing::info!(
            "Created version {} of service {}",
            version.version_number,
            service_id
        );
        Ok(version)
    }

    /// Publish a version and pin it as the service's current version.
    /// Returns None when the version does not belong to the service.
    pub async fn publish_version(
        &self,
        service_id: i64,
        version_id: i64,
        actor: i64,
    ) -> Result<Option<ServiceVersion>> {
        let mut tx = self.pool.begin().await.context("Failed to open transaction")?;

        let version = sqlx::query_as::<_, ServiceVersion>(
            r#"
            UPDATE service_versions
            SET is_published = TRUE, effective_date = CURRENT_DATE, updated_by = $3,
                updated_at = NOW()
            WHERE id = $2 AND service_id = $1
            RETURNING *
            "#,
        )
        .bind(service_id)
        .bind(version_id)
        .bind(actor)
        .fetch_optional(&mut *tx)
        .await
        .context("Failed to publish service version")?;

        let Some(version) = version else {
            tx.rollback().await.ok();
            return Ok(None);
        };

        sqlx::query(
            r#"
            UPDATE services
            SET current_version_id = $2, updated_by = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(service_id)
        .bind(version.id)
        .bind(actor)
        .execute(&mut *tx)
        .await
        .context("Failed to pin current service version")?;

        tx.commit().await.context("Failed to commit version publish")?;

        tracing::info!(
            "Published version {} of service {}",
            version.version_number,
            service_id
        );
        Ok(Some(version))
    }

    pub async fn list_versions(&self, service_id: i64) -> Result<Vec<ServiceVersion>> {
        sqlx::query_as::<_, ServiceVersion>(
            "SELECT * FROM service_versions WHERE service_id = $1 ORDER BY version_number",
        )
        .bind(service_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list service versions")
    }

    /// The pinned current version, if the service has published one.
    pub async fn current_version(&self, service_id: i64) -> Result<Option<ServiceVersion>> {
        sqlx::query_as::<_, ServiceVersion>(
            r#"
            SELECT v.* FROM service_versions v
            JOIN services s ON s.current_version_id = v.id
            WHERE s.id = $1
            "#,
        )
        .bind(service_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch current service version")
    }
}
