//! People registry: operators, trainees, and other named individuals who
//! appear on certificates without holding a system account.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use sqlx::PgPool;

use crate::models::{CredentialStatus, Person, PersonCredential, PersonType};

pub struct PersonService {
    pool: PgPool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePersonRequest {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    pub person_type: PersonType,
    #[serde(default)]
    pub employer: String,
    pub client_id: Option<i64>,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePersonRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub person_type: Option<PersonType>,
    pub employer: Option<String>,
    pub client_id: Option<i64>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddCredentialRequest {
    pub credential_name: String,
    #[serde(default)]
    pub issuing_body: String,
    #[serde(default)]
    pub reference_code: String,
    pub issued_on: Option<NaiveDate>,
    pub valid_until: Option<NaiveDate>,
    pub document_uri: Option<String>,
    #[serde(default)]
    pub notes: String,
}

impl PersonService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, req: CreatePersonRequest, actor: i64) -> Result<Person> {
        let person = sqlx::query_as::<_, Person>(
            r#"
            INSERT INTO people (
                first_name, last_name, email, phone, person_type, employer,
                client_id, notes, created_by, updated_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
            RETURNING *
            "#,
        )
        .bind(&req.first_name)
        .bind(&req.last_name)
        .bind(&req.email)
        .bind(&req.phone)
        .bind(req.person_type.as_str())
        .bind(&req.employer)
        .bind(req.client_id)
        .bind(&req.notes)
        .bind(actor)
        .fetch_one(&self.pool)
        .await
        .context("Failed to create person")?;

        tracing::info!(
            "Registered person {} ({} {})",
            person.id,
            person.first_name,
            person.last_name
        );
        Ok(person)
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Person>> {
        sqlx::query_as::<_, Person>("SELECT * FROM people WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch person")
    }

    pub async fn list(
        &self,
        person_type: Option<PersonType>,
        client_id: Option<i64>,
    ) -> Result<Vec<Person>> {
        sqlx::query_as::<_, Person>(
            r#"
            SELECT * FROM people
            WHERE ($1::TEXT IS NULL OR person_type = $1)
              AND ($2::BIGINT IS NULL OR client_id = $2)
            ORDER BY last_name, first_name
            "#,
        )
        .bind(person_type.map(|t| t.as_str().to_string()))
        .bind(client_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list people")
    }

    pub async fn update(
        &self,
        id: i64,
        req: UpdatePersonRequest,
        actor: i64,
    ) -> Result<Option<Person>> {
        let person = sqlx::query_as::<_, Person>(
            r#"
            UPDATE people SET
                first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                email = COALESCE($4, email),
                phone = COALESCE($5, phone),
                person_type = COALESCE($6, person_type),
                employer = COALESCE($7, employer),
                client_id = COALESCE($8, client_id),
                notes = COALESCE($9, notes),
                updated_by = $10,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(req.first_name)
        .bind(req.last_name)
        .bind(req.email)
        .bind(req.phone)
        .bind(req.person_type.map(|t| t.as_str().to_string()))
        .bind(req.employer)
        .bind(req.client_id)
        .bind(req.notes)
        .bind(actor)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to update person")?;

        if let Some(ref p) = person {
            tracing::info!("Updated person {}", p.id);
        }
        Ok(person)
    }

    pub async fn add_credential(
        &self,
        person_id: i64,
        req: AddCredentialRequest,
    ) -> Result<PersonCredential> {
        let credential = sqlx::query_as::<_, PersonCredential>(
            r#"
            INSERT INTO person_credentials (
                person_id, credential_name, issuing_body, reference_code,
                issued_on, valid_until, document_uri, notes
            )
            VALUES ($1, $2, $3, $4, COALESCE($5, CURRENT_DATE), $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(person_id)
        .bind(&req.credential_name)
        .bind(&req.issuing_body)
        .bind(&req.reference_code)
        .bind(req.issued_on)
        .bind(req.valid_until)
        .bind(req.document_uri)
        .bind(&req.notes)
        .fetch_one(&self.pool)
        .await
        .context("Failed to add credential")?;

        tracing::info!(
            "Added credential {} ({}) to person {}",
            credential.id,
            credential.credential_name,
            person_id
        );
        Ok(credential)
    }

    pub async fn list_credentials(&self, person_id: i64) -> Result<Vec<PersonCredential>> {
        sqlx::query_as::<_, PersonCredential>(
            "SELECT * FROM person_credentials WHERE person_id = $1 ORDER BY issued_on DESC",
        )
        .bind(person_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list credentials")
    }

    pub async fn set_credential_status(
        &self,
        credential_id: i64,
        status: CredentialStatus,
    ) -> Result<Option<PersonCredential>> {
        sqlx::query_as::<_, PersonCredential>(
            r#"
            UPDATE person_credentials
            SET status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(credential_id)
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to set credential status")
    }

    /// Flip ACTIVE credentials past their validity date to EXPIRED.
    pub async fn expire_lapsed_credentials(&self, today: NaiveDate) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE person_credentials
            SET status = 'EXPIRED', updated_at = NOW()
            WHERE status = 'ACTIVE' AND valid_until IS NOT NULL AND valid_until < $1
            "#,
        )
        .bind(today)
        .execute(&self.pool)
        .await
        .context("Failed to expire lapsed credentials")?;
        Ok(result.rows_affected())
    }
}
