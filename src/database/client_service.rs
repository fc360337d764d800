//! Client organisations that own equipment and receive job orders.

use anyhow::{Context, Result};
use serde::Deserialize;
use sqlx::PgPool;

use crate::models::Client;

pub struct ClientService {
    pool: PgPool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateClientRequest {
    pub name: String,
    #[serde(default)]
    pub contact_person: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub billing_reference: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateClientRequest {
    pub name: Option<String>,
    pub contact_person: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub billing_reference: Option<String>,
    pub is_active: Option<bool>,
}

impl ClientService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, req: CreateClientRequest, actor: i64) -> Result<Client> {
        let client = sqlx::query_as::<_, Client>(
            r#"
            INSERT INTO clients (
                name, contact_person, email, phone, address, billing_reference,
                created_by, updated_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            RETURNING *
            "#,
        )
        .bind(&req.name)
        .bind(&req.contact_person)
        .bind(&req.email)
        .bind(&req.phone)
        .bind(&req.address)
        .bind(&req.billing_reference)
        .bind(actor)
        .fetch_one(&self.pool)
        .await
        .context("Failed to create client")?;

        tracing::info!("Created client {} ({})", client.id, client.name);
        Ok(client)
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Client>> {
        sqlx::query_as::<_, Client>("SELECT * FROM clients WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch client")
    }

    pub async fn list(&self) -> Result<Vec<Client>> {
        sqlx::query_as::<_, Client>("SELECT * FROM clients ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .context("Failed to list clients")
    }

    /// Clients visible to a portal account: the record whose contact email
    /// matches the account's email.
    pub async fn list_for_client_user(&self, user_id: i64) -> Result<Vec<Client>> {
        sqlx::query_as::<_, Client>(
            "SELECT * FROM clients WHERE email = (SELECT email FROM users WHERE id = $1) ORDER BY name",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list clients for user")
    }

    pub async fn update(
        &self,
        id: i64,
        req: UpdateClientRequest,
        actor: i64,
    ) -> Result<Option<Client>> {
        let client = sqlx::query_as::<_, Client>(
            r#"
            UPDATE clients SET
                name = COALESCE($2, name),
                contact_person = COALESCE($3, contact_person),
                email = COALESCE($4, email),
                phone = COALESCE($5, phone),
                address = COALESCE($6, address),
                billing_reference = COALESCE($7, billing_reference),
                is_active = COALESCE($8, is_active),
                updated_by = $9,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(req.name)
        .bind(req.contact_person)
        .bind(req.email)
        .bind(req.phone)
        .bind(req.address)
        .bind(req.billing_reference)
        .bind(req.is_active)
        .bind(actor)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to update client")?;

        if let Some(ref c) = client {
            tracing::info!("Updated client {}", c.id);
        }
        Ok(client)
    }

    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM clients WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete client")?;
        Ok(result.rows_affected() > 0)
    }
}
