//! User accounts and their operational roles.

use anyhow::{Context, Result};
use serde::Deserialize;
use sqlx::PgPool;

use crate::models::{Role, User};

pub struct UserService {
    pool: PgPool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub role: Role,
    #[serde(default)]
    pub competence: String,
    #[serde(default)]
    pub phone: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Option<Role>,
    pub competence: Option<String>,
    pub phone: Option<String>,
    pub is_active: Option<bool>,
}

impl UserService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, req: CreateUserRequest) -> Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, first_name, last_name, role, competence, phone)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(&req.username)
        .bind(&req.email)
        .bind(&req.first_name)
        .bind(&req.last_name)
        .bind(req.role.as_str())
        .bind(&req.competence)
        .bind(&req.phone)
        .fetch_one(&self.pool)
        .await
        .context("Failed to create user")?;

        tracing::info!("Created user {} ({})", user.id, user.username);
        Ok(user)
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch user")
    }

    /// List users, optionally restricted to one role. Inactive accounts are
    /// included so that historical assignments stay resolvable.
    pub async fn list(&self, role: Option<Role>) -> Result<Vec<User>> {
        let users = match role {
            Some(role) => {
                sqlx::query_as::<_, User>(
                    "SELECT * FROM users WHERE role = $1 ORDER BY username",
                )
                .bind(role.as_str())
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY username")
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .context("Failed to list users")?;
        Ok(users)
    }

    pub async fn update(&self, id: i64, req: UpdateUserRequest) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET
                email = COALESCE($2, email),
                first_name = COALESCE($3, first_name),
                last_name = COALESCE($4, last_name),
                role = COALESCE($5, role),
                competence = COALESCE($6, competence),
                phone = COALESCE($7, phone),
                is_active = COALESCE($8, is_active)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(req.email)
        .bind(req.first_name)
        .bind(req.last_name)
        .bind(req.role.map(|r| r.as_str().to_string()))
        .bind(req.competence)
        .bind(req.phone)
        .bind(req.is_active)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to update user")?;

        if let Some(ref u) = user {
            tracing::info!("Updated user {}", u.id);
        }
        Ok(user)
    }
}
