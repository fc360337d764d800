//! Append-only audit trail.
//!
//! Lifecycle operations append rows inside the same transaction as the
//! state change they describe, so the trail never disagrees with the data.
//! There is deliberately no update or delete path here.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
    Approve,
    Reject,
    Publish,
    Revoke,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::Approve => "APPROVE",
            Self::Reject => "REJECT",
            Self::Publish => "PUBLISH",
            Self::Revoke => "REVOKE",
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<String> for AuditAction {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.as_str() {
            "CREATE" => Ok(Self::Create),
            "UPDATE" => Ok(Self::Update),
            "DELETE" => Ok(Self::Delete),
            "APPROVE" => Ok(Self::Approve),
            "REJECT" => Ok(Self::Reject),
            "PUBLISH" => Ok(Self::Publish),
            "REVOKE" => Ok(Self::Revoke),
            _ => Err(format!("Unknown audit action: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AuditLogEntry {
    pub id: i64,
    pub user_id: Option<i64>,
    #[sqlx(try_from = "String")]
    pub action: AuditAction,
    pub entity_type: String,
    pub entity_id: i64,
    pub changes: serde_json::Value,
    pub ip_address: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAuditEntry {
    pub user_id: Option<i64>,
    pub action: AuditAction,
    pub entity_type: &'static str,
    pub entity_id: i64,
    pub changes: serde_json::Value,
    pub ip_address: Option<String>,
}

pub struct AuditLogger {
    pool: PgPool,
}

impl AuditLogger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Append an entry through any executor. Callers inside a transaction
    /// pass the transaction so the entry commits or rolls back with the
    /// change it records.
    pub async fn record<'e, E>(executor: E, entry: NewAuditEntry) -> sqlx::Result<()>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query(
            r#"
            INSERT INTO audit_logs (user_id, action, entity_type, entity_id, changes, ip_address)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(entry.user_id)
        .bind(entry.action.as_str())
        .bind(entry.entity_type)
        .bind(entry.entity_id)
        .bind(&entry.changes)
        .bind(entry.ip_address)
        .execute(executor)
        .await?;
        Ok(())
    }

    /// Append an entry outside any transaction.
    pub async fn append(&self, entry: NewAuditEntry) -> Result<()> {
        Self::record(&self.pool, entry)
            .await
            .context("Failed to append audit entry")
    }

    /// Full history of one entity, oldest first.
    pub async fn history(&self, entity_type: &str, entity_id: i64) -> Result<Vec<AuditLogEntry>> {
        sqlx::query_as::<_, AuditLogEntry>(
            r#"
            SELECT * FROM audit_logs
            WHERE entity_type = $1 AND entity_id = $2
            ORDER BY recorded_at, id
            "#,
        )
        .bind(entity_type)
        .bind(entity_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch audit history")
    }

    /// Recent entries across the system, newest first.
    pub async fn recent(
        &self,
        user_id: Option<i64>,
        action: Option<AuditAction>,
        limit: i64,
    ) -> Result<Vec<AuditLogEntry>> {
        sqlx::query_as::<_, AuditLogEntry>(
            r#"
            SELECT * FROM audit_logs
            WHERE ($1::BIGINT IS NULL OR user_id = $1)
              AND ($2::TEXT IS NULL OR action = $2)
            ORDER BY recorded_at DESC, id DESC
            LIMIT $3
            "#,
        )
        .bind(user_id)
        .bind(action.map(|a| a.as_str().to_string()))
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch recent audit entries")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audit_action_round_trip() {
        assert_eq!(
            AuditAction::try_from("PUBLISH".to_string()).unwrap(),
            AuditAction::Publish
        );
        assert_eq!(AuditAction::Revoke.as_str(), "REVOKE");
        assert!(AuditAction::try_from("TRUNCATE".to_string()).is_err());
    }
}
