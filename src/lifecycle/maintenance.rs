//! Periodic housekeeping: stale draft cleanup, due-inspection reminders,
//! and competence expiry sweeps. Triggered through the admin API rather
//! than an external scheduler.

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate};
use serde::Serialize;
use sqlx::{PgPool, Row};
use std::collections::BTreeMap;

use crate::database::{CompetenceService, PersonService};
use crate::notify::Notification;
use crate::tasks::{DocumentJobKind, DocumentJobQueue};

/// Draft inspections older than this are considered abandoned.
pub const DRAFT_RETENTION_DAYS: i32 = 30;

/// Clients are reminded this many days before equipment falls due.
pub const DUE_REMINDER_NOTICE_DAYS: i64 = 7;

#[derive(Debug, Clone, Serialize)]
pub struct MaintenanceReport {
    pub drafts_deleted: u64,
    pub reminders_enqueued: u64,
    pub authorizations_expired: u64,
    pub credentials_expired: u64,
}

pub struct MaintenanceService {
    pool: PgPool,
}

impl MaintenanceService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Delete DRAFT inspections that have sat untouched past the retention
    /// window. Returns how many were removed.
    pub async fn cleanup_old_drafts(&self) -> Result<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM inspections
            WHERE status = 'DRAFT' AND created_at < NOW() - make_interval(days => $1)
            "#,
        )
        .bind(DRAFT_RETENTION_DAYS)
        .execute(&self.pool)
        .await
        .context("Failed to delete stale draft inspections")?;

        let deleted = result.rows_affected();
        if deleted > 0 {
            tracing::info!("Deleted {} stale draft inspections", deleted);
        }
        Ok(deleted)
    }

    /// Enqueue one reminder notification per client whose equipment falls
    /// due exactly `DUE_REMINDER_NOTICE_DAYS` from `today`.
    pub async fn enqueue_due_reminders(
        &self,
        queue: &DocumentJobQueue,
        today: NaiveDate,
    ) -> Result<u64> {
        let due_date = today + Duration::days(DUE_REMINDER_NOTICE_DAYS);

        let rows = sqlx::query(
            r#"
            SELECT e.tag_code, e.client_id, c.email
            FROM equipment e
            JOIN clients c ON c.id = e.client_id
            WHERE e.next_due = $1
            ORDER BY e.client_id, e.tag_code
            "#,
        )
        .bind(due_date)
        .fetch_all(&self.pool)
        .await
        .context("Failed to find equipment falling due")?;

        let mut per_client: BTreeMap<i64, (String, Vec<String>)> = BTreeMap::new();
        for row in rows {
            let client_id: i64 = row.try_get("client_id")?;
            let email: String = row.try_get("email")?;
            let tag_code: String = row.try_get("tag_code")?;
            per_client
                .entry(client_id)
                .or_insert_with(|| (email, Vec::new()))
                .1
                .push(tag_code);
        }

        let mut enqueued = 0;
        for (client_id, (recipient, equipment_tags)) in per_client {
            let notification = Notification::InspectionDueReminder {
                client_id,
                recipient,
                equipment_tags,
                due_date,
            };
            queue
                .enqueue(DocumentJobKind::Notification, &notification, None)
                .await?;
            enqueued += 1;
        }

        if enqueued > 0 {
            tracing::info!(
                "Enqueued {} due-inspection reminders for {}",
                enqueued,
                due_date
            );
        }
        Ok(enqueued)
    }

    /// Run the whole daily sweep.
    pub async fn run_daily(
        &self,
        queue: &DocumentJobQueue,
        today: NaiveDate,
    ) -> Result<MaintenanceReport> {
        let drafts_deleted = self.cleanup_old_drafts().await?;
        let reminders_enqueued = self.enqueue_due_reminders(queue, today).await?;
        let authorizations_expired = CompetenceService::new(self.pool.clone())
            .expire_lapsed(today)
            .await?;
        let credentials_expired = PersonService::new(self.pool.clone())
            .expire_lapsed_credentials(today)
            .await?;

        Ok(MaintenanceReport {
            drafts_deleted,
            reminders_enqueued,
            authorizations_expired,
            credentials_expired,
        })
    }
}
