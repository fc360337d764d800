//! Manual triggers for the daily housekeeping pass. Admin only; the same
//! operations can be driven from a scheduler hitting these endpoints.

use axum::{extract::State, http::StatusCode, response::Json, routing::post, Router};
use chrono::Utc;
use serde::Serialize;

use crate::api::auth::{require_admin, CurrentUser};
use crate::api::{internal_error, ApiState};
use crate::lifecycle::{MaintenanceReport, MaintenanceService};
use crate::tasks::DocumentJobQueue;

#[derive(Debug, Serialize)]
pub struct CleanupResponse {
    pub deleted: u64,
}

#[derive(Debug, Serialize)]
pub struct RemindersResponse {
    pub enqueued: u64,
}

pub fn create_maintenance_router(state: ApiState) -> Router {
    Router::new()
        .route("/api/maintenance/run", post(run_daily))
        .route("/api/maintenance/cleanup-drafts", post(cleanup_drafts))
        .route("/api/maintenance/due-reminders", post(due_reminders))
        .with_state(state)
}

async fn run_daily(
    State(state): State<ApiState>,
    current: CurrentUser,
) -> Result<Json<MaintenanceReport>, (StatusCode, String)> {
    require_admin(&current)?;

    let queue = DocumentJobQueue::new(state.pool.clone());
    let report = MaintenanceService::new(state.pool.clone())
        .run_daily(&queue, Utc::now().date_naive())
        .await
        .map_err(internal_error)?;
    Ok(Json(report))
}

async fn cleanup_drafts(
    State(state): State<ApiState>,
    current: CurrentUser,
) -> Result<Json<CleanupResponse>, (StatusCode, String)> {
    require_admin(&current)?;

    let deleted = MaintenanceService::new(state.pool.clone())
        .cleanup_old_drafts()
        .await
        .map_err(internal_error)?;
    Ok(Json(CleanupResponse { deleted }))
}

async fn due_reminders(
    State(state): State<ApiState>,
    current: CurrentUser,
) -> Result<Json<RemindersResponse>, (StatusCode, String)> {
    require_admin(&current)?;

    let queue = DocumentJobQueue::new(state.pool.clone());
    let enqueued = MaintenanceService::new(state.pool.clone())
        .enqueue_due_reminders(&queue, Utc::now().date_naive())
        .await
        .map_err(internal_error)?;
    Ok(Json(RemindersResponse { enqueued }))
}
