//! Status lookup for queued document jobs.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use uuid::Uuid;

use crate::api::auth::{require_staff, CurrentUser};
use crate::api::{internal_error, ApiState};
use crate::tasks::{DocumentJob, DocumentJobQueue};

pub fn create_task_router(state: ApiState) -> Router {
    Router::new()
        .route("/api/jobs/:job_id", get(get_job))
        .with_state(state)
}

/// Looks a job up by the public UUID returned when it was queued.
async fn get_job(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path(job_id): Path<Uuid>,
) -> Result<Json<DocumentJob>, (StatusCode, String)> {
    require_staff(&current)?;

    DocumentJobQueue::new(state.pool.clone())
        .find_by_job_id(job_id)
        .await
        .map_err(internal_error)?
        .map(Json)
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Job not found".to_string()))
}
