//! Field inspection report endpoints. A report covers one job order and
//! is rendered asynchronously, like certificates; requesting one returns
//! the queued job.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;

use crate::api::auth::{require_staff, CurrentUser};
use crate::api::{internal_error, ApiState};
use crate::database::{ClientService, JobOrderService, ReportService};
use crate::models::FieldInspectionReport;
use crate::tasks::{DocumentJob, DocumentJobKind, DocumentJobQueue, FieldReportRenderPayload};

#[derive(Debug, Deserialize)]
pub struct RequestReportRequest {
    /// Defaults to the client's contact email when omitted.
    pub recipient: Option<String>,
}

pub fn create_report_router(state: ApiState) -> Router {
    Router::new()
        .route(
            "/api/job-orders/:id/reports",
            post(request_report).get(list_reports),
        )
        .route("/api/reports/:id", get(get_report))
        .with_state(state)
}

async fn request_report(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path(id): Path<i64>,
    Json(req): Json<RequestReportRequest>,
) -> Result<(StatusCode, Json<DocumentJob>), (StatusCode, String)> {
    require_staff(&current)?;

    let order = JobOrderService::new(state.pool.clone())
        .find_by_id(id)
        .await
        .map_err(internal_error)?
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Job order not found".to_string()))?;

    let recipient = match req.recipient {
        Some(recipient) => recipient,
        None => ClientService::new(state.pool.clone())
            .find_by_id(order.client_id)
            .await
            .map_err(internal_error)?
            .ok_or_else(|| (StatusCode::NOT_FOUND, "Client not found".to_string()))?
            .email,
    };

    let job = DocumentJobQueue::new(state.pool.clone())
        .enqueue(
            DocumentJobKind::FieldReportRender,
            &FieldReportRenderPayload {
                job_order_id: id,
                recipient,
                requested_by: current.id(),
            },
            Some(current.id()),
        )
        .await
        .map_err(internal_error)?;
    Ok((StatusCode::ACCEPTED, Json(job)))
}

async fn list_reports(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<Vec<FieldInspectionReport>>, (StatusCode, String)> {
    if current.is_client() {
        check_client_owns_order(&state, id, &current).await?;
    }

    let reports = ReportService::new(state.pool.clone())
        .list_for_job_order(id)
        .await
        .map_err(internal_error)?;
    Ok(Json(reports))
}

async fn get_report(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<FieldInspectionReport>, (StatusCode, String)> {
    let report = ReportService::new(state.pool.clone())
        .find_by_id(id)
        .await
        .map_err(internal_error)?
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Report not found".to_string()))?;

    if current.is_client() {
        check_client_owns_order(&state, report.job_order_id, &current).await?;
    }

    Ok(Json(report))
}

/// Portal accounts only reach reports on orders of the client whose
/// contact email matches their account.
async fn check_client_owns_order(
    state: &ApiState,
    job_order_id: i64,
    current: &CurrentUser,
) -> Result<(), (StatusCode, String)> {
    let order = JobOrderService::new(state.pool.clone())
        .find_by_id(job_order_id)
        .await
        .map_err(internal_error)?
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Job order not found".to_string()))?;
    let client = ClientService::new(state.pool.clone())
        .find_by_id(order.client_id)
        .await
        .map_err(internal_error)?;
    let owned = client
        .map(|c| c.email == current.user.email)
        .unwrap_or(false);
    if owned {
        Ok(())
    } else {
        Err((StatusCode::FORBIDDEN, "Access denied".to_string()))
    }
}
