//! Inspection endpoints: creation, answers, photos and the lifecycle
//! transitions. Every transition carries the caller's last-seen version
//! so concurrent decisions surface as 409 instead of silently racing.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;

use crate::api::auth::{require_staff, CurrentUser};
use crate::api::{internal_error, lifecycle_error, ApiState};
use crate::database::{
    AttachPhotoRequest, CreateInspectionRequest, InspectionService, UpdateInspectionRequest,
};
use crate::error::LifecycleError;
use crate::lifecycle::{guard, InspectionLifecycle, RecordAnswerRequest};
use crate::models::{Inspection, InspectionAnswer, InspectionStatus, PhotoRef, Role};
use crate::tasks::{CertificateRenderPayload, DocumentJob, DocumentJobKind, DocumentJobQueue};

#[derive(Debug, Deserialize)]
pub struct ListInspectionsQuery {
    pub inspector_id: Option<i64>,
    pub status: Option<InspectionStatus>,
}

#[derive(Debug, Deserialize)]
pub struct AssignRequest {
    pub inspector_id: i64,
    pub expected_version: i32,
}

#[derive(Debug, Deserialize)]
pub struct TransitionRequest {
    pub expected_version: i32,
}

#[derive(Debug, Deserialize)]
pub struct DecisionRequest {
    pub expected_version: i32,
    #[serde(default)]
    pub comment: String,
}

pub fn create_inspection_router(state: ApiState) -> Router {
    Router::new()
        .route(
            "/api/inspections",
            post(create_inspection).get(list_inspections),
        )
        .route("/api/job-orders/:id/inspections", get(list_for_job_order))
        .route(
            "/api/inspections/:id",
            get(get_inspection).put(update_inspection),
        )
        .route(
            "/api/inspections/:id/answers",
            get(list_answers).put(record_answer),
        )
        .route(
            "/api/inspections/:id/photos",
            post(attach_photo).get(list_photos),
        )
        .route("/api/inspections/:id/assign", post(assign_inspection))
        .route("/api/inspections/:id/start", post(start_inspection))
        .route("/api/inspections/:id/submit", post(submit_inspection))
        .route("/api/inspections/:id/approve", post(approve_inspection))
        .route("/api/inspections/:id/reject", post(reject_inspection))
        .route("/api/inspections/:id/certificate", post(request_certificate))
        .with_state(state)
}

async fn create_inspection(
    State(state): State<ApiState>,
    current: CurrentUser,
    Json(req): Json<CreateInspectionRequest>,
) -> Result<Json<Inspection>, (StatusCode, String)> {
    guard::require_inspector(&current.user, "create inspection").map_err(lifecycle_error)?;

    if !req.checklist_template.is_empty() && state.checklists.get(&req.checklist_template).is_none()
    {
        return Err(lifecycle_error(LifecycleError::UnknownChecklist(
            req.checklist_template.clone(),
        )));
    }

    let inspection = InspectionService::new(state.pool.clone())
        .create(req, current.id())
        .await
        .map_err(internal_error)?;
    Ok(Json(inspection))
}

async fn list_inspections(
    State(state): State<ApiState>,
    current: CurrentUser,
    Query(query): Query<ListInspectionsQuery>,
) -> Result<Json<Vec<Inspection>>, (StatusCode, String)> {
    let service = InspectionService::new(state.pool.clone());
    let inspections = if current.is_client() {
        service
            .list_for_client_user(current.id())
            .await
            .map_err(internal_error)?
    } else {
        // Inspector accounts are pinned to their own rows whatever filter
        // they pass.
        let inspector_id = if current.user.role == Role::Inspector {
            Some(current.id())
        } else {
            query.inspector_id
        };
        service
            .list(inspector_id, query.status)
            .await
            .map_err(internal_error)?
    };
    Ok(Json(inspections))
}

async fn list_for_job_order(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<Vec<Inspection>>, (StatusCode, String)> {
    require_staff(&current)?;

    let inspections = InspectionService::new(state.pool.clone())
        .list_for_job_order(id)
        .await
        .map_err(internal_error)?;
    Ok(Json(inspections))
}

async fn get_inspection(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<Inspection>, (StatusCode, String)> {
    require_staff(&current)?;

    InspectionService::new(state.pool.clone())
        .find_by_id(id)
        .await
        .map_err(internal_error)?
        .map(Json)
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Inspection not found".to_string()))
}

/// Field data (geo location, signatures, template) can only change while
/// the inspection is still being executed.
async fn update_inspection(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path(id): Path<i64>,
    Json(req): Json<UpdateInspectionRequest>,
) -> Result<Json<Inspection>, (StatusCode, String)> {
    require_staff(&current)?;

    let service = InspectionService::new(state.pool.clone());
    let inspection = service
        .find_by_id(id)
        .await
        .map_err(internal_error)?
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Inspection not found".to_string()))?;

    if !inspection.status.accepts_answers() {
        return Err(lifecycle_error(LifecycleError::ExecutionClosed {
            entity: "inspection",
            id,
            status: inspection.status.as_str().to_string(),
        }));
    }

    service
        .update(id, req, current.id())
        .await
        .map_err(internal_error)?
        .map(Json)
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Inspection not found".to_string()))
}

async fn list_answers(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<Vec<InspectionAnswer>>, (StatusCode, String)> {
    require_staff(&current)?;

    let answers = InspectionService::new(state.pool.clone())
        .list_answers(id)
        .await
        .map_err(internal_error)?;
    Ok(Json(answers))
}

async fn record_answer(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path(id): Path<i64>,
    Json(req): Json<RecordAnswerRequest>,
) -> Result<Json<InspectionAnswer>, (StatusCode, String)> {
    guard::require_inspector(&current.user, "record answer").map_err(lifecycle_error)?;

    let answer = InspectionLifecycle::new(state.pool.clone())
        .record_answer(&state.checklists, id, &req)
        .await
        .map_err(lifecycle_error)?;
    Ok(Json(answer))
}

async fn attach_photo(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path(id): Path<i64>,
    Json(req): Json<AttachPhotoRequest>,
) -> Result<Json<PhotoRef>, (StatusCode, String)> {
    guard::require_inspector(&current.user, "attach photo").map_err(lifecycle_error)?;

    let photo = InspectionService::new(state.pool.clone())
        .attach_photo(id, req)
        .await
        .map_err(internal_error)?;
    Ok(Json(photo))
}

async fn list_photos(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<Vec<PhotoRef>>, (StatusCode, String)> {
    require_staff(&current)?;

    let photos = InspectionService::new(state.pool.clone())
        .list_photos(id)
        .await
        .map_err(internal_error)?;
    Ok(Json(photos))
}

async fn assign_inspection(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path(id): Path<i64>,
    Json(req): Json<AssignRequest>,
) -> Result<Json<Inspection>, (StatusCode, String)> {
    let inspection = InspectionLifecycle::new(state.pool.clone())
        .assign(
            id,
            req.inspector_id,
            req.expected_version,
            &current.user,
            current.ip.clone(),
        )
        .await
        .map_err(lifecycle_error)?;
    Ok(Json(inspection))
}

async fn start_inspection(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path(id): Path<i64>,
    Json(req): Json<TransitionRequest>,
) -> Result<Json<Inspection>, (StatusCode, String)> {
    let inspection = InspectionLifecycle::new(state.pool.clone())
        .start(id, req.expected_version, &current.user, current.ip.clone())
        .await
        .map_err(lifecycle_error)?;
    Ok(Json(inspection))
}

async fn submit_inspection(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path(id): Path<i64>,
    Json(req): Json<TransitionRequest>,
) -> Result<Json<Inspection>, (StatusCode, String)> {
    let inspection = InspectionLifecycle::new(state.pool.clone())
        .submit(id, req.expected_version, &current.user, current.ip.clone())
        .await
        .map_err(lifecycle_error)?;
    Ok(Json(inspection))
}

async fn approve_inspection(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path(id): Path<i64>,
    Json(req): Json<DecisionRequest>,
) -> Result<Json<Inspection>, (StatusCode, String)> {
    let inspection = InspectionLifecycle::new(state.pool.clone())
        .approve(
            id,
            req.expected_version,
            &req.comment,
            &current.user,
            current.ip.clone(),
        )
        .await
        .map_err(lifecycle_error)?;
    Ok(Json(inspection))
}

async fn reject_inspection(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path(id): Path<i64>,
    Json(req): Json<DecisionRequest>,
) -> Result<Json<Inspection>, (StatusCode, String)> {
    let inspection = InspectionLifecycle::new(state.pool.clone())
        .reject(
            id,
            req.expected_version,
            &req.comment,
            &current.user,
            current.ip.clone(),
        )
        .await
        .map_err(lifecycle_error)?;
    Ok(Json(inspection))
}

/// Queues certificate generation for an approved inspection. The heavy
/// rendering happens in the background worker; the response is the queued
/// job, which can be polled at /api/jobs/:job_id.
async fn request_certificate(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> Result<(StatusCode, Json<DocumentJob>), (StatusCode, String)> {
    guard::require_approver(&current.user, "generate certificate").map_err(lifecycle_error)?;

    let inspection = InspectionService::new(state.pool.clone())
        .find_by_id(id)
        .await
        .map_err(internal_error)?
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Inspection not found".to_string()))?;
    if inspection.status != InspectionStatus::Approved {
        return Err(lifecycle_error(LifecycleError::NotApproved { id }));
    }

    // The worker re-checks both conditions, but rejecting up front gives the
    // caller an immediate error instead of a failed job.
    let existing = crate::database::CertificateService::new(state.pool.clone())
        .find_by_inspection(id)
        .await
        .map_err(internal_error)?;
    if existing.is_some() {
        return Err(lifecycle_error(LifecycleError::CertificateExists { id }));
    }

    let job = DocumentJobQueue::new(state.pool.clone())
        .enqueue(
            DocumentJobKind::CertificateRender,
            &CertificateRenderPayload {
                inspection_id: id,
                requested_by: current.id(),
            },
            Some(current.id()),
        )
        .await
        .map_err(internal_error)?;
    Ok((StatusCode::ACCEPTED, Json(job)))
}
