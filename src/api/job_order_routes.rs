//! Job order endpoints: orders, line items, status moves and the
//! publication batch. Portal accounts only see orders of the client whose
//! contact email matches their account.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{delete, get, post},
    Router,
};
use serde::Deserialize;

use crate::api::auth::{require_staff, CurrentUser};
use crate::api::{internal_error, lifecycle_error, ApiState};
use crate::database::{
    AuditAction, AuditLogger, ClientService, CreateJobOrderRequest, CreateLineItemRequest,
    JobOrderService, NewAuditEntry, UpdateJobOrderRequest,
};
use crate::error::LifecycleError;
use crate::lifecycle::{InspectionLifecycle, PublicationLifecycle};
use crate::models::{
    JobLineItem, JobOrder, JobOrderStatus, JobOrderSummary, LineItemStatus, Publication, Role,
};

#[derive(Debug, Deserialize)]
pub struct ListJobOrdersQuery {
    pub client_id: Option<i64>,
    pub status: Option<JobOrderStatus>,
}

#[derive(Debug, Deserialize)]
pub struct SetStatusRequest {
    pub status: JobOrderStatus,
}

#[derive(Debug, Deserialize)]
pub struct SetLineItemStatusRequest {
    pub status: LineItemStatus,
}

#[derive(Debug, Deserialize)]
pub struct AssignLineItemsRequest {
    pub inspector_id: i64,
    /// Empty targets every line item on the order.
    #[serde(default)]
    pub line_item_ids: Vec<i64>,
}

#[derive(Debug, Deserialize)]
pub struct PublicationRequest {
    #[serde(default)]
    pub note: String,
}

pub fn create_job_order_router(state: ApiState) -> Router {
    Router::new()
        .route("/api/job-orders", post(create_job_order).get(list_job_orders))
        .route("/api/job-orders/:id", get(get_job_order).put(update_job_order))
        .route("/api/job-orders/:id/status", post(set_status))
        .route("/api/job-orders/:id/summary", get(get_summary))
        .route(
            "/api/job-orders/:id/line-items",
            post(add_line_item).get(list_line_items),
        )
        .route(
            "/api/job-orders/:id/line-items/:item_id",
            delete(delete_line_item),
        )
        .route(
            "/api/job-orders/:id/line-items/:item_id/status",
            post(set_line_item_status),
        )
        .route("/api/job-orders/:id/assign", post(assign_line_items))
        .route("/api/job-orders/:id/publish", post(publish_job_order))
        .route("/api/job-orders/:id/revoke", post(revoke_publication))
        .route("/api/job-orders/:id/publications", get(list_publications))
        .with_state(state)
}

async fn create_job_order(
    State(state): State<ApiState>,
    current: CurrentUser,
    Json(req): Json<CreateJobOrderRequest>,
) -> Result<Json<JobOrder>, (StatusCode, String)> {
    require_staff(&current)?;

    let order = JobOrderService::new(state.pool.clone())
        .create(req, current.id())
        .await
        .map_err(internal_error)?;
    Ok(Json(order))
}

async fn list_job_orders(
    State(state): State<ApiState>,
    current: CurrentUser,
    Query(query): Query<ListJobOrdersQuery>,
) -> Result<Json<Vec<JobOrder>>, (StatusCode, String)> {
    let service = JobOrderService::new(state.pool.clone());
    let orders = if current.is_client() {
        service
            .list_for_client_user(current.id())
            .await
            .map_err(internal_error)?
    } else if current.user.role == Role::Inspector {
        service
            .list_for_inspector(current.id())
            .await
            .map_err(internal_error)?
    } else {
        service
            .list(query.client_id, query.status)
            .await
            .map_err(internal_error)?
    };
    Ok(Json(orders))
}

async fn get_job_order(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<JobOrder>, (StatusCode, String)> {
    let order = JobOrderService::new(state.pool.clone())
        .find_by_id(id)
        .await
        .map_err(internal_error)?
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Job order not found".to_string()))?;

    if current.is_client() {
        let client = ClientService::new(state.pool.clone())
            .find_by_id(order.client_id)
            .await
            .map_err(internal_error)?;
        let owned = client
            .map(|c| c.email == current.user.email)
            .unwrap_or(false);
        if !owned {
            return Err((StatusCode::FORBIDDEN, "Access denied".to_string()));
        }
    }

    Ok(Json(order))
}

async fn update_job_order(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path(id): Path<i64>,
    Json(req): Json<UpdateJobOrderRequest>,
) -> Result<Json<JobOrder>, (StatusCode, String)> {
    require_staff(&current)?;

    JobOrderService::new(state.pool.clone())
        .update(id, req, current.id())
        .await
        .map_err(internal_error)?
        .map(Json)
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Job order not found".to_string()))
}

/// Moves an order through its working states. Publication is a separate
/// operation with its own role gate, so PUBLISHED is rejected here, as are
/// moves out of a terminal state.
async fn set_status(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path(id): Path<i64>,
    Json(req): Json<SetStatusRequest>,
) -> Result<Json<JobOrder>, (StatusCode, String)> {
    require_staff(&current)?;

    let service = JobOrderService::new(state.pool.clone());
    let order = service
        .find_by_id(id)
        .await
        .map_err(internal_error)?
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Job order not found".to_string()))?;

    if order.status.is_terminal() {
        return Err(lifecycle_error(LifecycleError::InvalidTransition {
            entity: "job order",
            id,
            from: order.status.as_str().to_string(),
            to: req.status.as_str().to_string(),
        }));
    }
    if req.status == JobOrderStatus::Published {
        return Err((
            StatusCode::BAD_REQUEST,
            "Job orders are published through the publish operation".to_string(),
        ));
    }

    let updated = service
        .set_status(id, req.status, current.id())
        .await
        .map_err(internal_error)?
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Job order not found".to_string()))?;

    AuditLogger::new(state.pool.clone())
        .append(NewAuditEntry {
            user_id: Some(current.id()),
            action: AuditAction::Update,
            entity_type: "JOB_ORDER",
            entity_id: id,
            changes: serde_json::json!({ "status": updated.status.as_str() }),
            ip_address: current.ip.clone(),
        })
        .await
        .map_err(internal_error)?;

    Ok(Json(updated))
}

async fn get_summary(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<JobOrderSummary>, (StatusCode, String)> {
    require_staff(&current)?;

    let summary = JobOrderService::new(state.pool.clone())
        .summary(id)
        .await
        .map_err(internal_error)?;
    Ok(Json(summary))
}

async fn add_line_item(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path(id): Path<i64>,
    Json(req): Json<CreateLineItemRequest>,
) -> Result<Json<JobLineItem>, (StatusCode, String)> {
    require_staff(&current)?;

    let service = JobOrderService::new(state.pool.clone());
    service
        .find_by_id(id)
        .await
        .map_err(internal_error)?
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Job order not found".to_string()))?;

    let item = service
        .add_line_item(id, req, current.id())
        .await
        .map_err(internal_error)?;
    Ok(Json(item))
}

async fn list_line_items(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<Vec<JobLineItem>>, (StatusCode, String)> {
    require_staff(&current)?;

    let items = JobOrderService::new(state.pool.clone())
        .list_line_items(id)
        .await
        .map_err(internal_error)?;
    Ok(Json(items))
}

async fn set_line_item_status(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path((id, item_id)): Path<(i64, i64)>,
    Json(req): Json<SetLineItemStatusRequest>,
) -> Result<Json<JobLineItem>, (StatusCode, String)> {
    require_staff(&current)?;

    let service = JobOrderService::new(state.pool.clone());
    check_line_item_parent(&service, id, item_id).await?;

    service
        .set_line_item_status(item_id, req.status, current.id())
        .await
        .map_err(internal_error)?
        .map(Json)
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Line item not found".to_string()))
}

async fn delete_line_item(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path((id, item_id)): Path<(i64, i64)>,
) -> Result<StatusCode, (StatusCode, String)> {
    require_staff(&current)?;

    let service = JobOrderService::new(state.pool.clone());
    check_line_item_parent(&service, id, item_id).await?;

    let deleted = service
        .delete_line_item(item_id)
        .await
        .map_err(internal_error)?;
    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err((StatusCode::NOT_FOUND, "Line item not found".to_string()))
    }
}

/// Puts an inspector on a batch of line items in one call, creating a DRAFT
/// inspection for each item that does not already have one. Responds with the
/// ids of the inspections it created.
async fn assign_line_items(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path(id): Path<i64>,
    Json(req): Json<AssignLineItemsRequest>,
) -> Result<Json<Vec<i64>>, (StatusCode, String)> {
    let created = InspectionLifecycle::new(state.pool.clone())
        .assign_line_items(
            id,
            req.inspector_id,
            &req.line_item_ids,
            &current.user,
            current.ip.clone(),
        )
        .await
        .map_err(lifecycle_error)?;
    Ok(Json(created))
}

/// Line item routes are nested under their order; a mismatched parent id is
/// rejected rather than silently operating on another order's item.
async fn check_line_item_parent(
    service: &JobOrderService,
    job_order_id: i64,
    item_id: i64,
) -> Result<(), (StatusCode, String)> {
    let item = service
        .find_line_item(item_id)
        .await
        .map_err(internal_error)?
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Line item not found".to_string()))?;
    if item.job_order_id != job_order_id {
        return Err(lifecycle_error(LifecycleError::LineItemMismatch {
            line_item_id: item_id,
            job_order_id,
        }));
    }
    Ok(())
}

async fn publish_job_order(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path(id): Path<i64>,
    Json(req): Json<PublicationRequest>,
) -> Result<Json<Publication>, (StatusCode, String)> {
    let publication = PublicationLifecycle::new(state.pool.clone())
        .publish(id, &req.note, &current.user, current.ip.clone())
        .await
        .map_err(lifecycle_error)?;
    Ok(Json(publication))
}

async fn revoke_publication(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path(id): Path<i64>,
    Json(req): Json<PublicationRequest>,
) -> Result<Json<Publication>, (StatusCode, String)> {
    let publication = PublicationLifecycle::new(state.pool.clone())
        .revoke(id, &req.note, &current.user, current.ip.clone())
        .await
        .map_err(lifecycle_error)?;
    Ok(Json(publication))
}

async fn list_publications(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<Vec<Publication>>, (StatusCode, String)> {
    require_staff(&current)?;

    let publications = PublicationLifecycle::new(state.pool.clone())
        .list_for_job_order(id)
        .await
        .map_err(internal_error)?;
    Ok(Json(publications))
}
