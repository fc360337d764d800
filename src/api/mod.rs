//! HTTP API surface.
//!
//! One router per functional area, merged by `create_api_router`. Handlers
//! stay thin: authenticate, call the service or lifecycle layer, map errors
//! onto status codes. CRUD failures surface as 500 with the detail in the
//! log; lifecycle refusals map per variant (403 role and ownership, 404
//! missing, 409 version conflict, 400 everything the caller can fix).

pub mod auth;

pub mod approval_routes;
pub mod audit_routes;
pub mod certificate_routes;
pub mod client_routes;
pub mod competence_routes;
pub mod equipment_routes;
pub mod inspection_routes;
pub mod job_order_routes;
pub mod maintenance_routes;
pub mod person_routes;
pub mod public_routes;
pub mod report_routes;
pub mod service_routes;
pub mod sticker_routes;
pub mod task_routes;
pub mod tool_routes;
pub mod user_routes;

use std::sync::Arc;

use axum::extract::FromRef;
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use serde::Serialize;
use sqlx::PgPool;

use crate::checklist::ChecklistRegistry;
use crate::error::LifecycleError;

/// Shared state for every router: the pool plus process-wide resources.
#[derive(Clone)]
pub struct ApiState {
    pub pool: PgPool,
    pub checklists: Arc<ChecklistRegistry>,
    /// Base URL used when minting verification links and sticker QR payloads.
    pub frontend_url: String,
}

impl ApiState {
    pub fn new(
        pool: PgPool,
        checklists: Arc<ChecklistRegistry>,
        frontend_url: impl Into<String>,
    ) -> Self {
        Self {
            pool,
            checklists,
            frontend_url: frontend_url.into(),
        }
    }
}

impl FromRef<ApiState> for PgPool {
    fn from_ref(state: &ApiState) -> PgPool {
        state.pool.clone()
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Merge every area router over the shared state.
pub fn create_api_router(state: ApiState) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .merge(user_routes::create_user_router(state.clone()))
        .merge(client_routes::create_client_router(state.clone()))
        .merge(equipment_routes::create_equipment_router(state.clone()))
        .merge(service_routes::create_service_router(state.clone()))
        .merge(job_order_routes::create_job_order_router(state.clone()))
        .merge(inspection_routes::create_inspection_router(state.clone()))
        .merge(certificate_routes::create_certificate_router(state.clone()))
        .merge(sticker_routes::create_sticker_router(state.clone()))
        .merge(report_routes::create_report_router(state.clone()))
        .merge(tool_routes::create_tool_router(state.clone()))
        .merge(competence_routes::create_competence_router(state.clone()))
        .merge(person_routes::create_person_router(state.clone()))
        .merge(approval_routes::create_approval_router(state.clone()))
        .merge(audit_routes::create_audit_router(state.clone()))
        .merge(task_routes::create_task_router(state.clone()))
        .merge(maintenance_routes::create_maintenance_router(state.clone()))
        .merge(public_routes::create_public_router(state))
}

/// CRUD-layer failure: log the detail, answer with a generic 500.
pub(crate) fn internal_error<E: std::fmt::Display>(e: E) -> (StatusCode, String) {
    tracing::error!("Database error: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Database error".to_string(),
    )
}

/// Map a lifecycle refusal onto the HTTP status it deserves.
pub(crate) fn lifecycle_error(err: LifecycleError) -> (StatusCode, String) {
    match &err {
        LifecycleError::RoleDenied { .. } | LifecycleError::NotOwner { .. } => {
            (StatusCode::FORBIDDEN, err.to_string())
        }
        LifecycleError::NotFound { .. } => (StatusCode::NOT_FOUND, err.to_string()),
        LifecycleError::VersionConflict { .. } => (StatusCode::CONFLICT, err.to_string()),
        LifecycleError::Database(e) => {
            tracing::error!("Database error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database error".to_string(),
            )
        }
        _ => (StatusCode::BAD_REQUEST, err.to_string()),
    }
}
