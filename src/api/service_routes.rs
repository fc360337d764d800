//! Service catalog endpoints: the services on offer and their versioned
//! operating definitions. Reads are open to any authenticated account;
//! catalog changes and version publishing are admin operations.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;

use crate::api::auth::{require_admin, CurrentUser};
use crate::api::{internal_error, ApiState};
use crate::database::{
    CreateServiceRequest, CreateServiceVersionRequest, ServiceRegistry, UpdateServiceRequest,
};
use crate::models::{Service, ServiceCategory, ServiceVersion};

#[derive(Debug, Deserialize)]
pub struct ListServicesQuery {
    pub category: Option<ServiceCategory>,
}

pub fn create_service_router(state: ApiState) -> Router {
    Router::new()
        .route("/api/services", post(create_service).get(list_services))
        .route("/api/services/code/:code", get(get_by_code))
        .route("/api/services/:id", get(get_service).put(update_service))
        .route(
            "/api/services/:id/versions",
            post(create_version).get(list_versions),
        )
        .route("/api/services/:id/versions/current", get(current_version))
        .route(
            "/api/services/:id/versions/:version_id/publish",
            post(publish_version),
        )
        .with_state(state)
}

async fn create_service(
    State(state): State<ApiState>,
    current: CurrentUser,
    Json(req): Json<CreateServiceRequest>,
) -> Result<Json<Service>, (StatusCode, String)> {
    require_admin(&current)?;

    let service = ServiceRegistry::new(state.pool.clone())
        .create(req, current.id())
        .await
        .map_err(internal_error)?;
    Ok(Json(service))
}

async fn list_services(
    State(state): State<ApiState>,
    _current: CurrentUser,
    Query(query): Query<ListServicesQuery>,
) -> Result<Json<Vec<Service>>, (StatusCode, String)> {
    let services = ServiceRegistry::new(state.pool.clone())
        .list(query.category)
        .await
        .map_err(internal_error)?;
    Ok(Json(services))
}

async fn get_service(
    State(state): State<ApiState>,
    _current: CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<Service>, (StatusCode, String)> {
    ServiceRegistry::new(state.pool.clone())
        .find_by_id(id)
        .await
        .map_err(internal_error)?
        .map(Json)
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Service not found".to_string()))
}

async fn get_by_code(
    State(state): State<ApiState>,
    _current: CurrentUser,
    Path(code): Path<String>,
) -> Result<Json<Service>, (StatusCode, String)> {
    ServiceRegistry::new(state.pool.clone())
        .find_by_code(&code)
        .await
        .map_err(internal_error)?
        .map(Json)
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Service not found".to_string()))
}

async fn update_service(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path(id): Path<i64>,
    Json(req): Json<UpdateServiceRequest>,
) -> Result<Json<Service>, (StatusCode, String)> {
    require_admin(&current)?;

    ServiceRegistry::new(state.pool.clone())
        .update(id, req, current.id())
        .await
        .map_err(internal_error)?
        .map(Json)
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Service not found".to_string()))
}

async fn create_version(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path(id): Path<i64>,
    Json(req): Json<CreateServiceVersionRequest>,
) -> Result<Json<ServiceVersion>, (StatusCode, String)> {
    require_admin(&current)?;

    let version = ServiceRegistry::new(state.pool.clone())
        .create_version(id, req, current.id())
        .await
        .map_err(internal_error)?;
    Ok(Json(version))
}

async fn list_versions(
    State(state): State<ApiState>,
    _current: CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<Vec<ServiceVersion>>, (StatusCode, String)> {
    let versions = ServiceRegistry::new(state.pool.clone())
        .list_versions(id)
        .await
        .map_err(internal_error)?;
    Ok(Json(versions))
}

async fn current_version(
    State(state): State<ApiState>,
    _current: CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<ServiceVersion>, (StatusCode, String)> {
    ServiceRegistry::new(state.pool.clone())
        .current_version(id)
        .await
        .map_err(internal_error)?
        .map(Json)
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                "Service has no published version".to_string(),
            )
        })
}

async fn publish_version(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path((id, version_id)): Path<(i64, i64)>,
) -> Result<Json<ServiceVersion>, (StatusCode, String)> {
    require_admin(&current)?;

    ServiceRegistry::new(state.pool.clone())
        .publish_version(id, version_id, current.id())
        .await
        .map_err(internal_error)?
        .map(Json)
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Service version not found".to_string()))
}
