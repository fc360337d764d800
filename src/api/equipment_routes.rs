//! Equipment register endpoints. Staff-only; client visibility runs through
//! the published certificates and the public sticker resolver instead.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde::Deserialize;

use crate::api::auth::{require_admin, require_staff, CurrentUser};
use crate::api::{internal_error, ApiState};
use crate::database::{CreateEquipmentRequest, EquipmentService, UpdateEquipmentRequest};
use crate::models::Equipment;

const DEFAULT_DUE_WINDOW_DAYS: i64 = 30;

#[derive(Debug, Deserialize)]
pub struct ListEquipmentQuery {
    pub client_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct DueQuery {
    pub days: Option<i64>,
}

pub fn create_equipment_router(state: ApiState) -> Router {
    Router::new()
        .route("/api/equipment", post(create_equipment).get(list_equipment))
        .route("/api/equipment/due", get(list_due))
        .route("/api/equipment/tag/:tag_code", get(get_by_tag))
        .route(
            "/api/equipment/:id",
            get(get_equipment).put(update_equipment).delete(delete_equipment),
        )
        .with_state(state)
}

async fn create_equipment(
    State(state): State<ApiState>,
    current: CurrentUser,
    Json(req): Json<CreateEquipmentRequest>,
) -> Result<Json<Equipment>, (StatusCode, String)> {
    require_staff(&current)?;

    let equipment = EquipmentService::new(state.pool.clone())
        .create(req, current.id())
        .await
        .map_err(internal_error)?;
    Ok(Json(equipment))
}

async fn list_equipment(
    State(state): State<ApiState>,
    current: CurrentUser,
    Query(query): Query<ListEquipmentQuery>,
) -> Result<Json<Vec<Equipment>>, (StatusCode, String)> {
    require_staff(&current)?;

    let equipment = EquipmentService::new(state.pool.clone())
        .list(query.client_id)
        .await
        .map_err(internal_error)?;
    Ok(Json(equipment))
}

/// Equipment falling due within the window (default 30 days). Overdue units
/// are included.
async fn list_due(
    State(state): State<ApiState>,
    current: CurrentUser,
    Query(query): Query<DueQuery>,
) -> Result<Json<Vec<Equipment>>, (StatusCode, String)> {
    require_staff(&current)?;

    let days = query.days.unwrap_or(DEFAULT_DUE_WINDOW_DAYS);
    let equipment = EquipmentService::new(state.pool.clone())
        .list_due_within(Utc::now().date_naive(), days)
        .await
        .map_err(internal_error)?;
    Ok(Json(equipment))
}

async fn get_equipment(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<Equipment>, (StatusCode, String)> {
    require_staff(&current)?;

    EquipmentService::new(state.pool.clone())
        .find_by_id(id)
        .await
        .map_err(internal_error)?
        .map(Json)
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Equipment not found".to_string()))
}

async fn get_by_tag(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path(tag_code): Path<String>,
) -> Result<Json<Equipment>, (StatusCode, String)> {
    require_staff(&current)?;

    EquipmentService::new(state.pool.clone())
        .find_by_tag_code(&tag_code)
        .await
        .map_err(internal_error)?
        .map(Json)
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Equipment not found".to_string()))
}

async fn update_equipment(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path(id): Path<i64>,
    Json(req): Json<UpdateEquipmentRequest>,
) -> Result<Json<Equipment>, (StatusCode, String)> {
    require_staff(&current)?;

    EquipmentService::new(state.pool.clone())
        .update(id, req, current.id())
        .await
        .map_err(internal_error)?
        .map(Json)
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Equipment not found".to_string()))
}

async fn delete_equipment(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, (StatusCode, String)> {
    require_admin(&current)?;

    let deleted = EquipmentService::new(state.pool.clone())
        .delete(id)
        .await
        .map_err(internal_error)?;
    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err((StatusCode::NOT_FOUND, "Equipment not found".to_string()))
    }
}
