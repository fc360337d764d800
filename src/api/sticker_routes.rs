//! Sticker endpoints: batch generation of pre-printed QR codes and their
//! assignment to equipment in the field.

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
use crate::database::StickerService;
use crate::lifecycle::guard;
use crate::models::{Sticker, StickerStatus};

#[derive(Debug, Deserialize)]
pub struct GenerateStickersRequest {
    pub count: i64,
}

#[derive(Debug, Deserialize)]
pub struct AssignStickerRequest {
    pub equipment_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct ListStickersQuery {
    pub status: Option<StickerStatus>,
}

pub fn create_sticker_router(state: ApiState) -> Router {
    Router::new()
        .route("/api/stickers", get(list_stickers))
        .route("/api/stickers/generate", post(generate_stickers))
        .route("/api/stickers/code/:code", get(get_by_code))
        .route("/api/stickers/:id", get(get_sticker))
        .route("/api/stickers/:id/assign", post(assign_sticker))
        .with_state(state)
}

async fn generate_stickers(
    State(state): State<ApiState>,
    current: CurrentUser,
    Json(req): Json<GenerateStickersRequest>,
) -> Result<Json<Vec<Sticker>>, (StatusCode, String)> {
    guard::require_publisher(&current.user, "generate stickers").map_err(lifecycle_error)?;

    let stickers = StickerService::new(state.pool.clone())
        .generate_batch(req.count, &state.frontend_url, current.id())
        .await
        .map_err(lifecycle_error)?;
    Ok(Json(stickers))
}

async fn assign_sticker(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path(id): Path<i64>,
    Json(req): Json<AssignStickerRequest>,
) -> Result<Json<Sticker>, (StatusCode, String)> {
    guard::require_inspector(&current.user, "assign sticker").map_err(lifecycle_error)?;

    let sticker = StickerService::new(state.pool.clone())
        .assign(id, req.equipment_id, current.id())
        .await
        .map_err(lifecycle_error)?;
    Ok(Json(sticker))
}

async fn list_stickers(
    State(state): State<ApiState>,
    current: CurrentUser,
    Query(query): Query<ListStickersQuery>,
) -> Result<Json<Vec<Sticker>>, (StatusCode, String)> {
    require_staff(&current)?;

    let stickers = StickerService::new(state.pool.clone())
        .list(query.status)
        .await
        .map_err(internal_error)?;
    Ok(Json(stickers))
}

async fn get_sticker(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<Sticker>, (StatusCode, String)> {
    require_staff(&current)?;

    StickerService::new(state.pool.clone())
        .find_by_id(id)
        .await
        .map_err(internal_error)?
        .map(Json)
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Sticker not found".to_string()))
}

async fn get_by_code(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path(code): Path<String>,
) -> Result<Json<Sticker>, (StatusCode, String)> {
    require_staff(&current)?;

    StickerService::new(state.pool.clone())
        .find_by_code(&code)
        .await
        .map_err(internal_error)?
        .map(Json)
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Sticker not found".to_string()))
}
