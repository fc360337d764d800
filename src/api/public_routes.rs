//! Unauthenticated endpoints behind the QR codes printed on certificates,
//! shared reports and equipment stickers. Everything here is reachable by
//! anyone scanning a code, so only published material is served.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use serde::Serialize;
use uuid::Uuid;

use crate::api::{internal_error, ApiState};
use crate::database::{
    CertificateService, EquipmentService, InspectionService, ReportService, StickerService,
};
use crate::models::{Certificate, Equipment, FieldInspectionReport, Inspection, Sticker};

const STICKER_HISTORY_LIMIT: i64 = 5;

/// What a scanned sticker resolves to: the unit it is attached to, its
/// latest published certificate and recent approved inspections.
#[derive(Debug, Serialize)]
pub struct StickerResolution {
    pub sticker: Sticker,
    pub equipment: Option<Equipment>,
    pub latest_certificate: Option<Certificate>,
    pub recent_inspections: Vec<Inspection>,
}

pub fn create_public_router(state: ApiState) -> Router {
    Router::new()
        .route("/public/certificates/:token", get(verify_certificate))
        .route("/public/reports/:token", get(view_report))
        .route("/public/stickers/:code", get(resolve_sticker))
        .with_state(state)
}

/// Certificate verification by share token. Only published certificates
/// resolve; drafts and revoked ones return 404 rather than leaking their
/// existence.
async fn verify_certificate(
    State(state): State<ApiState>,
    Path(token): Path<Uuid>,
) -> Result<Json<Certificate>, (StatusCode, String)> {
    CertificateService::new(state.pool.clone())
        .find_published_by_token(token)
        .await
        .map_err(internal_error)?
        .map(Json)
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Certificate not found".to_string()))
}

async fn view_report(
    State(state): State<ApiState>,
    Path(token): Path<Uuid>,
) -> Result<Json<FieldInspectionReport>, (StatusCode, String)> {
    ReportService::new(state.pool.clone())
        .find_by_token(token)
        .await
        .map_err(internal_error)?
        .map(Json)
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Report not found".to_string()))
}

async fn resolve_sticker(
    State(state): State<ApiState>,
    Path(code): Path<String>,
) -> Result<Json<StickerResolution>, (StatusCode, String)> {
    let sticker = StickerService::new(state.pool.clone())
        .find_by_code(&code)
        .await
        .map_err(internal_error)?
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Sticker not found".to_string()))?;

    let mut resolution = StickerResolution {
        sticker,
        equipment: None,
        latest_certificate: None,
        recent_inspections: Vec::new(),
    };

    if let Some(equipment_id) = resolution.sticker.assigned_equipment_id {
        resolution.equipment = EquipmentService::new(state.pool.clone())
            .find_by_id(equipment_id)
            .await
            .map_err(internal_error)?;
        resolution.latest_certificate = CertificateService::new(state.pool.clone())
            .find_latest_for_equipment(equipment_id)
            .await
            .map_err(internal_error)?;
        resolution.recent_inspections = InspectionService::new(state.pool.clone())
            .list_recent_approved_for_equipment(equipment_id, STICKER_HISTORY_LIMIT)
            .await
            .map_err(internal_error)?;
    }

    Ok(Json(resolution))
}
