//! Certificate lookup endpoints. Certificates are created by the
//! background worker, never directly through the API, so these routes
//! are read only. Portal accounts see published certificates for their
//! own clients; public token access lives under /public.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use serde::Deserialize;

use crate::api::auth::{require_staff, CurrentUser};
use crate::api::{internal_error, ApiState};
use crate::database::CertificateService;
use crate::models::{Certificate, CertificateStatus};

#[derive(Debug, Deserialize)]
pub struct ListCertificatesQuery {
    pub status: Option<CertificateStatus>,
}

pub fn create_certificate_router(state: ApiState) -> Router {
    Router::new()
        .route("/api/certificates", get(list_certificates))
        .route("/api/certificates/:id", get(get_certificate))
        .route(
            "/api/inspections/:id/certificate",
            get(get_for_inspection),
        )
        .route(
            "/api/job-orders/:id/certificates",
            get(list_for_job_order),
        )
        .with_state(state)
}

async fn list_certificates(
    State(state): State<ApiState>,
    current: CurrentUser,
    Query(query): Query<ListCertificatesQuery>,
) -> Result<Json<Vec<Certificate>>, (StatusCode, String)> {
    let service = CertificateService::new(state.pool.clone());
    let certificates = if current.is_client() {
        service
            .list_for_client_user(current.id())
            .await
            .map_err(internal_error)?
    } else {
        service.list(query.status).await.map_err(internal_error)?
    };
    Ok(Json(certificates))
}

async fn get_certificate(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<Certificate>, (StatusCode, String)> {
    require_staff(&current)?;

    CertificateService::new(state.pool.clone())
        .find_by_id(id)
        .await
        .map_err(internal_error)?
        .map(Json)
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Certificate not found".to_string()))
}

async fn get_for_inspection(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<Certificate>, (StatusCode, String)> {
    require_staff(&current)?;

    CertificateService::new(state.pool.clone())
        .find_by_inspection(id)
        .await
        .map_err(internal_error)?
        .map(Json)
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Certificate not found".to_string()))
}

async fn list_for_job_order(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<Vec<Certificate>>, (StatusCode, String)> {
    require_staff(&current)?;

    let certificates = CertificateService::new(state.pool.clone())
        .list_for_job_order(id)
        .await
        .map_err(internal_error)?;
    Ok(Json(certificates))
}
