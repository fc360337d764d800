//! Competence endpoints: who is authorized to perform which service, at
//! what level, with what supporting evidence.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;

use crate::api::auth::{require_technical, CurrentUser};
use crate::api::{internal_error, ApiState};
use crate::database::{AddEvidenceRequest, CompetenceService, CreateAuthorizationRequest};
use crate::models::{AuthorizationStatus, CompetenceAuthorization, CompetenceEvidence};

#[derive(Debug, Deserialize)]
pub struct ValidAuthorizationsQuery {
    pub service_id: i64,
    pub discipline: String,
}

#[derive(Debug, Deserialize)]
pub struct SetAuthorizationStatusRequest {
    pub status: AuthorizationStatus,
}

#[derive(Debug, Deserialize)]
pub struct RecordAssessmentRequest {
    /// Defaults to today.
    pub assessed_on: Option<NaiveDate>,
}

pub fn create_competence_router(state: ApiState) -> Router {
    Router::new()
        .route("/api/competence", post(create_authorization))
        .route("/api/competence/valid", get(list_valid))
        .route("/api/competence/:id", get(get_authorization))
        .route("/api/competence/:id/status", post(set_status))
        .route("/api/competence/:id/assessment", post(record_assessment))
        .route(
            "/api/competence/:id/evidence",
            post(add_evidence).get(list_evidence),
        )
        .route("/api/users/:id/competence", get(list_for_user))
        .with_state(state)
}

async fn create_authorization(
    State(state): State<ApiState>,
    current: CurrentUser,
    Json(req): Json<CreateAuthorizationRequest>,
) -> Result<Json<CompetenceAuthorization>, (StatusCode, String)> {
    require_technical(&current)?;

    let authorization = CompetenceService::new(state.pool.clone())
        .create_authorization(req, current.id())
        .await
        .map_err(internal_error)?;
    Ok(Json(authorization))
}

/// Authorizations usable today for the given service and discipline,
/// strongest level first.
async fn list_valid(
    State(state): State<ApiState>,
    current: CurrentUser,
    Query(query): Query<ValidAuthorizationsQuery>,
) -> Result<Json<Vec<CompetenceAuthorization>>, (StatusCode, String)> {
    require_technical(&current)?;

    let authorizations = CompetenceService::new(state.pool.clone())
        .list_valid_for_service(query.service_id, &query.discipline, Utc::now().date_naive())
        .await
        .map_err(internal_error)?;
    Ok(Json(authorizations))
}

async fn get_authorization(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<CompetenceAuthorization>, (StatusCode, String)> {
    require_technical(&current)?;

    CompetenceService::new(state.pool.clone())
        .find_authorization(id)
        .await
        .map_err(internal_error)?
        .map(Json)
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Authorization not found".to_string()))
}

async fn list_for_user(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<Vec<CompetenceAuthorization>>, (StatusCode, String)> {
    require_technical(&current)?;

    let authorizations = CompetenceService::new(state.pool.clone())
        .list_for_user(id)
        .await
        .map_err(internal_error)?;
    Ok(Json(authorizations))
}

async fn set_status(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path(id): Path<i64>,
    Json(req): Json<SetAuthorizationStatusRequest>,
) -> Result<Json<CompetenceAuthorization>, (StatusCode, String)> {
    require_technical(&current)?;

    CompetenceService::new(state.pool.clone())
        .set_status(id, req.status, current.id())
        .await
        .map_err(internal_error)?
        .map(Json)
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Authorization not found".to_string()))
}

async fn record_assessment(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path(id): Path<i64>,
    Json(req): Json<RecordAssessmentRequest>,
) -> Result<Json<CompetenceAuthorization>, (StatusCode, String)> {
    require_technical(&current)?;

    let assessed_on = req.assessed_on.unwrap_or_else(|| Utc::now().date_naive());
    CompetenceService::new(state.pool.clone())
        .record_assessment(id, assessed_on, current.id())
        .await
        .map_err(internal_error)?
        .map(Json)
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Authorization not found".to_string()))
}

async fn add_evidence(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path(id): Path<i64>,
    Json(req): Json<AddEvidenceRequest>,
) -> Result<Json<CompetenceEvidence>, (StatusCode, String)> {
    require_technical(&current)?;

    let service = CompetenceService::new(state.pool.clone());
    service
        .find_authorization(id)
        .await
        .map_err(internal_error)?
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Authorization not found".to_string()))?;

    let evidence = service
        .add_evidence(id, req)
        .await
        .map_err(internal_error)?;
    Ok(Json(evidence))
}

async fn list_evidence(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<Vec<CompetenceEvidence>>, (StatusCode, String)> {
    require_technical(&current)?;

    let evidence = CompetenceService::new(state.pool.clone())
        .list_evidence(id)
        .await
        .map_err(internal_error)?;
    Ok(Json(evidence))
}
