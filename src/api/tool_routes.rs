//! Tool room endpoints: categories, the tool register, checkout and
//! check-in, incidents and calibration history.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde::Deserialize;

use crate::api::auth::{require_admin, require_technical, CurrentUser};
use crate::api::{internal_error, lifecycle_error, ApiState};
use crate::database::{
    CheckoutToolRequest, CreateToolCategoryRequest, CreateToolRequest, RecordCalibrationRequest,
    ReportIncidentRequest, ToolService,
};
use crate::models::{
    Calibration, Tool, ToolAssignment, ToolAssignmentStatus, ToolCategory, ToolIncident,
    ToolStatus, ToolUsageLog,
};

#[derive(Debug, Deserialize)]
pub struct ListToolsQuery {
    pub status: Option<ToolStatus>,
    pub category_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CheckinRequest {
    pub outcome: ToolAssignmentStatus,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Deserialize)]
pub struct ResolveIncidentRequest {
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Deserialize)]
pub struct ListIncidentsQuery {
    pub tool_id: Option<i64>,
}

pub fn create_tool_router(state: ApiState) -> Router {
    Router::new()
        .route(
            "/api/tool-categories",
            post(create_category).get(list_categories),
        )
        .route("/api/tools", post(create_tool).get(list_tools))
        .route("/api/tools/calibration-overdue", get(list_calibration_overdue))
        .route("/api/tools/:id", get(get_tool))
        .route("/api/tools/:id/checkout", post(checkout_tool))
        .route("/api/tools/:id/assignments", get(list_assignments))
        .route("/api/tools/:id/usage", get(list_usage))
        .route(
            "/api/tools/:id/incidents",
            post(report_incident),
        )
        .route(
            "/api/tools/:id/calibrations",
            post(record_calibration).get(list_calibrations),
        )
        .route("/api/tool-assignments/:id/checkin", post(checkin_tool))
        .route("/api/tool-incidents", get(list_incidents))
        .route("/api/tool-incidents/:id/resolve", post(resolve_incident))
        .with_state(state)
}

async fn create_category(
    State(state): State<ApiState>,
    current: CurrentUser,
    Json(req): Json<CreateToolCategoryRequest>,
) -> Result<Json<ToolCategory>, (StatusCode, String)> {
    require_admin(&current)?;

    let category = ToolService::new(state.pool.clone())
        .create_category(req, current.id())
        .await
        .map_err(internal_error)?;
    Ok(Json(category))
}

async fn list_categories(
    State(state): State<ApiState>,
    current: CurrentUser,
) -> Result<Json<Vec<ToolCategory>>, (StatusCode, String)> {
    require_technical(&current)?;

    let categories = ToolService::new(state.pool.clone())
        .list_categories()
        .await
        .map_err(internal_error)?;
    Ok(Json(categories))
}

async fn create_tool(
    State(state): State<ApiState>,
    current: CurrentUser,
    Json(req): Json<CreateToolRequest>,
) -> Result<Json<Tool>, (StatusCode, String)> {
    require_technical(&current)?;

    let tool = ToolService::new(state.pool.clone())
        .create_tool(req, current.id())
        .await
        .map_err(internal_error)?;
    Ok(Json(tool))
}

async fn list_tools(
    State(state): State<ApiState>,
    current: CurrentUser,
    Query(query): Query<ListToolsQuery>,
) -> Result<Json<Vec<Tool>>, (StatusCode, String)> {
    require_technical(&current)?;

    let tools = ToolService::new(state.pool.clone())
        .list_tools(query.status, query.category_id)
        .await
        .map_err(internal_error)?;
    Ok(Json(tools))
}

async fn list_calibration_overdue(
    State(state): State<ApiState>,
    current: CurrentUser,
) -> Result<Json<Vec<Tool>>, (StatusCode, String)> {
    require_technical(&current)?;

    let tools = ToolService::new(state.pool.clone())
        .list_calibration_overdue(Utc::now().date_naive())
        .await
        .map_err(internal_error)?;
    Ok(Json(tools))
}

async fn get_tool(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<Tool>, (StatusCode, String)> {
    require_technical(&current)?;

    ToolService::new(state.pool.clone())
        .find_tool(id)
        .await
        .map_err(internal_error)?
        .map(Json)
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Tool not found".to_string()))
}

async fn checkout_tool(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path(id): Path<i64>,
    Json(req): Json<CheckoutToolRequest>,
) -> Result<Json<ToolAssignment>, (StatusCode, String)> {
    require_technical(&current)?;

    let assignment = ToolService::new(state.pool.clone())
        .checkout(id, req, current.id())
        .await
        .map_err(lifecycle_error)?;
    Ok(Json(assignment))
}

async fn checkin_tool(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path(id): Path<i64>,
    Json(req): Json<CheckinRequest>,
) -> Result<Json<ToolAssignment>, (StatusCode, String)> {
    require_technical(&current)?;

    let assignment = ToolService::new(state.pool.clone())
        .checkin(id, req.outcome, &req.notes, current.id())
        .await
        .map_err(lifecycle_error)?;
    Ok(Json(assignment))
}

async fn list_assignments(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<Vec<ToolAssignment>>, (StatusCode, String)> {
    require_technical(&current)?;

    let assignments = ToolService::new(state.pool.clone())
        .list_assignments(id)
        .await
        .map_err(internal_error)?;
    Ok(Json(assignments))
}

async fn list_usage(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<Vec<ToolUsageLog>>, (StatusCode, String)> {
    require_technical(&current)?;

    let usage = ToolService::new(state.pool.clone())
        .list_usage(id)
        .await
        .map_err(internal_error)?;
    Ok(Json(usage))
}

async fn report_incident(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path(id): Path<i64>,
    Json(req): Json<ReportIncidentRequest>,
) -> Result<Json<ToolIncident>, (StatusCode, String)> {
    require_technical(&current)?;

    let incident = ToolService::new(state.pool.clone())
        .report_incident(id, req, current.id())
        .await
        .map_err(internal_error)?;
    Ok(Json(incident))
}

async fn resolve_incident(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path(id): Path<i64>,
    Json(req): Json<ResolveIncidentRequest>,
) -> Result<Json<ToolIncident>, (StatusCode, String)> {
    require_technical(&current)?;

    ToolService::new(state.pool.clone())
        .resolve_incident(id, &req.notes, current.id())
        .await
        .map_err(internal_error)?
        .map(Json)
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Incident not found".to_string()))
}

async fn list_incidents(
    State(state): State<ApiState>,
    current: CurrentUser,
    Query(query): Query<ListIncidentsQuery>,
) -> Result<Json<Vec<ToolIncident>>, (StatusCode, String)> {
    require_technical(&current)?;

    let incidents = ToolService::new(state.pool.clone())
        .list_incidents(query.tool_id)
        .await
        .map_err(internal_error)?;
    Ok(Json(incidents))
}

async fn record_calibration(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path(id): Path<i64>,
    Json(req): Json<RecordCalibrationRequest>,
) -> Result<Json<Calibration>, (StatusCode, String)> {
    require_technical(&current)?;

    let calibration = ToolService::new(state.pool.clone())
        .record_calibration(id, req, current.id())
        .await
        .map_err(lifecycle_error)?;
    Ok(Json(calibration))
}

async fn list_calibrations(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<Vec<Calibration>>, (StatusCode, String)> {
    require_technical(&current)?;

    let calibrations = ToolService::new(state.pool.clone())
        .list_calibrations(id)
        .await
        .map_err(internal_error)?;
    Ok(Json(calibrations))
}
