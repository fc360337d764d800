//! Read access to the append-only audit trail. Admin only.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use serde::Deserialize;

use crate::api::auth::{require_admin, CurrentUser};
use crate::api::{internal_error, ApiState};
use crate::database::{AuditAction, AuditLogEntry, AuditLogger};

const DEFAULT_LIMIT: i64 = 50;

#[derive(Debug, Deserialize)]
pub struct RecentAuditQuery {
    pub user_id: Option<i64>,
    pub action: Option<AuditAction>,
    pub limit: Option<i64>,
}

pub fn create_audit_router(state: ApiState) -> Router {
    Router::new()
        .route("/api/audit", get(recent_audit))
        .route("/api/audit/:entity_type/:entity_id", get(entity_history))
        .with_state(state)
}

async fn recent_audit(
    State(state): State<ApiState>,
    current: CurrentUser,
    Query(query): Query<RecentAuditQuery>,
) -> Result<Json<Vec<AuditLogEntry>>, (StatusCode, String)> {
    require_admin(&current)?;

    let entries = AuditLogger::new(state.pool.clone())
        .recent(
            query.user_id,
            query.action,
            query.limit.unwrap_or(DEFAULT_LIMIT),
        )
        .await
        .map_err(internal_error)?;
    Ok(Json(entries))
}

async fn entity_history(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path((entity_type, entity_id)): Path<(String, i64)>,
) -> Result<Json<Vec<AuditLogEntry>>, (StatusCode, String)> {
    require_admin(&current)?;

    let entries = AuditLogger::new(state.pool.clone())
        .history(&entity_type.to_uppercase(), entity_id)
        .await
        .map_err(internal_error)?;
    Ok(Json(entries))
}
