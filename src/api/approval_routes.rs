//! Read access to recorded approval decisions.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};

use crate::api::auth::{require_staff, CurrentUser};
use crate::api::{internal_error, ApiState};
use crate::models::{Approval, ApprovalEntity};

pub fn create_approval_router(state: ApiState) -> Router {
    Router::new()
        .route(
            "/api/approvals/:entity_type/:entity_id",
            get(list_approvals),
        )
        .with_state(state)
}

/// Decisions recorded against one entity, oldest first. The entity type
/// is case insensitive in the path ("inspection" and "INSPECTION" both
/// work).
async fn list_approvals(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path((entity_type, entity_id)): Path<(String, i64)>,
) -> Result<Json<Vec<Approval>>, (StatusCode, String)> {
    require_staff(&current)?;

    let entity = ApprovalEntity::try_from(entity_type.to_uppercase())
        .map_err(|e| (StatusCode::BAD_REQUEST, e))?;

    let approvals = sqlx::query_as::<_, Approval>(
        r#"
        SELECT * FROM approvals
        WHERE entity_type = $1 AND entity_id = $2
        ORDER BY decided_at, id
        "#,
    )
    .bind(entity.as_str())
    .bind(entity_id)
    .fetch_all(&state.pool)
    .await
    .map_err(internal_error)?;
    Ok(Json(approvals))
}
