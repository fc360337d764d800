//! User account endpoints. Account creation and edits are admin-only;
//! every staff member can read the directory for assignment pickers.

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
use crate::database::{CreateUserRequest, UpdateUserRequest, UserService};
use crate::models::{Role, User};

#[derive(Debug, Deserialize)]
pub struct ListUsersQuery {
    pub role: Option<Role>,
}

pub fn create_user_router(state: ApiState) -> Router {
    Router::new()
        .route("/api/users", post(create_user).get(list_users))
        .route("/api/users/:id", get(get_user).put(update_user))
        .with_state(state)
}

async fn create_user(
    State(state): State<ApiState>,
    current: CurrentUser,
    Json(req): Json<CreateUserRequest>,
) -> Result<Json<User>, (StatusCode, String)> {
    require_admin(&current)?;

    let user = UserService::new(state.pool.clone())
        .create(req)
        .await
        .map_err(internal_error)?;
    Ok(Json(user))
}

async fn list_users(
    State(state): State<ApiState>,
    _current: CurrentUser,
    Query(query): Query<ListUsersQuery>,
) -> Result<Json<Vec<User>>, (StatusCode, String)> {
    let users = UserService::new(state.pool.clone())
        .list(query.role)
        .await
        .map_err(internal_error)?;
    Ok(Json(users))
}

async fn get_user(
    State(state): State<ApiState>,
    _current: CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<User>, (StatusCode, String)> {
    UserService::new(state.pool.clone())
        .find_by_id(id)
        .await
        .map_err(internal_error)?
        .map(Json)
        .ok_or_else(|| (StatusCode::NOT_FOUND, "User not found".to_string()))
}

async fn update_user(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path(id): Path<i64>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<Json<User>, (StatusCode, String)> {
    require_admin(&current)?;

    UserService::new(state.pool.clone())
        .update(id, req)
        .await
        .map_err(internal_error)?
        .map(Json)
        .ok_or_else(|| (StatusCode::NOT_FOUND, "User not found".to_string()))
}
