//! Client company endpoints.
//!
//! CLIENT-role accounts see only the company whose contact email matches
//! their own; staff see everything.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};

use crate::api::auth::{require_admin, require_staff, CurrentUser};
use crate::api::{internal_error, ApiState};
use crate::database::{
    AuditAction, AuditLogger, ClientService, CreateClientRequest, NewAuditEntry,
    UpdateClientRequest,
};
use crate::models::Client;

pub fn create_client_router(state: ApiState) -> Router {
    Router::new()
        .route("/api/clients", post(create_client).get(list_clients))
        .route(
            "/api/clients/:id",
            get(get_client).put(update_client).delete(delete_client),
        )
        .with_state(state)
}

async fn create_client(
    State(state): State<ApiState>,
    current: CurrentUser,
    Json(req): Json<CreateClientRequest>,
) -> Result<Json<Client>, (StatusCode, String)> {
    require_staff(&current)?;

    let client = ClientService::new(state.pool.clone())
        .create(req, current.id())
        .await
        .map_err(internal_error)?;
    Ok(Json(client))
}

async fn list_clients(
    State(state): State<ApiState>,
    current: CurrentUser,
) -> Result<Json<Vec<Client>>, (StatusCode, String)> {
    let service = ClientService::new(state.pool.clone());
    let clients = if current.is_client() {
        service.list_for_client_user(current.id()).await
    } else {
        service.list().await
    }
    .map_err(internal_error)?;
    Ok(Json(clients))
}

async fn get_client(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<Client>, (StatusCode, String)> {
    let client = ClientService::new(state.pool.clone())
        .find_by_id(id)
        .await
        .map_err(internal_error)?
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Client not found".to_string()))?;

    if current.is_client() && client.email != current.user.email {
        return Err((StatusCode::FORBIDDEN, "Access denied".to_string()));
    }
    Ok(Json(client))
}

async fn update_client(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path(id): Path<i64>,
    Json(req): Json<UpdateClientRequest>,
) -> Result<Json<Client>, (StatusCode, String)> {
    require_staff(&current)?;

    ClientService::new(state.pool.clone())
        .update(id, req, current.id())
        .await
        .map_err(internal_error)?
        .map(Json)
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Client not found".to_string()))
}

async fn delete_client(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, (StatusCode, String)> {
    require_admin(&current)?;

    let service = ClientService::new(state.pool.clone());
    let client = service
        .find_by_id(id)
        .await
        .map_err(internal_error)?
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Client not found".to_string()))?;

    let deleted = service.delete(id).await.map_err(internal_error)?;
    if !deleted {
        return Err((StatusCode::NOT_FOUND, "Client not found".to_string()));
    }

    AuditLogger::new(state.pool.clone())
        .append(NewAuditEntry {
            user_id: Some(current.id()),
            action: AuditAction::Delete,
            entity_type: "CLIENT",
            entity_id: id,
            changes: serde_json::json!({ "name": client.name }),
            ip_address: current.ip.clone(),
        })
        .await
        .map_err(internal_error)?;

    Ok(StatusCode::NO_CONTENT)
}
