//! People endpoints: the register of named individuals (client contacts,
//! site representatives, subcontractors) and their credentials.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;

use crate::api::auth::{require_technical, CurrentUser};
use crate::api::{internal_error, ApiState};
use crate::database::{
    AddCredentialRequest, CreatePersonRequest, PersonService, UpdatePersonRequest,
};
use crate::models::{CredentialStatus, Person, PersonCredential, PersonType};

#[derive(Debug, Deserialize)]
pub struct ListPeopleQuery {
    pub person_type: Option<PersonType>,
    pub client_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct SetCredentialStatusRequest {
    pub status: CredentialStatus,
}

pub fn create_person_router(state: ApiState) -> Router {
    Router::new()
        .route("/api/people", post(create_person).get(list_people))
        .route("/api/people/:id", get(get_person).put(update_person))
        .route(
            "/api/people/:id/credentials",
            post(add_credential).get(list_credentials),
        )
        .route("/api/credentials/:id/status", post(set_credential_status))
        .with_state(state)
}

async fn create_person(
    State(state): State<ApiState>,
    current: CurrentUser,
    Json(req): Json<CreatePersonRequest>,
) -> Result<Json<Person>, (StatusCode, String)> {
    require_technical(&current)?;

    let person = PersonService::new(state.pool.clone())
        .create(req, current.id())
        .await
        .map_err(internal_error)?;
    Ok(Json(person))
}

async fn list_people(
    State(state): State<ApiState>,
    current: CurrentUser,
    Query(query): Query<ListPeopleQuery>,
) -> Result<Json<Vec<Person>>, (StatusCode, String)> {
    require_technical(&current)?;

    let people = PersonService::new(state.pool.clone())
        .list(query.person_type, query.client_id)
        .await
        .map_err(internal_error)?;
    Ok(Json(people))
}

async fn get_person(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<Person>, (StatusCode, String)> {
    require_technical(&current)?;

    PersonService::new(state.pool.clone())
        .find_by_id(id)
        .await
        .map_err(internal_error)?
        .map(Json)
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Person not found".to_string()))
}

async fn update_person(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path(id): Path<i64>,
    Json(req): Json<UpdatePersonRequest>,
) -> Result<Json<Person>, (StatusCode, String)> {
    require_technical(&current)?;

    PersonService::new(state.pool.clone())
        .update(id, req, current.id())
        .await
        .map_err(internal_error)?
        .map(Json)
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Person not found".to_string()))
}

async fn add_credential(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path(id): Path<i64>,
    Json(req): Json<AddCredentialRequest>,
) -> Result<Json<PersonCredential>, (StatusCode, String)> {
    require_technical(&current)?;

    let service = PersonService::new(state.pool.clone());
    service
        .find_by_id(id)
        .await
        .map_err(internal_error)?
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Person not found".to_string()))?;

    let credential = service
        .add_credential(id, req)
        .await
        .map_err(internal_error)?;
    Ok(Json(credential))
}

async fn list_credentials(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<Vec<PersonCredential>>, (StatusCode, String)> {
    require_technical(&current)?;

    let credentials = PersonService::new(state.pool.clone())
        .list_credentials(id)
        .await
        .map_err(internal_error)?;
    Ok(Json(credentials))
}

async fn set_credential_status(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path(id): Path<i64>,
    Json(req): Json<SetCredentialStatusRequest>,
) -> Result<Json<PersonCredential>, (StatusCode, String)> {
    require_technical(&current)?;

    PersonService::new(state.pool.clone())
        .set_credential_status(id, req.status)
        .await
        .map_err(internal_error)?
        .map(Json)
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Credential not found".to_string()))
}
