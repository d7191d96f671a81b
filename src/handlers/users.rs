// handlers/users.rs - /api/v1/users, admin only

use axum::extract::{Path, Query, State};
use axum::Json;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::auth::password::hash_password;
use crate::auth::Principal;
use crate::database::models::{UserInput, USERS};
use crate::database::store::Document;
use crate::error::{ApiError, AppResult};
use crate::handlers::load;
use crate::middleware::{authorize, ApiResponse, Payload};
use crate::query::{build_page, PageResult};
use crate::types::Role;

const ADMIN: [Role; 1] = [Role::Admin];

fn not_found(id: &str) -> String {
    format!("No user with the id of {}", id)
}

/// GET /users
pub async fn list(
    State(state): State<AppState>,
    principal: Principal,
    Query(params): Query<Vec<(String, String)>>,
) -> AppResult<Json<PageResult>> {
    authorize(&principal, &ADMIN)?;
    let page = build_page(state.store.as_ref(), &USERS, &params, vec![], &state.config.query).await?;
    Ok(Json(page))
}

/// GET /users/:id
pub async fn get(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<Document>> {
    authorize(&principal, &ADMIN)?;
    let user = load(state.store.as_ref(), &USERS, &id, || not_found(&id)).await?;
    Ok(ApiResponse::success(USERS.redact(user)))
}

/// POST /users - admins may create accounts of any role
pub async fn create(
    State(state): State<AppState>,
    principal: Principal,
    Payload(input): Payload<UserInput>,
) -> AppResult<ApiResponse<Document>> {
    authorize(&principal, &ADMIN)?;
    input.validate_new(true)?;
    let password = input.password.clone().unwrap_or_default();

    let mut doc = input.into_document();
    let hash = hash_password(&password, state.config.security.bcrypt_cost).await?;
    doc.insert("password".into(), Value::String(hash));
    let user = state.store.insert(&USERS, doc).await?;
    Ok(ApiResponse::created(USERS.redact(user)))
}

/// PUT /users/:id
pub async fn update(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
    Payload(input): Payload<UserInput>,
) -> AppResult<ApiResponse<Document>> {
    authorize(&principal, &ADMIN)?;
    input.validate_changes(true)?;
    let password = input.password.clone();

    let mut changes = input.into_document();
    if let Some(password) = password {
        let hash = hash_password(&password, state.config.security.bcrypt_cost).await?;
        changes.insert("password".into(), Value::String(hash));
    }

    let user = state
        .store
        .update(&USERS, &id, changes)
        .await?
        .ok_or_else(|| ApiError::not_found(not_found(&id)))?;
    Ok(ApiResponse::success(USERS.redact(user)))
}

/// DELETE /users/:id
pub async fn delete(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<Value>> {
    authorize(&principal, &ADMIN)?;
    if !state.store.delete_by_id(&USERS, &id).await? {
        return Err(ApiError::not_found(not_found(&id)).into());
    }
    Ok(ApiResponse::success(json!({})))
}
