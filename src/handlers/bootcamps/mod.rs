// handlers/bootcamps/mod.rs - /api/v1/bootcamps

mod photo;
mod radius;

pub use photo::upload_photo;
pub use radius::within_radius;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::auth::Principal;
use crate::database::models::{BootcampInput, BOOTCAMPS};
use crate::database::store::Document;
use crate::error::{ApiError, AppResult};
use crate::handlers::{load, with_courses};
use crate::middleware::{authorize, ensure_owner, ApiResponse, Payload};
use crate::query::{build_page, PageResult};
use crate::services::bootcamps::{cascade_delete, prepare_changes, prepare_new};
use crate::types::Role;

pub(crate) const PUBLISHERS: [Role; 2] = [Role::Publisher, Role::Admin];

pub(crate) fn not_found(id: &str) -> String {
    format!("Bootcamp not found with id of {}", id)
}

/// GET /bootcamps - filtered, paginated listing with each bootcamp's courses
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> AppResult<Json<PageResult>> {
    let page = build_page(state.store.as_ref(), &BOOTCAMPS, &params, vec![with_courses()], &state.config.query).await?;
    Ok(Json(page))
}

/// GET /bootcamps/:id
pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> AppResult<ApiResponse<Document>> {
    let bootcamp = load(state.store.as_ref(), &BOOTCAMPS, &id, || not_found(&id)).await?;
    Ok(ApiResponse::success(BOOTCAMPS.redact(bootcamp)))
}

/// POST /bootcamps - publishers own at most one bootcamp; admins any number
pub async fn create(
    State(state): State<AppState>,
    principal: Principal,
    Payload(input): Payload<BootcampInput>,
) -> AppResult<ApiResponse<Document>> {
    authorize(&principal, &PUBLISHERS)?;
    let owner = principal.id.to_string();

    if !principal.is_admin() {
        let published = state.store.find_one(&BOOTCAMPS, &json!({ "user": owner })).await?;
        if published.is_some() {
            return Err(ApiError::bad_request(format!(
                "The user with ID {} has already published a bootcamp",
                owner
            ))
            .into());
        }
    }

    let doc = prepare_new(state.geocoder.as_ref(), input, &owner).await?;
    let bootcamp = state.store.insert(&BOOTCAMPS, doc).await?;
    tracing::info!(bootcamp = ?bootcamp.get("id"), user = %owner, "bootcamp created");
    Ok(ApiResponse::created(BOOTCAMPS.redact(bootcamp)))
}

/// PUT /bootcamps/:id
pub async fn update(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
    Payload(input): Payload<BootcampInput>,
) -> AppResult<ApiResponse<Document>> {
    authorize(&principal, &PUBLISHERS)?;
    let bootcamp = load(state.store.as_ref(), &BOOTCAMPS, &id, || not_found(&id)).await?;
    ensure_owner(&principal, bootcamp.get("user"), &format!("update bootcamp {}", id))?;

    let changes = prepare_changes(state.geocoder.as_ref(), input).await?;
    let updated = state
        .store
        .update(&BOOTCAMPS, &id, changes)
        .await?
        .ok_or_else(|| ApiError::not_found(not_found(&id)))?;
    Ok(ApiResponse::success(BOOTCAMPS.redact(updated)))
}

/// DELETE /bootcamps/:id - also removes the bootcamp's courses and reviews
pub async fn delete(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<Value>> {
    authorize(&principal, &PUBLISHERS)?;
    let bootcamp = load(state.store.as_ref(), &BOOTCAMPS, &id, || not_found(&id)).await?;
    ensure_owner(&principal, bootcamp.get("user"), &format!("delete bootcamp {}", id))?;

    cascade_delete(state.store.as_ref(), &id).await?;
    Ok(ApiResponse::success(json!({})))
}
