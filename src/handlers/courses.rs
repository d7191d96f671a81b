// handlers/courses.rs - /api/v1/courses and /api/v1/bootcamps/:id/courses

use axum::extract::{Path, Query, State};
use axum::Json;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::auth::Principal;
use crate::database::models::{CourseInput, BOOTCAMPS, COURSES};
use crate::database::store::Document;
use crate::error::{ApiError, AppResult};
use crate::handlers::bootcamps::PUBLISHERS;
use crate::handlers::{load, load_expanded, text, with_bootcamp};
use crate::middleware::{authorize, ensure_owner, ApiResponse, Payload};
use crate::query::{build_page, PageResult, QuerySpec};
use crate::services::aggregates::refresh_average_cost;

fn not_found(id: &str) -> String {
    format!("No course with the id of {}", id)
}

/// GET /courses
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> AppResult<Json<PageResult>> {
    let page = build_page(state.store.as_ref(), &COURSES, &params, vec![with_bootcamp()], &state.config.query).await?;
    Ok(Json(page))
}

/// GET /bootcamps/:id/courses - every course of one bootcamp, unpaginated
pub async fn list_for_bootcamp(
    State(state): State<AppState>,
    Path(bootcamp_id): Path<String>,
) -> AppResult<ApiResponse<Vec<Document>>> {
    let spec = QuerySpec::filtered(json!({ "bootcamp": bootcamp_id }));
    let courses = state.store.find(&COURSES, &spec).await?;
    Ok(ApiResponse::list(courses.into_iter().map(|c| COURSES.redact(c)).collect()))
}

/// GET /courses/:id
pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> AppResult<ApiResponse<Document>> {
    let course = load_expanded(state.store.as_ref(), &COURSES, &id, &[with_bootcamp()], || not_found(&id)).await?;
    Ok(ApiResponse::success(course))
}

/// POST /bootcamps/:id/courses - only the bootcamp's owner (or an admin) may add
pub async fn create(
    State(state): State<AppState>,
    principal: Principal,
    Path(bootcamp_id): Path<String>,
    Payload(input): Payload<CourseInput>,
) -> AppResult<ApiResponse<Document>> {
    authorize(&principal, &PUBLISHERS)?;
    let bootcamp = load(state.store.as_ref(), &BOOTCAMPS, &bootcamp_id, || {
        format!("No bootcamp with the id of {}", bootcamp_id)
    })
    .await?;
    ensure_owner(
        &principal,
        bootcamp.get("user"),
        &format!("add a course to bootcamp {}", bootcamp_id),
    )?;
    input.validate_new()?;

    let mut doc = input.into_document();
    doc.insert("bootcamp".into(), Value::String(bootcamp_id.clone()));
    doc.insert("user".into(), Value::String(principal.id.to_string()));
    let course = state.store.insert(&COURSES, doc).await?;

    refresh_average_cost(state.store.as_ref(), &bootcamp_id).await?;
    Ok(ApiResponse::created(COURSES.redact(course)))
}

/// PUT /courses/:id
pub async fn update(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
    Payload(input): Payload<CourseInput>,
) -> AppResult<ApiResponse<Document>> {
    authorize(&principal, &PUBLISHERS)?;
    let course = load(state.store.as_ref(), &COURSES, &id, || not_found(&id)).await?;
    ensure_owner(&principal, course.get("user"), &format!("update course {}", id))?;
    input.validate_changes()?;

    let updated = state
        .store
        .update(&COURSES, &id, input.into_document())
        .await?
        .ok_or_else(|| ApiError::not_found(not_found(&id)))?;

    refresh_average_cost(state.store.as_ref(), text(&updated, "bootcamp")).await?;
    Ok(ApiResponse::success(COURSES.redact(updated)))
}

/// DELETE /courses/:id
pub async fn delete(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<Value>> {
    authorize(&principal, &PUBLISHERS)?;
    let course = load(state.store.as_ref(), &COURSES, &id, || not_found(&id)).await?;
    ensure_owner(&principal, course.get("user"), &format!("delete course {}", id))?;

    state.store.delete_by_id(&COURSES, &id).await?;
    refresh_average_cost(state.store.as_ref(), text(&course, "bootcamp")).await?;
    Ok(ApiResponse::success(json!({})))
}
