// handlers/reviews.rs - /api/v1/reviews and /api/v1/bootcamps/:id/reviews

use axum::extract::{Path, Query, State};
use axum::Json;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::auth::Principal;
use crate::database::models::{ReviewInput, BOOTCAMPS, REVIEWS};
use crate::database::store::Document;
use crate::error::{ApiError, AppResult};
use crate::handlers::{load, load_expanded, text, with_bootcamp};
use crate::middleware::{authorize, ensure_owner, ApiResponse, Payload};
use crate::query::{build_page, PageResult, QuerySpec};
use crate::services::aggregates::refresh_average_rating;
use crate::types::Role;

const REVIEWERS: [Role; 2] = [Role::User, Role::Admin];

/// GET /reviews
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> AppResult<Json<PageResult>> {
    let page = build_page(state.store.as_ref(), &REVIEWS, &params, vec![with_bootcamp()], &state.config.query).await?;
    Ok(Json(page))
}

/// GET /bootcamps/:id/reviews
pub async fn list_for_bootcamp(
    State(state): State<AppState>,
    Path(bootcamp_id): Path<String>,
) -> AppResult<ApiResponse<Vec<Document>>> {
    let spec = QuerySpec::filtered(json!({ "bootcamp": bootcamp_id }));
    let reviews = state.store.find(&REVIEWS, &spec).await?;
    Ok(ApiResponse::list(reviews.into_iter().map(|r| REVIEWS.redact(r)).collect()))
}

/// GET /reviews/:id
pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> AppResult<ApiResponse<Document>> {
    let review = load_expanded(state.store.as_ref(), &REVIEWS, &id, &[with_bootcamp()], || {
        format!("No review found with the id of {}", id)
    })
    .await?;
    Ok(ApiResponse::success(review))
}

/// POST /bootcamps/:id/reviews - one review per user and bootcamp
pub async fn create(
    State(state): State<AppState>,
    principal: Principal,
    Path(bootcamp_id): Path<String>,
    Payload(input): Payload<ReviewInput>,
) -> AppResult<ApiResponse<Document>> {
    authorize(&principal, &REVIEWERS)?;
    load(state.store.as_ref(), &BOOTCAMPS, &bootcamp_id, || {
        format!("No bootcamp with the id of {}", bootcamp_id)
    })
    .await?;
    input.validate_new()?;

    let mut doc = input.into_document();
    doc.insert("bootcamp".into(), Value::String(bootcamp_id.clone()));
    doc.insert("user".into(), Value::String(principal.id.to_string()));
    let review = state.store.insert(&REVIEWS, doc).await?;

    refresh_average_rating(state.store.as_ref(), &bootcamp_id).await?;
    Ok(ApiResponse::created(REVIEWS.redact(review)))
}

/// PUT /reviews/:id
pub async fn update(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
    Payload(input): Payload<ReviewInput>,
) -> AppResult<ApiResponse<Document>> {
    authorize(&principal, &REVIEWERS)?;
    let review = load(state.store.as_ref(), &REVIEWS, &id, || format!("No review with the id of {}", id)).await?;
    ensure_owner(&principal, review.get("user"), &format!("update review {}", id))?;
    input.validate_changes()?;

    let updated = state
        .store
        .update(&REVIEWS, &id, input.into_document())
        .await?
        .ok_or_else(|| ApiError::not_found(format!("No review with the id of {}", id)))?;

    refresh_average_rating(state.store.as_ref(), text(&updated, "bootcamp")).await?;
    Ok(ApiResponse::success(REVIEWS.redact(updated)))
}

/// DELETE /reviews/:id
pub async fn delete(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<Value>> {
    authorize(&principal, &REVIEWERS)?;
    let review = load(state.store.as_ref(), &REVIEWS, &id, || format!("No review with the id of {}", id)).await?;
    ensure_owner(&principal, review.get("user"), &format!("delete review {}", id))?;

    state.store.delete_by_id(&REVIEWS, &id).await?;
    refresh_average_rating(state.store.as_ref(), text(&review, "bootcamp")).await?;
    Ok(ApiResponse::success(json!({})))
}
