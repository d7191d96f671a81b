// handlers/auth/account.rs - the signed-in user's own account

use axum::{extract::State, http::StatusCode, response::Response};
use serde::Deserialize;
use serde_json::Value;

use crate::app::AppState;
use crate::auth::password::{hash_password, verify_password};
use crate::auth::Principal;
use crate::database::models::{UserAccount, UserInput, USERS};
use crate::database::store::Document;
use crate::error::{ApiError, AppResult};
use crate::handlers::load;
use crate::middleware::auth::send_token_response;
use crate::middleware::{ApiResponse, Payload};

use super::session::principal_of;

/// GET /auth/me
pub async fn me(State(state): State<AppState>, principal: Principal) -> AppResult<ApiResponse<Document>> {
    let id = principal.id.to_string();
    let user = load(state.store.as_ref(), &USERS, &id, || format!("No user with the id of {}", id)).await?;
    Ok(ApiResponse::success(USERS.redact(user)))
}

#[derive(Debug, Deserialize)]
pub struct DetailsRequest {
    pub name: Option<String>,
    pub email: Option<String>,
}

/// PUT /auth/updatedetails - name and email only
pub async fn update_details(
    State(state): State<AppState>,
    principal: Principal,
    Payload(body): Payload<DetailsRequest>,
) -> AppResult<ApiResponse<Document>> {
    let input = UserInput { name: body.name, email: body.email, ..Default::default() };
    input.validate_changes(false)?;

    let id = principal.id.to_string();
    let user = state
        .store
        .update(&USERS, &id, input.into_document())
        .await?
        .ok_or_else(|| ApiError::not_found(format!("No user with the id of {}", id)))?;
    Ok(ApiResponse::success(USERS.redact(user)))
}

#[derive(Debug, Deserialize)]
pub struct PasswordChange {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

/// PUT /auth/updatepassword - requires the current password, answers with a fresh token
pub async fn update_password(
    State(state): State<AppState>,
    principal: Principal,
    Payload(body): Payload<PasswordChange>,
) -> AppResult<Response> {
    let id = principal.id.to_string();
    let doc = load(state.store.as_ref(), &USERS, &id, || format!("No user with the id of {}", id)).await?;
    let user = UserAccount::from_document(doc)?;

    let current = body.current_password.unwrap_or_default();
    if !verify_password(&current, &user.password).await? {
        return Err(ApiError::unauthorized("Password is incorrect").into());
    }

    let check = UserInput { password: body.new_password.clone(), ..Default::default() };
    check.validate_new_password()?;
    let hash = hash_password(&body.new_password.unwrap_or_default(), state.config.security.bcrypt_cost).await?;

    let mut changes = Document::new();
    changes.insert("password".into(), Value::String(hash));
    state.store.update(&USERS, &id, changes).await?;

    send_token_response(&state.config, &principal_of(&user), StatusCode::OK)
}
