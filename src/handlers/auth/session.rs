// handlers/auth/session.rs - register, login, logout

use axum::{extract::State, http::StatusCode, response::Response};
use axum_extra::extract::CookieJar;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::auth::password::{hash_password, verify_password};
use crate::auth::Principal;
use crate::database::models::{UserAccount, UserInput, USERS};
use crate::error::{ApiError, AppResult};
use crate::middleware::auth::{clear_token_cookie, send_token_response};
use crate::middleware::{ApiResponse, Payload};

pub(super) fn principal_of(user: &UserAccount) -> Principal {
    Principal { id: user.id, role: user.role }
}

/// POST /auth/register - create a `user` or `publisher` account and sign it in
pub async fn register(State(state): State<AppState>, Payload(input): Payload<UserInput>) -> AppResult<Response> {
    input.validate_new(false)?;
    let password = input.password.clone().unwrap_or_default();

    let mut doc = input.into_document();
    let hash = hash_password(&password, state.config.security.bcrypt_cost).await?;
    doc.insert("password".into(), Value::String(hash));
    let user = UserAccount::from_document(state.store.insert(&USERS, doc).await?)?;

    tracing::info!(user = %user.id, role = %user.role, "registered");
    send_token_response(&state.config, &principal_of(&user), StatusCode::OK)
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// POST /auth/login - exchange email and password for a token
pub async fn login(State(state): State<AppState>, Payload(body): Payload<LoginRequest>) -> AppResult<Response> {
    let (email, password) = match (body.email, body.password) {
        (Some(email), Some(password)) if !email.trim().is_empty() && !password.is_empty() => (email, password),
        _ => return Err(ApiError::bad_request("Please provide an email and password").into()),
    };

    let email = email.trim().to_lowercase();
    let Some(doc) = state.store.find_one(&USERS, &json!({ "email": email })).await? else {
        return Err(ApiError::unauthorized("Invalid credentials").into());
    };
    let user = UserAccount::from_document(doc)?;

    if !verify_password(&password, &user.password).await? {
        return Err(ApiError::unauthorized("Invalid credentials").into());
    }

    send_token_response(&state.config, &principal_of(&user), StatusCode::OK)
}

/// GET /auth/logout - replace the token cookie with one that expires shortly
pub async fn logout() -> (CookieJar, ApiResponse<Value>) {
    (clear_token_cookie(), ApiResponse::success(json!({})))
}
