// handlers/auth/reset.rs - forgotten password flow

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::Response,
};
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::auth::password::{generate_reset_token, hash_password, hash_reset_token};
use crate::database::models::{UserAccount, UserInput, USERS};
use crate::database::schema::format_timestamp;
use crate::database::store::Document;
use crate::error::{ApiError, AppResult};
use crate::middleware::auth::send_token_response;
use crate::middleware::{ApiResponse, Payload};
use crate::services::Email;

use super::session::principal_of;

#[derive(Debug, Deserialize)]
pub struct ForgotRequest {
    pub email: Option<String>,
}

fn reset_fields(token: Option<String>, expire: Option<String>) -> Document {
    let mut doc = Document::new();
    doc.insert("reset_password_token".into(), json!(token));
    doc.insert("reset_password_expire".into(), json!(expire));
    doc
}

/// Absolute reset link from the request's own host.
fn reset_url(headers: &HeaderMap, token: &str) -> String {
    let host = headers
        .get("host")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("http");
    format!("{}://{}/api/v1/auth/resetpassword/{}", scheme, host, token)
}

/// POST /auth/forgotpassword - mail a single-use reset link
pub async fn forgot_password(
    State(state): State<AppState>,
    headers: HeaderMap,
    Payload(body): Payload<ForgotRequest>,
) -> AppResult<ApiResponse<&'static str>> {
    let email = body.email.unwrap_or_default().trim().to_lowercase();
    let Some(doc) = state.store.find_one(&USERS, &json!({ "email": email })).await? else {
        return Err(ApiError::not_found("There is no user with that email").into());
    };
    let user = UserAccount::from_document(doc)?;
    let id = user.id.to_string();

    let (token, hashed) = generate_reset_token();
    let expire = Utc::now() + Duration::minutes(state.config.security.reset_token_ttl_minutes);
    state
        .store
        .update(&USERS, &id, reset_fields(Some(hashed), Some(format_timestamp(expire))))
        .await?;

    let url = reset_url(&headers, &token);
    let email = Email {
        to: user.email.clone(),
        subject: "Password reset token".to_string(),
        text: format!(
            "You are receiving this email because you (or someone else) has requested the reset of a password. Please make a PUT request to: \n\n {}",
            url
        ),
    };

    if let Err(e) = state.mailer.send(email).await {
        tracing::error!(user = %id, "reset mail failed: {}", e);
        state.store.update(&USERS, &id, reset_fields(None, None)).await?;
        return Err(ApiError::internal_server_error("Email could not be sent").into());
    }

    Ok(ApiResponse::success("Email sent"))
}

#[derive(Debug, Deserialize)]
pub struct ResetRequest {
    pub password: Option<String>,
}

/// PUT /auth/resetpassword/:resettoken - set a new password with an unexpired token
pub async fn reset_password(
    State(state): State<AppState>,
    Path(reset_token): Path<String>,
    Payload(body): Payload<ResetRequest>,
) -> AppResult<Response> {
    let filter = json!({
        "reset_password_token": hash_reset_token(&reset_token),
        "reset_password_expire": { "$gt": format_timestamp(Utc::now()) },
    });
    let Some(doc) = state.store.find_one(&USERS, &filter).await? else {
        return Err(ApiError::bad_request("Invalid token").into());
    };
    let user = UserAccount::from_document(doc)?;

    let input = UserInput { password: body.password, ..Default::default() };
    input.validate_new_password()?;
    let hash = hash_password(input.password.as_deref().unwrap_or_default(), state.config.security.bcrypt_cost).await?;

    let mut changes = reset_fields(None, None);
    changes.insert("password".into(), Value::String(hash));
    state.store.update(&USERS, &user.id.to_string(), changes).await?;

    send_token_response(&state.config, &principal_of(&user), StatusCode::OK)
}
