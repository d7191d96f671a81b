use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde_json::{json, Value};
use time::{Duration, OffsetDateTime};

use crate::app::AppState;
use crate::auth::{issue_token, verify_token, Principal};
use crate::config::AppConfig;
use crate::database::models::USERS;
use crate::error::{ApiError, AppError, AppResult};
use crate::types::Role;

/// Cookie carrying the token for browser clients.
pub const TOKEN_COOKIE: &str = "token";

const NOT_AUTHORIZED: &str = "Not authorized to access this route";

/// Token from `Authorization: Bearer <token>`, else from the `token` cookie.
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    CookieJar::from_headers(headers)
        .get(TOKEN_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|t| !t.is_empty())
}

/// Verify the request credential and load the account it names.
pub async fn authenticate(state: &AppState, headers: &HeaderMap) -> AppResult<Principal> {
    let token = extract_token(headers).ok_or_else(|| ApiError::unauthorized(NOT_AUTHORIZED))?;
    let claims = verify_token(&token, &state.config.security).map_err(|e| {
        tracing::debug!("rejected token: {}", e);
        ApiError::unauthorized(NOT_AUTHORIZED)
    })?;

    let user = state
        .store
        .find_by_id(&USERS, &claims.sub.to_string())
        .await?
        .ok_or_else(|| ApiError::unauthorized(NOT_AUTHORIZED))?;
    let role = user
        .get("role")
        .and_then(Value::as_str)
        .and_then(|r| r.parse::<Role>().ok())
        .ok_or_else(|| ApiError::unauthorized(NOT_AUTHORIZED))?;

    Ok(Principal { id: claims.sub, role })
}

/// Fails with 403 unless the principal holds one of `roles`.
pub fn authorize(principal: &Principal, roles: &[Role]) -> Result<(), ApiError> {
    if roles.contains(&principal.role) {
        Ok(())
    } else {
        Err(ApiError::forbidden(format!(
            "User role {} is not authorized to access this route",
            principal.role
        )))
    }
}

/// Owners and admins may mutate a resource. `action` names what was attempted,
/// e.g. `update bootcamp 5d71...`.
pub fn ensure_owner(principal: &Principal, owner: Option<&Value>, action: &str) -> Result<(), ApiError> {
    let id = principal.id.to_string();
    let owns = owner.and_then(Value::as_str) == Some(id.as_str());
    if owns || principal.is_admin() {
        Ok(())
    } else {
        Err(ApiError::forbidden(format!("User {} is not authorized to {}", id, action)))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for Principal {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        authenticate(state, &parts.headers).await
    }
}

/// Issue a token for `principal`, set it as a cookie and return it in the body.
pub fn send_token_response(config: &AppConfig, principal: &Principal, status: StatusCode) -> AppResult<Response> {
    let token = issue_token(principal, &config.security)?;
    let expires = OffsetDateTime::now_utc() + Duration::days(config.security.jwt_cookie_expire_days);
    let cookie = Cookie::build((TOKEN_COOKIE, token.clone()))
        .path("/")
        .http_only(true)
        .secure(config.is_production())
        .expires(expires);

    let jar = CookieJar::new().add(cookie);
    Ok((status, jar, Json(json!({ "success": true, "token": token }))).into_response())
}

/// Overwrite the token cookie with a placeholder that expires in ten seconds.
pub fn clear_token_cookie() -> CookieJar {
    let cookie = Cookie::build((TOKEN_COOKIE, "none"))
        .path("/")
        .http_only(true)
        .expires(OffsetDateTime::now_utc() + Duration::seconds(10));
    CookieJar::new().add(cookie)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use uuid::Uuid;

    fn principal(role: Role) -> Principal {
        Principal { id: Uuid::new_v4(), role }
    }

    #[test]
    fn bearer_header_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer abc.def.ghi"));
        headers.insert("cookie", HeaderValue::from_static("token=from-cookie"));
        assert_eq!(extract_token(&headers).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn cookie_is_used_without_header() {
        let mut headers = HeaderMap::new();
        headers.insert("cookie", HeaderValue::from_static("theme=dark; token=from-cookie"));
        assert_eq!(extract_token(&headers).as_deref(), Some("from-cookie"));
    }

    #[test]
    fn malformed_header_yields_nothing() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Basic dXNlcjpwYXNz"));
        assert_eq!(extract_token(&headers), None);
        headers.insert("authorization", HeaderValue::from_static("Bearer "));
        assert_eq!(extract_token(&headers), None);
    }

    #[test]
    fn roles_outside_the_list_are_forbidden() {
        let err = authorize(&principal(Role::User), &[Role::Publisher, Role::Admin]).unwrap_err();
        assert_eq!(err.status_code(), 403);
        assert_eq!(err.message(), "User role user is not authorized to access this route");
        assert!(authorize(&principal(Role::Publisher), &[Role::Publisher, Role::Admin]).is_ok());
    }

    #[test]
    fn ownership_rules() {
        let owner = principal(Role::Publisher);
        let other = principal(Role::Publisher);
        let admin = principal(Role::Admin);
        let owner_id = Value::String(owner.id.to_string());

        assert!(ensure_owner(&owner, Some(&owner_id), "update bootcamp 1").is_ok());
        assert!(ensure_owner(&admin, Some(&owner_id), "update bootcamp 1").is_ok());

        let err = ensure_owner(&other, Some(&owner_id), "update bootcamp 1").unwrap_err();
        assert_eq!(err.status_code(), 403);
        assert_eq!(err.message(), format!("User {} is not authorized to update bootcamp 1", other.id));
    }

    #[test]
    fn token_response_sets_http_only_cookie() {
        let config = AppConfig::development();
        let response = send_token_response(&config, &principal(Role::User), StatusCode::OK).unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let cookie = response.headers().get("set-cookie").unwrap().to_str().unwrap();
        assert!(cookie.starts_with("token="));
        assert!(cookie.contains("HttpOnly"));
        assert!(!cookie.contains("Secure"));
        assert!(cookie.contains("Expires="));
    }
}
