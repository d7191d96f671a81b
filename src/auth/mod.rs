pub mod password;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::SecurityConfig;
use crate::types::Role;

/// Authenticated identity of one request. Built from a verified token and the
/// stored account; never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub id: Uuid,
    pub role: Role,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(principal: &Principal, expiry_hours: u64) -> Self {
        let now = Utc::now();
        let exp = (now + Duration::hours(expiry_hours as i64)).timestamp();

        Self {
            sub: principal.id,
            role: principal.role,
            exp,
            iat: now.timestamp(),
        }
    }
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("JWT secret not configured")]
    InvalidSecret,

    #[error("JWT generation error: {0}")]
    Generation(String),

    #[error("Token expired")]
    Expired,

    #[error("Invalid token: {0}")]
    Invalid(String),
}

pub fn encode_claims(claims: &Claims, security: &SecurityConfig) -> Result<String, TokenError> {
    if security.jwt_secret.is_empty() {
        return Err(TokenError::InvalidSecret);
    }

    let encoding_key = EncodingKey::from_secret(security.jwt_secret.as_bytes());
    encode(&Header::default(), claims, &encoding_key).map_err(|e| TokenError::Generation(e.to_string()))
}

/// Sign an HS256 token for `principal` expiring after the configured hours.
pub fn issue_token(principal: &Principal, security: &SecurityConfig) -> Result<String, TokenError> {
    encode_claims(&Claims::new(principal, security.jwt_expiry_hours), security)
}

/// Check signature and expiry and return the claims.
pub fn verify_token(token: &str, security: &SecurityConfig) -> Result<Claims, TokenError> {
    if security.jwt_secret.is_empty() {
        return Err(TokenError::InvalidSecret);
    }

    let decoding_key = DecodingKey::from_secret(security.jwt_secret.as_bytes());
    let mut validation = Validation::default();
    validation.leeway = 0;

    decode::<Claims>(token, &decoding_key, &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Invalid(e.to_string()),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    fn principal(role: Role) -> Principal {
        Principal { id: Uuid::new_v4(), role }
    }

    #[test]
    fn issued_tokens_verify_to_the_same_identity() {
        let security = AppConfig::development().security;
        let p = principal(Role::Publisher);
        let token = issue_token(&p, &security).unwrap();
        let claims = verify_token(&token, &security).unwrap();
        assert_eq!(claims.sub, p.id);
        assert_eq!(claims.role, Role::Publisher);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let security = AppConfig::development().security;
        let now = Utc::now().timestamp();
        let claims = Claims { sub: Uuid::new_v4(), role: Role::User, iat: now - 7200, exp: now - 3600 };
        let token = encode_claims(&claims, &security).unwrap();
        assert!(matches!(verify_token(&token, &security), Err(TokenError::Expired)));
    }

    #[test]
    fn tampered_tokens_are_rejected() {
        let security = AppConfig::development().security;
        let token = issue_token(&principal(Role::User), &security).unwrap();
        let mut other = security.clone();
        other.jwt_secret = "another-secret".to_string();
        assert!(matches!(verify_token(&token, &other), Err(TokenError::Invalid(_))));

        let mut forged = token.clone();
        forged.push('x');
        assert!(verify_token(&forged, &security).is_err());
    }

    #[test]
    fn missing_secret_is_an_error() {
        let mut security = AppConfig::development().security;
        security.jwt_secret.clear();
        assert!(matches!(issue_token(&principal(Role::User), &security), Err(TokenError::InvalidSecret)));
    }
}
