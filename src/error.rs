// HTTP API Error Types
use axum::extract::multipart::MultipartError;
use axum::extract::rejection::JsonRejection;
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::auth::password::PasswordError;
use crate::auth::TokenError;
use crate::database::store::StoreError;
use crate::services::geocoder::GeocodeError;
use crate::services::mailer::MailError;

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug, Clone, PartialEq)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),
    ValidationError { messages: Vec<String> },

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 429 Too Many Requests
    TooManyRequests(String),

    // 500 Internal Server Error
    InternalServerError(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::ValidationError { .. } => 400,
            ApiError::Unauthorized(_) => 401,
            ApiError::Forbidden(_) => 403,
            ApiError::NotFound(_) => 404,
            ApiError::TooManyRequests(_) => 429,
            ApiError::InternalServerError(_) => 500,
            ApiError::ServiceUnavailable(_) => 503,
        }
    }

    /// Single-line message; validation lists are joined with commas
    pub fn message(&self) -> String {
        match self {
            ApiError::ValidationError { messages } => messages.join(","),
            ApiError::BadRequest(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::TooManyRequests(msg)
            | ApiError::InternalServerError(msg)
            | ApiError::ServiceUnavailable(msg) => msg.clone(),
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        match self {
            ApiError::ValidationError { messages } => json!({
                "success": false,
                "error": messages,
            }),
            _ => json!({
                "success": false,
                "error": self.message(),
            }),
        }
    }
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn validation_error(messages: Vec<String>) -> Self {
        ApiError::ValidationError { messages }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn too_many_requests(message: impl Into<String>) -> Self {
        ApiError::TooManyRequests(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}

/// Anything a handler can fail with. Converted to the wire shape by [`normalize`].
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Geocode(#[from] GeocodeError),

    #[error(transparent)]
    Mail(#[from] MailError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Json(#[from] JsonRejection),

    #[error("{0}")]
    Multipart(#[from] MultipartError),
}

pub type AppResult<T> = Result<T, AppError>;

/// Map any request-time failure onto the error model.
///
/// Store failure shapes are checked first (cast, duplicate, validation), then
/// errors that are already an [`ApiError`] pass through unchanged. Everything
/// else becomes a 500 carrying its own message. The raw error is logged before
/// it is mapped, so constraint names and driver details stay in the log.
pub fn normalize(err: AppError) -> ApiError {
    let raw = raw_detail(&err);
    let api = match err {
        AppError::Store(StoreError::Cast { ref value, .. }) => {
            ApiError::not_found(format!("Resource not found with id of {}", value))
        }
        AppError::Store(StoreError::Duplicate(_)) => ApiError::bad_request("Duplicate Field"),
        AppError::Store(StoreError::Validation(ref errors)) => {
            ApiError::validation_error(errors.iter().map(|e| e.message.clone()).collect())
        }
        AppError::Store(StoreError::UnknownField(ref field)) => {
            ApiError::validation_error(vec![format!("Unknown field '{}'", field)])
        }
        AppError::Store(StoreError::UnsupportedOperator(ref op)) => {
            ApiError::validation_error(vec![format!("Unsupported operator '{}'", op)])
        }
        AppError::Json(ref rejection) => ApiError::validation_error(vec![rejection.body_text()]),
        AppError::Multipart(ref e) => ApiError::bad_request(e.body_text()),
        AppError::Api(api) => api,
        ref other => {
            let message = other.to_string();
            if message.trim().is_empty() {
                ApiError::internal_server_error("server error")
            } else {
                ApiError::internal_server_error(message)
            }
        }
    };

    if api.status_code() >= 500 {
        tracing::error!(status = api.status_code(), error = %raw, "{}", api);
    } else {
        tracing::warn!(status = api.status_code(), error = %raw, "{}", api);
    }

    api
}

fn raw_detail(err: &AppError) -> String {
    format!("{err:?}")
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        normalize(self).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::store::FieldError;

    #[test]
    fn cast_failure_becomes_not_found_naming_the_value() {
        let err = StoreError::Cast {
            field: "id".into(),
            kind: "uuid",
            value: "abc".into(),
        };
        let api = normalize(err.into());
        assert_eq!(api.status_code(), 404);
        assert_eq!(api.message(), "Resource not found with id of abc");
    }

    #[test]
    fn duplicate_key_becomes_bad_request() {
        let api = normalize(StoreError::Duplicate("bootcamps_name_key".into()).into());
        assert_eq!(api, ApiError::bad_request("Duplicate Field"));
    }

    #[test]
    fn logged_detail_keeps_what_the_client_does_not_see() {
        let err: AppError = StoreError::Duplicate("bootcamps_name_key".into()).into();
        assert!(raw_detail(&err).contains("bootcamps_name_key"));
        assert!(!normalize(err).message().contains("bootcamps_name_key"));

        let err: AppError = StoreError::Cast { field: "id".into(), kind: "uuid", value: "abc".into() }.into();
        let detail = raw_detail(&err);
        assert!(detail.contains("uuid") && detail.contains("\"id\""));
    }

    #[test]
    fn validation_failure_keeps_every_message() {
        let err = StoreError::Validation(vec![
            FieldError::new("name", "Please add a name"),
            FieldError::new("description", "Please add a description"),
        ]);
        let api = normalize(err.into());
        assert_eq!(api.status_code(), 400);
        assert_eq!(
            api.to_json(),
            json!({"success": false, "error": ["Please add a name", "Please add a description"]})
        );
    }

    #[test]
    fn api_errors_pass_through_unchanged() {
        let api = normalize(ApiError::forbidden("nope").into());
        assert_eq!(api, ApiError::forbidden("nope"));
    }

    #[test]
    fn unclassified_errors_become_server_errors() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let api = normalize(io.into());
        assert_eq!(api.status_code(), 500);
        assert_eq!(api.message(), "disk full");

        let empty = std::io::Error::new(std::io::ErrorKind::Other, "");
        assert_eq!(normalize(empty.into()).message(), "server error");
    }

    #[test]
    fn wire_body_uses_single_string_for_plain_errors() {
        let body = ApiError::unauthorized("Not authorized to access this route").to_json();
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Not authorized to access this route");
    }
}
