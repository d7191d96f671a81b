use axum::{
    extract::FromRequest,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::json;

use crate::error::{ApiError, AppError};

/// Success envelope: `{success: true, [count,] data}`.
#[derive(Debug)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub count: Option<usize>,
    pub status_code: Option<StatusCode>,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a successful API response with default 200 status
    pub fn success(data: T) -> Self {
        Self {
            data,
            count: None,
            status_code: None,
        }
    }

    /// Create a 201 Created response
    pub fn created(data: T) -> Self {
        Self {
            data,
            count: None,
            status_code: Some(StatusCode::CREATED),
        }
    }
}

impl<T: Serialize> ApiResponse<Vec<T>> {
    /// Unpaginated list; `count` is the number of items.
    pub fn list(data: Vec<T>) -> Self {
        Self {
            count: Some(data.len()),
            data,
            status_code: None,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = self.status_code.unwrap_or(StatusCode::OK);

        let data = match serde_json::to_value(&self.data) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!("Failed to serialize response data: {}", e);
                return ApiError::internal_server_error("server error").into_response();
            }
        };

        let envelope = match self.count {
            Some(count) => json!({ "success": true, "count": count, "data": data }),
            None => json!({ "success": true, "data": data }),
        };

        (status, Json(envelope)).into_response()
    }
}

/// JSON request body whose rejections go through the error normalizer.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct Payload<T>(pub T);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn created_uses_201() {
        let response = ApiResponse::created(json!({"id": 1})).into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    #[test]
    fn lists_carry_a_count() {
        let response = ApiResponse::list(vec![1, 2, 3]);
        assert_eq!(response.count, Some(3));
        assert_eq!(response.into_response().status(), StatusCode::OK);
    }
}
