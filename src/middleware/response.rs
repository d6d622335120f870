use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::{json, Map, Value};

/// Wrapper for API responses that automatically adds success envelope
#[derive(Debug)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub status_code: Option<StatusCode>,
    /// Top-level siblings of `data` (pagination, message, count)
    pub extra: Map<String, Value>,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a successful API response with default 200 status
    pub fn success(data: T) -> Self {
        Self {
            data,
            status_code: None, // Default to 200 OK
            extra: Map::new(),
        }
    }

    /// Create an API response with custom status code
    pub fn with_status(data: T, status_code: StatusCode) -> Self {
        Self {
            data,
            status_code: Some(status_code),
            extra: Map::new(),
        }
    }

    /// Create a 201 Created response
    pub fn created(data: T) -> Self {
        Self::with_status(data, StatusCode::CREATED)
    }

    /// Add a top-level field next to `data`
    pub fn with_field(mut self, key: &str, value: impl Serialize) -> Self {
        match serde_json::to_value(value) {
            Ok(value) => {
                self.extra.insert(key.to_string(), value);
            }
            Err(e) => tracing::error!("Failed to serialize response field '{}': {}", key, e),
        }
        self
    }

    pub fn with_message(self, message: impl Into<String>) -> Self {
        self.with_field("message", message.into())
    }

    pub fn with_pagination(self, pagination: impl Serialize) -> Self {
        self.with_field("pagination", pagination)
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = self.status_code.unwrap_or(StatusCode::OK);

        // For 204 No Content, return empty response
        if status == StatusCode::NO_CONTENT {
            return status.into_response();
        }

        // Convert data to JSON Value for consistent envelope format
        let data_value = match serde_json::to_value(&self.data) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!("Failed to serialize response data: {}", e);
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({
                        "success": false,
                        "error": true,
                        "message": "Failed to serialize response data"
                    })),
                )
                    .into_response();
            }
        };

        // Wrap in success envelope
        let mut envelope = Map::new();
        envelope.insert("success".to_string(), Value::Bool(true));
        envelope.insert("data".to_string(), data_value);
        envelope.extend(self.extra);

        (status, Json(Value::Object(envelope))).into_response()
    }
}

/// Convenience trait for easy conversion to ApiResponse
pub trait IntoApiResponse<T: Serialize> {
    fn into_api_response(self) -> ApiResponse<T>;
}

impl<T: Serialize> IntoApiResponse<T> for T {
    fn into_api_response(self) -> ApiResponse<T> {
        ApiResponse::success(self)
    }
}

// Convenience type aliases
pub type ApiSuccess<T> = ApiResponse<T>;
pub type ApiResult<T> = Result<ApiResponse<T>, crate::error::ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::Pagination;

    #[tokio::test]
    async fn envelope_merges_extra_fields() {
        let response = ApiResponse::success(vec![1, 2])
            .with_pagination(Pagination::new(1, 20, 2))
            .with_message("ok")
            .into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["data"], json!([1, 2]));
        assert_eq!(body["pagination"]["pages"], 1);
        assert_eq!(body["message"], "ok");
    }
}
