/// Unified error types for the MathsApp backend
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Per-field validation detail, reported alongside a 400 response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Main error type for the API
#[derive(Error, Debug)]
pub enum ApiError {
    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Malformed or missing input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Malformed input with per-field messages
    #[error("Validation failed")]
    Fields(Vec<FieldError>),

    /// Missing, invalid, or expired session
    #[error("Authentication failed: {0}")]
    Unauthenticated(String),

    /// Valid session, insufficient capability
    #[error("Not authorized: {0}")]
    Forbidden(String),

    /// Referenced entity absent
    #[error("Not found: {0}")]
    NotFound(String),

    /// Uniqueness violation
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Object storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Mail transport errors
    #[error("Mail error: {0}")]
    Mail(String),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// JSON error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<FieldError>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message, fields) = match self {
            ApiError::Validation(_) => {
                (StatusCode::BAD_REQUEST, "InvalidRequest", self.to_string(), None)
            }
            ApiError::Fields(errors) => (
                StatusCode::BAD_REQUEST,
                "InvalidRequest",
                "Validation failed".to_string(),
                Some(errors),
            ),
            ApiError::Unauthenticated(_) => (
                StatusCode::UNAUTHORIZED,
                "AuthenticationRequired",
                self.to_string(),
                None,
            ),
            ApiError::Forbidden(_) => {
                (StatusCode::FORBIDDEN, "Forbidden", self.to_string(), None)
            }
            ApiError::NotFound(_) => {
                (StatusCode::NOT_FOUND, "NotFound", self.to_string(), None)
            }
            ApiError::Conflict(_) => {
                (StatusCode::CONFLICT, "Conflict", self.to_string(), None)
            }
            ApiError::Database(_)
            | ApiError::Storage(_)
            | ApiError::Mail(_)
            | ApiError::Internal(_)
            | ApiError::Io(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "InternalServerError",
                // Don't leak details
                "Internal server error".to_string(),
                None,
            ),
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
            fields,
        });

        (status, body).into_response()
    }
}

/// Result type alias for API operations
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_maps_to_400() {
        let resp = ApiError::Validation("bad input".to_string()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_internal_does_not_leak_details() {
        let err = ApiError::Internal("secret connection string".to_string());
        let resp = err.into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_field_errors_serialized() {
        let body = ErrorResponse {
            error: "InvalidRequest".to_string(),
            message: "Validation failed".to_string(),
            fields: Some(vec![FieldError::new("email", "Invalid email address")]),
        };
        let json = serde_json::to_string(&body).unwrap();
        assert!(json.contains("\"field\":\"email\""));
    }

    #[test]
    fn test_fields_omitted_when_absent() {
        let body = ErrorResponse {
            error: "NotFound".to_string(),
            message: "Not found: card".to_string(),
            fields: None,
        };
        let json = serde_json::to_string(&body).unwrap();
        assert!(!json.contains("fields"));
    }
}
