//! Error response formatting middleware
//!
//! Provides standardized error responses with consistent JSON structure,
//! HTTP status codes, error codes, and user-friendly messages.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, ErrorCode};

/// Standardized error response structure
///
/// This is returned to clients for all error cases, ensuring
/// consistent error handling across the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Machine-readable error code
    pub error: ErrorCode,

    /// Human-readable error message
    pub message: String,

    /// Request ID for debugging and support
    pub request_id: Option<String>,

    /// ISO 8601 timestamp of the error
    pub timestamp: String,

    /// Optional additional details (e.g., validation errors)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,

    /// Whether the client should retry the request
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retryable: Option<bool>,
}

impl ErrorResponse {
    /// Create a new error response from an AppError
    pub fn from_app_error(error: &AppError) -> Self {
        Self {
            error: error.error_code(),
            message: error.user_message(),
            request_id: error.request_id.clone(),
            timestamp: Utc::now().to_rfc3339(),
            details: None,
            retryable: Some(error.is_retryable()),
        }
    }

    /// Create a generic internal server error response
    pub fn internal_error(request_id: Option<String>) -> Self {
        Self {
            error: ErrorCode::InternalError,
            message: "An internal server error occurred. Please try again later.".to_string(),
            request_id,
            timestamp: Utc::now().to_rfc3339(),
            details: None,
            retryable: Some(false),
        }
    }

}

/// Implement IntoResponse for AppError to automatically convert errors
/// into HTTP responses with proper status codes and JSON formatting
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status_code =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        // Log the error with context
        if status_code.is_server_error() {
            tracing::error!(
                error = ?self,
                request_id = ?self.request_id,
                status = %status_code.as_u16(),
                "Server error occurred"
            );
        } else {
            tracing::warn!(
                error = ?self,
                request_id = ?self.request_id,
                status = %status_code.as_u16(),
                "Client error occurred"
            );
        }

        let error_response = ErrorResponse::from_app_error(&self);
        (status_code, Json(error_response)).into_response()
    }
}

/// Helper to extract request ID from request headers
pub fn get_request_id_from_headers(headers: &axum::http::HeaderMap) -> Option<String> {
    headers
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

/// Build the standard (status, JSON body) pair for a handler error.
pub fn app_error_response(
    err: AppError,
    request_id: Option<String>,
) -> (StatusCode, Json<ErrorResponse>) {
    let err = match request_id {
        Some(req_id) => err.with_request_id(req_id),
        None => err,
    };
    let status = StatusCode::from_u16(err.status_code())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(ErrorResponse::from_app_error(&err)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AppErrorKind, DomainError, ValidationError};
    use axum::{http::StatusCode, response::IntoResponse};

    #[test]
    fn test_error_response_from_app_error() {
        let app_error = AppError::new(AppErrorKind::Domain(DomainError::InvoiceAlreadyPaid {
            invoice_number: "INV-7".to_string(),
        }))
        .with_request_id("req_123");

        let error_response = ErrorResponse::from_app_error(&app_error);

        assert_eq!(error_response.error, ErrorCode::InvoiceAlreadyPaid);
        assert_eq!(error_response.request_id, Some("req_123".to_string()));
        assert!(error_response.message.contains("already paid"));
    }

    #[test]
    fn test_app_error_into_response() {
        let app_error = AppError::new(AppErrorKind::Validation(ValidationError::InvalidAmount {
            amount: "-100".to_string(),
            reason: "Amount cannot be negative".to_string(),
        }));

        let response = app_error.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_internal_error_response() {
        let error = ErrorResponse::internal_error(Some("req_456".to_string()));

        assert_eq!(error.error, ErrorCode::InternalError);
        assert_eq!(error.request_id, Some("req_456".to_string()));
        assert!(error.message.contains("internal server error"));
    }

    #[test]
    fn test_app_error_response_carries_request_id() {
        let app_error = AppError::new(AppErrorKind::Domain(DomainError::InvoiceNotFound {
            invoice_id: "missing".to_string(),
        }));

        let (status, body) = app_error_response(app_error, Some("req_789".to_string()));
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.0.request_id, Some("req_789".to_string()));
    }
}
