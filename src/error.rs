//! Comprehensive error handling for the Brightfold backend
//!
//! This module provides a unified error system with proper HTTP status mapping,
//! user-friendly messages, and structured error codes for client handling.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Error codes for programmatic handling
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ErrorCode {
    // Domain errors (4xx)
    #[serde(rename = "INVOICE_NOT_FOUND")]
    InvoiceNotFound,
    #[serde(rename = "INVOICE_ALREADY_PAID")]
    InvoiceAlreadyPaid,
    #[serde(rename = "INVALID_AMOUNT")]
    InvalidAmount,

    // Infrastructure errors (5xx)
    #[serde(rename = "DATABASE_ERROR")]
    DatabaseError,
    #[serde(rename = "CONFIGURATION_ERROR")]
    ConfigurationError,

    // External errors (401, 502, 503, 504)
    #[serde(rename = "PAYMENT_PROVIDER_ERROR")]
    PaymentProviderError,
    #[serde(rename = "WEBHOOK_SIGNATURE_INVALID")]
    WebhookSignatureInvalid,
    #[serde(rename = "EXTERNAL_SERVICE_TIMEOUT")]
    ExternalServiceTimeout,

    // Generic
    #[serde(rename = "INTERNAL_ERROR")]
    InternalError,
    #[serde(rename = "VALIDATION_ERROR")]
    ValidationError,
}

/// Domain-specific business logic errors
#[derive(Debug, Clone)]
pub enum DomainError {
    /// Invoice with the given identifier doesn't exist
    InvoiceNotFound { invoice_id: String },
    /// Charge attempt against an invoice that is already settled
    InvoiceAlreadyPaid { invoice_number: String },
}

/// Infrastructure-level errors (database, configuration)
#[derive(Debug, Clone)]
pub enum InfrastructureError {
    /// Database connection or query failure
    Database { message: String, is_retryable: bool },
    /// Missing or invalid configuration
    Configuration { message: String },
}

/// External service errors (payment processor)
#[derive(Debug, Clone)]
pub enum ExternalError {
    /// Stripe API call failed
    PaymentProvider {
        message: String,
        is_retryable: bool,
    },
    /// Webhook payload failed signature verification
    WebhookSignature { reason: String },
    /// External service timeout
    Timeout { service: String, timeout_secs: u64 },
}

/// Input validation errors
#[derive(Debug, Clone)]
pub enum ValidationError {
    /// Invalid amount (below minimum charge, zero, or negative)
    InvalidAmount { amount: String, reason: String },
    /// Required field missing
    MissingField { field: String },
}

/// Unified application error type
#[derive(Debug, Clone)]
pub struct AppError {
    pub kind: AppErrorKind,
    pub request_id: Option<String>,
    pub context: Option<String>,
}

#[derive(Debug, Clone)]
pub enum AppErrorKind {
    Domain(DomainError),
    Infrastructure(InfrastructureError),
    External(ExternalError),
    Validation(ValidationError),
}

impl AppError {
    pub fn new(kind: AppErrorKind) -> Self {
        Self {
            kind,
            request_id: None,
            context: None,
        }
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Map error to HTTP status code
    pub fn status_code(&self) -> u16 {
        match &self.kind {
            AppErrorKind::Domain(err) => match err {
                DomainError::InvoiceNotFound { .. } => 404,
                DomainError::InvoiceAlreadyPaid { .. } => 409, // Conflict
            },
            AppErrorKind::Infrastructure(err) => match err {
                InfrastructureError::Database { .. } => 500,
                InfrastructureError::Configuration { .. } => 500,
            },
            AppErrorKind::External(err) => match err {
                ExternalError::PaymentProvider { .. } => 502, // Bad Gateway
                ExternalError::WebhookSignature { .. } => 401,
                ExternalError::Timeout { .. } => 504, // Gateway Timeout
            },
            AppErrorKind::Validation(err) => match err {
                ValidationError::InvalidAmount { .. } => 400,
                ValidationError::MissingField { .. } => 400,
            },
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> ErrorCode {
        match &self.kind {
            AppErrorKind::Domain(err) => match err {
                DomainError::InvoiceNotFound { .. } => ErrorCode::InvoiceNotFound,
                DomainError::InvoiceAlreadyPaid { .. } => ErrorCode::InvoiceAlreadyPaid,
            },
            AppErrorKind::Infrastructure(err) => match err {
                InfrastructureError::Database { .. } => ErrorCode::DatabaseError,
                InfrastructureError::Configuration { .. } => ErrorCode::ConfigurationError,
            },
            AppErrorKind::External(err) => match err {
                ExternalError::PaymentProvider { .. } => ErrorCode::PaymentProviderError,
                ExternalError::WebhookSignature { .. } => ErrorCode::WebhookSignatureInvalid,
                ExternalError::Timeout { .. } => ErrorCode::ExternalServiceTimeout,
            },
            AppErrorKind::Validation(err) => match err {
                ValidationError::InvalidAmount { .. } => ErrorCode::InvalidAmount,
                ValidationError::MissingField { .. } => ErrorCode::ValidationError,
            },
        }
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match &self.kind {
            AppErrorKind::Domain(err) => match err {
                DomainError::InvoiceNotFound { invoice_id } => {
                    format!("Invoice '{}' not found", invoice_id)
                }
                DomainError::InvoiceAlreadyPaid { invoice_number } => {
                    format!("Invoice '{}' is already paid", invoice_number)
                }
            },
            AppErrorKind::Infrastructure(_) => {
                "Service temporarily unavailable. Please try again later".to_string()
            }
            AppErrorKind::External(err) => match err {
                ExternalError::PaymentProvider { is_retryable, .. } => {
                    if *is_retryable {
                        "Payment provider is temporarily unavailable. Please try again"
                            .to_string()
                    } else {
                        "Payment processing failed. Please contact support".to_string()
                    }
                }
                ExternalError::WebhookSignature { .. } => "Invalid webhook signature".to_string(),
                ExternalError::Timeout {
                    service,
                    timeout_secs,
                } => {
                    format!(
                        "{} request timed out after {} seconds. Please try again",
                        service, timeout_secs
                    )
                }
            },
            AppErrorKind::Validation(err) => match err {
                ValidationError::InvalidAmount { amount, reason } => {
                    format!("Invalid amount '{}': {}", amount, reason)
                }
                ValidationError::MissingField { field } => {
                    format!("Required field '{}' is missing", field)
                }
            },
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        match &self.kind {
            AppErrorKind::Domain(_) => false,
            AppErrorKind::Infrastructure(err) => match err {
                InfrastructureError::Database { is_retryable, .. } => *is_retryable,
                InfrastructureError::Configuration { .. } => false,
            },
            AppErrorKind::External(err) => match err {
                ExternalError::PaymentProvider { is_retryable, .. } => *is_retryable,
                ExternalError::WebhookSignature { .. } => false,
                ExternalError::Timeout { .. } => true,
            },
            AppErrorKind::Validation(_) => false,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.user_message())
    }
}

impl std::error::Error for AppError {}

// Conversions from specific error types
// Note: From<DatabaseError> is implemented in database/error.rs and
// From<StripeError> in stripe/error.rs to avoid circular dependencies.

/// Result type for operations that can fail with AppError
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invoice_not_found_error() {
        let error = AppError::new(AppErrorKind::Domain(DomainError::InvoiceNotFound {
            invoice_id: "b2c7e9de-0000-0000-0000-000000000000".to_string(),
        }));

        assert_eq!(error.status_code(), 404);
        assert_eq!(error.error_code(), ErrorCode::InvoiceNotFound);
        assert!(error.user_message().contains("not found"));
        assert!(!error.is_retryable());
    }

    #[test]
    fn test_already_paid_error_is_conflict() {
        let error = AppError::new(AppErrorKind::Domain(DomainError::InvoiceAlreadyPaid {
            invoice_number: "INV-2".to_string(),
        }));

        assert_eq!(error.status_code(), 409);
        assert_eq!(error.error_code(), ErrorCode::InvoiceAlreadyPaid);
        assert!(error.user_message().contains("already paid"));
    }

    #[test]
    fn test_webhook_signature_error() {
        let error = AppError::new(AppErrorKind::External(ExternalError::WebhookSignature {
            reason: "signature mismatch".to_string(),
        }));

        assert_eq!(error.status_code(), 401);
        assert_eq!(error.error_code(), ErrorCode::WebhookSignatureInvalid);
        assert!(!error.is_retryable());
    }

    #[test]
    fn test_validation_error() {
        let error = AppError::new(AppErrorKind::Validation(ValidationError::InvalidAmount {
            amount: "49".to_string(),
            reason: "below the minimum charge of 50 minor units".to_string(),
        }));

        assert_eq!(error.status_code(), 400);
        assert_eq!(error.error_code(), ErrorCode::InvalidAmount);
        assert!(!error.is_retryable());
    }
}
