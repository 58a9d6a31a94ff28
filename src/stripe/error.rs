use thiserror::Error;

pub type StripeResult<T> = Result<T, StripeError>;

#[derive(Debug, Clone, Error)]
pub enum StripeError {
    #[error("Stripe is not configured: {missing}")]
    NotConfigured { missing: String },

    #[error("Validation error: {message}")]
    ValidationError {
        message: String,
        field: Option<String>,
    },

    #[error("Network error: {message}")]
    NetworkError { message: String },

    #[error("Stripe API error: {message}")]
    ApiError {
        message: String,
        status: u16,
        code: Option<String>,
    },

    #[error("Webhook verification failed: {message}")]
    WebhookVerificationError { message: String },

    #[error("Malformed webhook event: {message}")]
    MalformedEvent { message: String },
}

impl StripeError {
    pub fn is_retryable(&self) -> bool {
        match self {
            StripeError::NotConfigured { .. } => false,
            StripeError::ValidationError { .. } => false,
            StripeError::NetworkError { .. } => true,
            StripeError::ApiError { status, .. } => *status >= 500,
            StripeError::WebhookVerificationError { .. } => false,
            StripeError::MalformedEvent { .. } => false,
        }
    }

    pub fn http_status_code(&self) -> u16 {
        match self {
            StripeError::NotConfigured { .. } => 500,
            StripeError::ValidationError { .. } => 400,
            StripeError::NetworkError { .. } => 503,
            StripeError::ApiError { .. } => 502,
            StripeError::WebhookVerificationError { .. } => 401,
            StripeError::MalformedEvent { .. } => 400,
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            StripeError::NotConfigured { .. } => "Stripe is not configured".to_string(),
            StripeError::ValidationError { message, .. } => message.clone(),
            StripeError::NetworkError { .. } => {
                "Payment provider is temporarily unavailable".to_string()
            }
            StripeError::ApiError { .. } => "Payment provider returned an error".to_string(),
            StripeError::WebhookVerificationError { .. } => "Invalid webhook signature".to_string(),
            StripeError::MalformedEvent { .. } => "Malformed webhook event".to_string(),
        }
    }
}

impl From<StripeError> for crate::error::AppError {
    fn from(err: StripeError) -> Self {
        use crate::error::{
            AppError, AppErrorKind, ExternalError, InfrastructureError, ValidationError,
        };

        let kind = match &err {
            StripeError::NotConfigured { missing } => {
                AppErrorKind::Infrastructure(InfrastructureError::Configuration {
                    message: format!("Stripe is not configured: {}", missing),
                })
            }
            StripeError::ValidationError { message, field } => {
                AppErrorKind::Validation(ValidationError::InvalidAmount {
                    amount: field.clone().unwrap_or_else(|| "request".to_string()),
                    reason: message.clone(),
                })
            }
            StripeError::WebhookVerificationError { message } => {
                AppErrorKind::External(ExternalError::WebhookSignature {
                    reason: message.clone(),
                })
            }
            _ => AppErrorKind::External(ExternalError::PaymentProvider {
                message: err.to_string(),
                is_retryable: err.is_retryable(),
            }),
        };

        AppError::new(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_http_status_mapping_is_correct() {
        assert_eq!(
            StripeError::ValidationError {
                message: "bad".to_string(),
                field: None
            }
            .http_status_code(),
            400
        );
        assert_eq!(
            StripeError::WebhookVerificationError {
                message: "mismatch".to_string()
            }
            .http_status_code(),
            401
        );
        assert_eq!(
            StripeError::ApiError {
                message: "card declined".to_string(),
                status: 402,
                code: Some("card_declined".to_string())
            }
            .http_status_code(),
            502
        );
    }

    #[test]
    fn retryable_flags_are_set() {
        assert!(StripeError::NetworkError {
            message: "timeout".to_string()
        }
        .is_retryable());
        assert!(StripeError::ApiError {
            message: "server error".to_string(),
            status: 500,
            code: None
        }
        .is_retryable());
        assert!(!StripeError::ApiError {
            message: "bad request".to_string(),
            status: 400,
            code: None
        }
        .is_retryable());
    }
}
