//! Stripe API client.
//!
//! Calls are form-encoded per Stripe's API conventions. Missing keys degrade
//! the corresponding operations to a NotConfigured error instead of failing
//! startup, so the site can run with payments disabled. No automatic retries:
//! processor failures propagate to the caller.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::info;

use crate::stripe::error::{StripeError, StripeResult};
use crate::stripe::gateway::PaymentGateway;
use crate::stripe::types::{CreateIntentParams, PaymentIntent, WebhookEvent};
use crate::stripe::webhook;

#[derive(Debug, Clone)]
pub struct StripeConfig {
    pub secret_key: Option<String>,
    pub publishable_key: Option<String>,
    pub webhook_secret: Option<String>,
    pub base_url: String,
    pub api_version: String,
    pub timeout_secs: u64,
}

impl Default for StripeConfig {
    fn default() -> Self {
        Self {
            secret_key: None,
            publishable_key: None,
            webhook_secret: None,
            base_url: "https://api.stripe.com".to_string(),
            api_version: "2023-10-16".to_string(),
            timeout_secs: 30,
        }
    }
}

impl StripeConfig {
    pub fn from_env() -> Self {
        Self {
            secret_key: std::env::var("STRIPE_SECRET_KEY").ok().filter(|v| !v.is_empty()),
            publishable_key: std::env::var("STRIPE_PUBLISHABLE_KEY")
                .ok()
                .filter(|v| !v.is_empty()),
            webhook_secret: std::env::var("STRIPE_WEBHOOK_SECRET")
                .ok()
                .filter(|v| !v.is_empty()),
            base_url: std::env::var("STRIPE_BASE_URL")
                .unwrap_or_else(|_| "https://api.stripe.com".to_string()),
            api_version: std::env::var("STRIPE_API_VERSION")
                .unwrap_or_else(|_| "2023-10-16".to_string()),
            timeout_secs: std::env::var("STRIPE_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(30),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.secret_key.is_some()
    }
}

pub struct StripeClient {
    config: StripeConfig,
    http: Client,
}

impl StripeClient {
    pub fn new(config: StripeConfig) -> StripeResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| StripeError::NetworkError {
                message: format!("failed to initialize HTTP client: {}", e),
            })?;

        Ok(Self { config, http })
    }

    pub fn from_env() -> StripeResult<Self> {
        Self::new(StripeConfig::from_env())
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    fn secret_key(&self) -> StripeResult<&str> {
        self.config
            .secret_key
            .as_deref()
            .ok_or_else(|| StripeError::NotConfigured {
                missing: "STRIPE_SECRET_KEY".to_string(),
            })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    async fn post_form<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(String, String)],
    ) -> StripeResult<T> {
        let secret_key = self.secret_key()?;

        let response = self
            .http
            .post(self.endpoint(path))
            .bearer_auth(secret_key)
            .header("Stripe-Version", &self.config.api_version)
            .form(params)
            .send()
            .await
            .map_err(|e| StripeError::NetworkError {
                message: format!("stripe request failed: {}", e),
            })?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();

        if status.is_success() {
            return serde_json::from_str::<T>(&text).map_err(|e| StripeError::ApiError {
                message: format!("invalid stripe JSON response: {}", e),
                status: status.as_u16(),
                code: None,
            });
        }

        let envelope: StripeErrorEnvelope = serde_json::from_str(&text).unwrap_or_default();
        Err(StripeError::ApiError {
            message: envelope
                .error
                .message
                .unwrap_or_else(|| format!("HTTP {}: {}", status, text)),
            status: status.as_u16(),
            code: envelope.error.code,
        })
    }
}

#[async_trait]
impl PaymentGateway for StripeClient {
    async fn create_payment_intent(
        &self,
        params: CreateIntentParams,
    ) -> StripeResult<PaymentIntent> {
        if params.amount <= 0 {
            return Err(StripeError::ValidationError {
                message: "amount must be greater than zero".to_string(),
                field: Some("amount".to_string()),
            });
        }
        if params.currency.trim().is_empty() {
            return Err(StripeError::ValidationError {
                message: "currency is required".to_string(),
                field: Some("currency".to_string()),
            });
        }

        let mut form = vec![
            ("amount".to_string(), params.amount.to_string()),
            ("currency".to_string(), params.currency.to_lowercase()),
            (
                "automatic_payment_methods[enabled]".to_string(),
                "true".to_string(),
            ),
        ];
        if let Some(description) = &params.description {
            form.push(("description".to_string(), description.clone()));
        }
        for (key, value) in &params.metadata {
            form.push((format!("metadata[{}]", key), value.clone()));
        }

        let intent: PaymentIntent = self.post_form("/v1/payment_intents", &form).await?;
        info!(intent_id = %intent.id, amount = intent.amount, "stripe payment intent created");

        Ok(intent)
    }

    fn verify_webhook(&self, payload: &[u8], signature_header: &str) -> StripeResult<()> {
        let secret = self
            .config
            .webhook_secret
            .as_deref()
            .ok_or_else(|| StripeError::NotConfigured {
                missing: "STRIPE_WEBHOOK_SECRET".to_string(),
            })?;
        webhook::verify_signature(payload, signature_header, secret, webhook::DEFAULT_TOLERANCE)
    }

    fn parse_webhook_event(&self, payload: &[u8]) -> StripeResult<WebhookEvent> {
        WebhookEvent::from_slice(payload)
    }
}

#[derive(Debug, Default, Deserialize)]
struct StripeErrorEnvelope {
    #[serde(default)]
    error: StripeErrorBody,
}

#[derive(Debug, Default, Deserialize)]
struct StripeErrorBody {
    message: Option<String>,
    code: Option<String>,
}
