use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::services::webhook_processor::{WebhookProcessor, WebhookProcessorError};

pub struct WebhookState {
    pub processor: Arc<WebhookProcessor>,
}

/// POST /webhooks/stripe
///
/// The body must stay raw for signature verification. Once verification has
/// passed, the endpoint acknowledges 200 even when dispatch fails: Stripe
/// treats 2xx as final, and failures are recorded on the event row instead.
pub async fn handle_stripe_webhook(
    State(state): State<Arc<WebhookState>>,
    headers: axum::http::HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    info!("Received stripe webhook");

    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());

    if signature.is_none() {
        warn!("Missing webhook signature");
        return (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({"error": "Missing signature"})),
        )
            .into_response();
    }

    match state.processor.process(&body, signature.as_deref()).await {
        Ok(_) => {
            info!("Webhook processed successfully");
            (StatusCode::OK, Json(serde_json::json!({"received": true}))).into_response()
        }
        Err(WebhookProcessorError::InvalidSignature) => {
            warn!("Invalid webhook signature");
            (
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({"error": "Invalid signature"})),
            )
                .into_response()
        }
        Err(WebhookProcessorError::NotConfigured) => {
            error!("Webhook secret is not configured");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": "Webhook secret is not configured"})),
            )
                .into_response()
        }
        Err(WebhookProcessorError::MalformedEvent(e)) => {
            error!(error = %e, "Malformed webhook payload");
            (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({"error": "Malformed event payload"})),
            )
                .into_response()
        }
        Err(WebhookProcessorError::AlreadyProcessed) => {
            info!("Webhook already processed");
            (StatusCode::OK, Json(serde_json::json!({"received": true}))).into_response()
        }
        Err(e) => {
            // Verified event, failed side effects. Acknowledge anyway; the
            // failure lives on the event row.
            error!(error = %e, "Webhook processing failed");
            (StatusCode::OK, Json(serde_json::json!({"received": true}))).into_response()
        }
    }
}
