use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use crate::error::{AppError, AppErrorKind, ExternalError};
use crate::middleware::error::{app_error_response, get_request_id_from_headers, ErrorResponse};
use crate::services::payment_intents::{PaymentIntentService, ProjectIntentInput};

#[derive(Clone)]
pub struct PaymentsState {
    pub intents: Arc<PaymentIntentService>,
}

#[derive(Debug, Deserialize)]
pub struct CreateProjectIntentRequest {
    /// Amount in minor currency units
    pub amount: i64,
    pub currency: Option<String>,
    pub metadata: Option<HashMap<String, String>>,
}

#[derive(Debug, Serialize)]
pub struct ClientSecretResponse {
    #[serde(rename = "clientSecret")]
    pub client_secret: String,
}

/// POST /api/payments/intent
pub async fn create_project_intent(
    State(state): State<PaymentsState>,
    headers: axum::http::HeaderMap,
    Json(payload): Json<CreateProjectIntentRequest>,
) -> Result<Json<ClientSecretResponse>, (StatusCode, Json<ErrorResponse>)> {
    let request_id = get_request_id_from_headers(&headers);

    info!(amount = payload.amount, "project payment intent requested");

    let intent = state
        .intents
        .create_project_intent(ProjectIntentInput {
            amount: payload.amount,
            currency: payload.currency,
            metadata: payload.metadata,
        })
        .await
        .map_err(|e| app_error_response(e, request_id.clone()))?;

    let client_secret = intent.client_secret.ok_or_else(|| {
        app_error_response(
            AppError::new(AppErrorKind::External(ExternalError::PaymentProvider {
                message: "payment intent is missing a client secret".to_string(),
                is_retryable: false,
            })),
            request_id,
        )
    })?;

    Ok(Json(ClientSecretResponse { client_secret }))
}
