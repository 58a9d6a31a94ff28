use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::api::payments::ClientSecretResponse;
use crate::error::{AppError, AppErrorKind, ExternalError};
use crate::middleware::error::{app_error_response, get_request_id_from_headers, ErrorResponse};
use crate::services::payment_intents::{InvoiceIntentInput, PaymentIntentService};
use crate::services::reconciliation::ReconciliationService;

#[derive(Clone)]
pub struct InvoicesState {
    pub intents: Arc<PaymentIntentService>,
    pub reconciliation: Arc<ReconciliationService>,
}

#[derive(Debug, Deserialize)]
pub struct CreateInvoiceIntentRequest {
    pub invoice_id: Uuid,
    /// Amount in minor currency units
    pub amount: i64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateInvoicePaymentRequest {
    pub invoice_id: Uuid,
    pub payment_intent_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UpdateInvoicePaymentResponse {
    pub success: bool,
}

/// POST /api/invoices/payment-intent
pub async fn create_invoice_intent(
    State(state): State<InvoicesState>,
    headers: axum::http::HeaderMap,
    Json(payload): Json<CreateInvoiceIntentRequest>,
) -> Result<Json<ClientSecretResponse>, (StatusCode, Json<ErrorResponse>)> {
    let request_id = get_request_id_from_headers(&headers);

    info!(invoice_id = %payload.invoice_id, amount = payload.amount, "invoice payment intent requested");

    let intent = state
        .intents
        .create_invoice_intent(InvoiceIntentInput {
            invoice_id: payload.invoice_id,
            amount: payload.amount,
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

/// POST /api/invoices/payment
///
/// Called by the client after a synchronous confirmation success; the same
/// reconciliation also runs from the webhook path, so this must be (and is)
/// safe to repeat.
pub async fn update_invoice_payment(
    State(state): State<InvoicesState>,
    headers: axum::http::HeaderMap,
    Json(payload): Json<UpdateInvoicePaymentRequest>,
) -> Result<Json<UpdateInvoicePaymentResponse>, (StatusCode, Json<ErrorResponse>)> {
    let request_id = get_request_id_from_headers(&headers);

    info!(invoice_id = %payload.invoice_id, "invoice reconciliation requested");

    state
        .reconciliation
        .reconcile(payload.invoice_id, payload.payment_intent_id.as_deref())
        .await
        .map_err(|e| app_error_response(e, request_id))?;

    Ok(Json(UpdateInvoicePaymentResponse { success: true }))
}
