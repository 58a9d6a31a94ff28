//! Webhook processing: the sole trust boundary for asynchronous processor
//! notifications.

use serde_json::Value as JsonValue;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::database::repository::BillingStore;
use crate::database::webhook_repository::EVENT_STATUS_COMPLETED;
use crate::services::reconciliation::ReconciliationService;
use crate::stripe::error::StripeError;
use crate::stripe::gateway::PaymentGateway;
use crate::stripe::types::{EventKind, WebhookEvent};

#[derive(Debug, Error)]
pub enum WebhookProcessorError {
    #[error("Invalid signature")]
    InvalidSignature,
    #[error("Webhook secret is not configured")]
    NotConfigured,
    #[error("Already processed")]
    AlreadyProcessed,
    #[error("Malformed event: {0}")]
    MalformedEvent(String),
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Processing error: {0}")]
    ProcessingError(String),
}

pub struct WebhookProcessor {
    gateway: Arc<dyn PaymentGateway>,
    store: Arc<dyn BillingStore>,
    reconciliation: Arc<ReconciliationService>,
}

impl WebhookProcessor {
    pub fn new(
        gateway: Arc<dyn PaymentGateway>,
        store: Arc<dyn BillingStore>,
        reconciliation: Arc<ReconciliationService>,
    ) -> Self {
        Self {
            gateway,
            store,
            reconciliation,
        }
    }

    /// Verify and dispatch one webhook delivery.
    ///
    /// The signature is checked against the raw body before anything is
    /// parsed or written. The processor's event id is the idempotency key: a
    /// replayed event resolves to its existing row and is not reprocessed.
    pub async fn process(
        &self,
        payload: &[u8],
        signature: Option<&str>,
    ) -> Result<(), WebhookProcessorError> {
        let signature = signature.ok_or(WebhookProcessorError::InvalidSignature)?;

        self.gateway
            .verify_webhook(payload, signature)
            .map_err(|e| match e {
                StripeError::NotConfigured { .. } => WebhookProcessorError::NotConfigured,
                _ => WebhookProcessorError::InvalidSignature,
            })?;

        let event = self
            .gateway
            .parse_webhook_event(payload)
            .map_err(|e| WebhookProcessorError::MalformedEvent(e.to_string()))?;

        let payload_json: JsonValue = serde_json::from_slice(payload)
            .map_err(|e| WebhookProcessorError::MalformedEvent(e.to_string()))?;

        let record = self
            .store
            .log_webhook_event(&event.id, &event.event_type, &payload_json, Some(signature))
            .await
            .map_err(|e| WebhookProcessorError::DatabaseError(e.to_string()))?;

        if record.status == EVENT_STATUS_COMPLETED {
            info!(event_id = %event.id, "webhook event already processed");
            return Err(WebhookProcessorError::AlreadyProcessed);
        }

        match self.dispatch(&event).await {
            Ok(_) => {
                self.store
                    .mark_event_processed(record.id)
                    .await
                    .map_err(|e| WebhookProcessorError::DatabaseError(e.to_string()))?;
                info!(event_id = %event.id, event_type = %event.event_type, "webhook event processed");
                Ok(())
            }
            Err(e) => {
                warn!(event_id = %event.id, error = %e, "webhook event processing failed");
                self.store
                    .record_event_failure(record.id, &e.to_string())
                    .await
                    .map_err(|e| WebhookProcessorError::DatabaseError(e.to_string()))?;
                Err(e)
            }
        }
    }

    async fn dispatch(&self, event: &WebhookEvent) -> Result<(), WebhookProcessorError> {
        match event.kind() {
            EventKind::PaymentIntentSucceeded => {
                let intent = event
                    .payment_intent()
                    .map_err(|e| WebhookProcessorError::MalformedEvent(e.to_string()))?;

                match parse_invoice_id(intent.invoice_id()) {
                    Some(invoice_id) => {
                        info!(intent_id = %intent.id, %invoice_id, "processing invoice payment success");
                        self.reconciliation
                            .reconcile(invoice_id, Some(&intent.id))
                            .await
                            .map_err(|e| WebhookProcessorError::ProcessingError(e.to_string()))?;
                    }
                    None => {
                        info!(intent_id = %intent.id, "processing project payment success");
                        self.reconciliation
                            .record_project_payment(&intent)
                            .await
                            .map_err(|e| WebhookProcessorError::ProcessingError(e.to_string()))?;
                    }
                }
            }
            EventKind::PaymentIntentFailed => {
                let intent = event
                    .payment_intent()
                    .map_err(|e| WebhookProcessorError::MalformedEvent(e.to_string()))?;
                let reason = intent
                    .failure_message()
                    .unwrap_or("Payment failed")
                    .to_string();

                info!(intent_id = %intent.id, "processing payment failure");
                self.reconciliation
                    .record_failed_payment(parse_invoice_id(intent.invoice_id()), &intent, &reason)
                    .await
                    .map_err(|e| WebhookProcessorError::ProcessingError(e.to_string()))?;
            }
            EventKind::Other(kind) => {
                info!(event_type = %kind, "ignoring webhook event kind");
            }
        }

        Ok(())
    }
}

fn parse_invoice_id(raw: Option<&str>) -> Option<Uuid> {
    let raw = raw?;
    match Uuid::parse_str(raw) {
        Ok(id) => Some(id),
        Err(_) => {
            warn!(invoice_id = raw, "unparseable invoice_id in intent metadata");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_is_stable() {
        assert_eq!(
            WebhookProcessorError::InvalidSignature.to_string(),
            "Invalid signature"
        );
        assert_eq!(
            WebhookProcessorError::AlreadyProcessed.to_string(),
            "Already processed"
        );
    }

    #[test]
    fn invoice_id_parsing_tolerates_junk() {
        assert_eq!(parse_invoice_id(None), None);
        assert_eq!(parse_invoice_id(Some("not-a-uuid")), None);
        let id = Uuid::new_v4();
        assert_eq!(parse_invoice_id(Some(&id.to_string())), Some(id));
    }
}
