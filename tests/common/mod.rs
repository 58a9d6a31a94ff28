//! Shared fixtures for integration tests: an in-memory billing store and a
//! mock payment gateway, so the reconciliation and webhook paths run without
//! Postgres or the Stripe API.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

use brightfold_backend::database::error::{DatabaseError, DatabaseErrorKind};
use brightfold_backend::database::invoice_repository::Invoice;
use brightfold_backend::database::payment_repository::{NewPayment, Payment};
use brightfold_backend::database::repository::BillingStore;
use brightfold_backend::database::webhook_repository::WebhookEvent;
use brightfold_backend::stripe::error::{StripeError, StripeResult};
use brightfold_backend::stripe::gateway::PaymentGateway;
use brightfold_backend::stripe::types::{CreateIntentParams, PaymentIntent};
use brightfold_backend::stripe::webhook;

pub const TEST_WEBHOOK_SECRET: &str = "whsec_test123secret456";

#[derive(Default)]
pub struct InMemoryStore {
    invoices: Mutex<HashMap<Uuid, Invoice>>,
    payments: Mutex<Vec<Payment>>,
    events: Mutex<Vec<WebhookEvent>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_invoice(&self, invoice_number: &str, currency: &str, total_amount: i64) -> Invoice {
        self.insert_invoice(invoice_number, currency, total_amount, "unpaid")
    }

    pub fn add_paid_invoice(
        &self,
        invoice_number: &str,
        currency: &str,
        total_amount: i64,
    ) -> Invoice {
        self.insert_invoice(invoice_number, currency, total_amount, "paid")
    }

    fn insert_invoice(
        &self,
        invoice_number: &str,
        currency: &str,
        total_amount: i64,
        status: &str,
    ) -> Invoice {
        let now = chrono::Utc::now();
        let invoice = Invoice {
            id: Uuid::new_v4(),
            invoice_number: invoice_number.to_string(),
            currency: currency.to_string(),
            total_amount,
            status: status.to_string(),
            stripe_payment_intent_id: None,
            paid_date: if status == "paid" { Some(now) } else { None },
            created_at: now,
            updated_at: now,
        };
        self.invoices
            .lock()
            .unwrap()
            .insert(invoice.id, invoice.clone());
        invoice
    }

    pub fn invoice(&self, id: Uuid) -> Option<Invoice> {
        self.invoices.lock().unwrap().get(&id).cloned()
    }

    pub fn payments_snapshot(&self) -> Vec<Payment> {
        self.payments.lock().unwrap().clone()
    }

    pub fn events_snapshot(&self) -> Vec<WebhookEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl BillingStore for InMemoryStore {
    async fn find_invoice(&self, id: Uuid) -> Result<Option<Invoice>, DatabaseError> {
        Ok(self.invoices.lock().unwrap().get(&id).cloned())
    }

    async fn attach_payment_intent(
        &self,
        id: Uuid,
        payment_intent_id: &str,
    ) -> Result<Invoice, DatabaseError> {
        let mut invoices = self.invoices.lock().unwrap();
        let invoice = invoices
            .get_mut(&id)
            .ok_or_else(|| DatabaseError::new(DatabaseErrorKind::NotFound))?;
        invoice.stripe_payment_intent_id = Some(payment_intent_id.to_string());
        invoice.updated_at = chrono::Utc::now();
        Ok(invoice.clone())
    }

    async fn mark_invoice_paid(&self, id: Uuid) -> Result<Option<Invoice>, DatabaseError> {
        let mut invoices = self.invoices.lock().unwrap();
        match invoices.get_mut(&id) {
            Some(invoice) if invoice.status != "paid" => {
                invoice.status = "paid".to_string();
                invoice.paid_date = Some(chrono::Utc::now());
                invoice.updated_at = chrono::Utc::now();
                Ok(Some(invoice.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn insert_completed_payment(
        &self,
        payment: &NewPayment,
    ) -> Result<Option<Payment>, DatabaseError> {
        let mut payments = self.payments.lock().unwrap();

        // Mirror of the partial unique index: one completed row per
        // (invoice_id, intent). NULL invoice ids never conflict.
        if payment.invoice_id.is_some() {
            let duplicate = payments.iter().any(|p| {
                p.status == "completed"
                    && p.invoice_id == payment.invoice_id
                    && p.stripe_payment_intent_id == payment.stripe_payment_intent_id
            });
            if duplicate {
                return Ok(None);
            }
        }

        let row = Payment {
            id: Uuid::new_v4(),
            invoice_id: payment.invoice_id,
            amount: payment.amount,
            currency: payment.currency.clone(),
            payment_method: payment.payment_method.clone(),
            status: "completed".to_string(),
            stripe_payment_intent_id: payment.stripe_payment_intent_id.clone(),
            failure_reason: None,
            created_at: chrono::Utc::now(),
        };
        payments.push(row.clone());
        Ok(Some(row))
    }

    async fn insert_failed_payment(
        &self,
        payment: &NewPayment,
    ) -> Result<Payment, DatabaseError> {
        let row = Payment {
            id: Uuid::new_v4(),
            invoice_id: payment.invoice_id,
            amount: payment.amount,
            currency: payment.currency.clone(),
            payment_method: payment.payment_method.clone(),
            status: "failed".to_string(),
            stripe_payment_intent_id: payment.stripe_payment_intent_id.clone(),
            failure_reason: payment.failure_reason.clone(),
            created_at: chrono::Utc::now(),
        };
        self.payments.lock().unwrap().push(row.clone());
        Ok(row)
    }

    async fn log_webhook_event(
        &self,
        event_id: &str,
        event_type: &str,
        payload: &serde_json::Value,
        signature: Option<&str>,
    ) -> Result<WebhookEvent, DatabaseError> {
        let mut events = self.events.lock().unwrap();
        if let Some(existing) = events.iter().find(|e| e.event_id == event_id) {
            return Ok(existing.clone());
        }

        let row = WebhookEvent {
            id: Uuid::new_v4(),
            event_id: event_id.to_string(),
            event_type: event_type.to_string(),
            payload: payload.clone(),
            signature: signature.map(str::to_string),
            status: "pending".to_string(),
            failure_reason: None,
            received_at: chrono::Utc::now(),
            processed_at: None,
        };
        events.push(row.clone());
        Ok(row)
    }

    async fn mark_event_processed(&self, id: Uuid) -> Result<(), DatabaseError> {
        let mut events = self.events.lock().unwrap();
        if let Some(event) = events.iter_mut().find(|e| e.id == id) {
            event.status = "completed".to_string();
            event.processed_at = Some(chrono::Utc::now());
        }
        Ok(())
    }

    async fn record_event_failure(&self, id: Uuid, reason: &str) -> Result<(), DatabaseError> {
        let mut events = self.events.lock().unwrap();
        if let Some(event) = events.iter_mut().find(|e| e.id == id) {
            event.status = "failed".to_string();
            event.failure_reason = Some(reason.to_string());
            event.processed_at = Some(chrono::Utc::now());
        }
        Ok(())
    }
}

/// Gateway double that fabricates intents and verifies signatures with a
/// fixed test secret.
pub struct MockGateway {
    webhook_secret: Option<String>,
    counter: AtomicU64,
    created: Mutex<Vec<CreateIntentParams>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::with_webhook_secret(Some(TEST_WEBHOOK_SECRET))
    }

    pub fn with_webhook_secret(webhook_secret: Option<&str>) -> Self {
        Self {
            webhook_secret: webhook_secret.map(str::to_string),
            counter: AtomicU64::new(0),
            created: Mutex::new(Vec::new()),
        }
    }

    pub fn created_intents(&self) -> Vec<CreateIntentParams> {
        self.created.lock().unwrap().clone()
    }
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn create_payment_intent(
        &self,
        params: CreateIntentParams,
    ) -> StripeResult<PaymentIntent> {
        self.created.lock().unwrap().push(params.clone());
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        let id = format!("pi_test_{}", n);
        Ok(PaymentIntent {
            id: id.clone(),
            client_secret: Some(format!("{}_secret_test", id)),
            amount: params.amount,
            currency: params.currency,
            status: "requires_payment_method".to_string(),
            metadata: params.metadata.into_iter().collect(),
            last_payment_error: None,
        })
    }

    fn verify_webhook(&self, payload: &[u8], signature_header: &str) -> StripeResult<()> {
        let secret = self
            .webhook_secret
            .as_deref()
            .ok_or_else(|| StripeError::NotConfigured {
                missing: "STRIPE_WEBHOOK_SECRET".to_string(),
            })?;
        webhook::verify_signature(
            payload,
            signature_header,
            secret,
            webhook::DEFAULT_TOLERANCE,
        )
    }

    fn parse_webhook_event(
        &self,
        payload: &[u8],
    ) -> StripeResult<brightfold_backend::stripe::types::WebhookEvent> {
        brightfold_backend::stripe::types::WebhookEvent::from_slice(payload)
    }
}

/// Produce a valid `stripe-signature` header for a payload.
pub fn sign_payload(payload: &[u8], secret: &str) -> String {
    let timestamp = chrono::Utc::now().timestamp();
    format!(
        "t={},v1={}",
        timestamp,
        webhook::compute_signature(payload, secret, timestamp)
    )
}

/// Body of a payment_intent.succeeded event.
pub fn succeeded_event_body(
    event_id: &str,
    intent_id: &str,
    amount: i64,
    currency: &str,
    invoice_id: Option<Uuid>,
) -> Vec<u8> {
    let mut metadata = serde_json::Map::new();
    if let Some(invoice_id) = invoice_id {
        metadata.insert(
            "invoice_id".to_string(),
            serde_json::Value::String(invoice_id.to_string()),
        );
    }

    serde_json::json!({
        "id": event_id,
        "type": "payment_intent.succeeded",
        "data": {
            "object": {
                "id": intent_id,
                "amount": amount,
                "currency": currency,
                "status": "succeeded",
                "metadata": metadata
            }
        }
    })
    .to_string()
    .into_bytes()
}

/// Body of a payment_intent.payment_failed event.
pub fn failed_event_body(
    event_id: &str,
    intent_id: &str,
    amount: i64,
    currency: &str,
    invoice_id: Option<Uuid>,
    failure_message: &str,
) -> Vec<u8> {
    let mut metadata = serde_json::Map::new();
    if let Some(invoice_id) = invoice_id {
        metadata.insert(
            "invoice_id".to_string(),
            serde_json::Value::String(invoice_id.to_string()),
        );
    }

    serde_json::json!({
        "id": event_id,
        "type": "payment_intent.payment_failed",
        "data": {
            "object": {
                "id": intent_id,
                "amount": amount,
                "currency": currency,
                "status": "requires_payment_method",
                "metadata": metadata,
                "last_payment_error": {
                    "message": failure_message,
                    "code": "card_declined"
                }
            }
        }
    })
    .to_string()
    .into_bytes()
}
