//! Store abstraction over the billing tables.
//!
//! Services depend on this trait rather than on concrete repositories so the
//! reconciliation and webhook paths can be exercised against an in-memory
//! store in tests.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::error::DatabaseError;
use crate::database::invoice_repository::{Invoice, InvoiceRepository};
use crate::database::payment_repository::{NewPayment, Payment, PaymentRepository};
use crate::database::webhook_repository::{WebhookEvent, WebhookEventRepository};

#[async_trait]
pub trait BillingStore: Send + Sync {
    async fn find_invoice(&self, id: Uuid) -> Result<Option<Invoice>, DatabaseError>;

    async fn attach_payment_intent(
        &self,
        id: Uuid,
        payment_intent_id: &str,
    ) -> Result<Invoice, DatabaseError>;

    /// Guarded unpaid -> paid transition; `None` when nothing changed.
    async fn mark_invoice_paid(&self, id: Uuid) -> Result<Option<Invoice>, DatabaseError>;

    /// Deduplicated completed-payment insert; `None` on a duplicate.
    async fn insert_completed_payment(
        &self,
        payment: &NewPayment,
    ) -> Result<Option<Payment>, DatabaseError>;

    async fn insert_failed_payment(&self, payment: &NewPayment)
        -> Result<Payment, DatabaseError>;

    /// Record an incoming webhook event, or return the stored row for a replay.
    async fn log_webhook_event(
        &self,
        event_id: &str,
        event_type: &str,
        payload: &serde_json::Value,
        signature: Option<&str>,
    ) -> Result<WebhookEvent, DatabaseError>;

    async fn mark_event_processed(&self, id: Uuid) -> Result<(), DatabaseError>;

    async fn record_event_failure(&self, id: Uuid, reason: &str) -> Result<(), DatabaseError>;
}

/// Postgres-backed billing store
pub struct PgBillingStore {
    invoices: InvoiceRepository,
    payments: PaymentRepository,
    webhook_events: WebhookEventRepository,
}

impl PgBillingStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            invoices: InvoiceRepository::new(pool.clone()),
            payments: PaymentRepository::new(pool.clone()),
            webhook_events: WebhookEventRepository::new(pool),
        }
    }
}

#[async_trait]
impl BillingStore for PgBillingStore {
    async fn find_invoice(&self, id: Uuid) -> Result<Option<Invoice>, DatabaseError> {
        self.invoices.find_by_id(id).await
    }

    async fn attach_payment_intent(
        &self,
        id: Uuid,
        payment_intent_id: &str,
    ) -> Result<Invoice, DatabaseError> {
        self.invoices.attach_payment_intent(id, payment_intent_id).await
    }

    async fn mark_invoice_paid(&self, id: Uuid) -> Result<Option<Invoice>, DatabaseError> {
        self.invoices.mark_paid(id).await
    }

    async fn insert_completed_payment(
        &self,
        payment: &NewPayment,
    ) -> Result<Option<Payment>, DatabaseError> {
        self.payments.insert_completed(payment).await
    }

    async fn insert_failed_payment(
        &self,
        payment: &NewPayment,
    ) -> Result<Payment, DatabaseError> {
        self.payments.insert_failed(payment).await
    }

    async fn log_webhook_event(
        &self,
        event_id: &str,
        event_type: &str,
        payload: &serde_json::Value,
        signature: Option<&str>,
    ) -> Result<WebhookEvent, DatabaseError> {
        self.webhook_events
            .log_event(event_id, event_type, payload, signature)
            .await
    }

    async fn mark_event_processed(&self, id: Uuid) -> Result<(), DatabaseError> {
        self.webhook_events.mark_processed(id).await
    }

    async fn record_event_failure(&self, id: Uuid, reason: &str) -> Result<(), DatabaseError> {
        self.webhook_events.record_failure(id, reason).await
    }
}
