use crate::database::error::DatabaseError;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

pub const PAYMENT_STATUS_COMPLETED: &str = "completed";
pub const PAYMENT_STATUS_FAILED: &str = "failed";

/// Payment ledger entity. Rows are append-only and never mutated.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Payment {
    pub id: Uuid,
    pub invoice_id: Option<Uuid>,
    pub amount: i64,
    pub currency: String,
    pub payment_method: String,
    pub status: String,
    pub stripe_payment_intent_id: Option<String>,
    pub failure_reason: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Fields for a new ledger row
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub invoice_id: Option<Uuid>,
    pub amount: i64,
    pub currency: String,
    pub payment_method: String,
    pub stripe_payment_intent_id: Option<String>,
    pub failure_reason: Option<String>,
}

/// Repository for the payment ledger
pub struct PaymentRepository {
    pool: PgPool,
}

impl PaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a completed payment.
    ///
    /// Deduplicated on `(invoice_id, stripe_payment_intent_id)` via the
    /// partial unique index, so the client-confirmation path and the webhook
    /// path racing over the same charge produce exactly one row. `None`
    /// means the row already existed.
    pub async fn insert_completed(
        &self,
        payment: &NewPayment,
    ) -> Result<Option<Payment>, DatabaseError> {
        sqlx::query_as::<_, Payment>(
            "INSERT INTO payments
             (invoice_id, amount, currency, payment_method, status, stripe_payment_intent_id)
             VALUES ($1, $2, $3, $4, 'completed', $5)
             ON CONFLICT (invoice_id, stripe_payment_intent_id) WHERE status = 'completed'
             DO NOTHING
             RETURNING id, invoice_id, amount, currency, payment_method, status,
                       stripe_payment_intent_id, failure_reason, created_at",
        )
        .bind(payment.invoice_id)
        .bind(payment.amount)
        .bind(&payment.currency)
        .bind(&payment.payment_method)
        .bind(&payment.stripe_payment_intent_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    /// Insert a failed payment with the processor's failure reason.
    pub async fn insert_failed(&self, payment: &NewPayment) -> Result<Payment, DatabaseError> {
        sqlx::query_as::<_, Payment>(
            "INSERT INTO payments
             (invoice_id, amount, currency, payment_method, status,
              stripe_payment_intent_id, failure_reason)
             VALUES ($1, $2, $3, $4, 'failed', $5, $6)
             RETURNING id, invoice_id, amount, currency, payment_method, status,
                       stripe_payment_intent_id, failure_reason, created_at",
        )
        .bind(payment.invoice_id)
        .bind(payment.amount)
        .bind(&payment.currency)
        .bind(&payment.payment_method)
        .bind(&payment.stripe_payment_intent_id)
        .bind(&payment.failure_reason)
        .fetch_one(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    /// List ledger rows for an invoice, newest first
    pub async fn list_for_invoice(&self, invoice_id: Uuid) -> Result<Vec<Payment>, DatabaseError> {
        sqlx::query_as::<_, Payment>(
            "SELECT id, invoice_id, amount, currency, payment_method, status,
                    stripe_payment_intent_id, failure_reason, created_at
             FROM payments
             WHERE invoice_id = $1
             ORDER BY created_at DESC",
        )
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }
}
