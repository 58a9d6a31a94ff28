use crate::database::error::DatabaseError;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

pub const INVOICE_STATUS_UNPAID: &str = "unpaid";
pub const INVOICE_STATUS_PAID: &str = "paid";

/// Invoice entity
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Invoice {
    pub id: Uuid,
    pub invoice_number: String,
    pub currency: String,
    pub total_amount: i64,
    pub status: String,
    pub stripe_payment_intent_id: Option<String>,
    pub paid_date: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl Invoice {
    pub fn is_paid(&self) -> bool {
        self.status == INVOICE_STATUS_PAID
    }
}

/// Repository for invoice data
pub struct InvoiceRepository {
    pool: PgPool,
}

impl InvoiceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find an invoice by its identifier
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Invoice>, DatabaseError> {
        sqlx::query_as::<_, Invoice>(
            "SELECT id, invoice_number, currency, total_amount, status,
                    stripe_payment_intent_id, paid_date, created_at, updated_at
             FROM invoices
             WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    /// Create a new unpaid invoice
    pub async fn create_invoice(
        &self,
        invoice_number: &str,
        currency: &str,
        total_amount: i64,
    ) -> Result<Invoice, DatabaseError> {
        sqlx::query_as::<_, Invoice>(
            "INSERT INTO invoices (invoice_number, currency, total_amount, status)
             VALUES ($1, $2, $3, 'unpaid')
             RETURNING id, invoice_number, currency, total_amount, status,
                       stripe_payment_intent_id, paid_date, created_at, updated_at",
        )
        .bind(invoice_number)
        .bind(currency)
        .bind(total_amount)
        .fetch_one(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    /// Store the active payment intent id on an invoice.
    /// Overwrites any previous value; no history of superseded intents is kept.
    pub async fn attach_payment_intent(
        &self,
        id: Uuid,
        payment_intent_id: &str,
    ) -> Result<Invoice, DatabaseError> {
        sqlx::query_as::<_, Invoice>(
            "UPDATE invoices
             SET stripe_payment_intent_id = $2, updated_at = NOW()
             WHERE id = $1
             RETURNING id, invoice_number, currency, total_amount, status,
                       stripe_payment_intent_id, paid_date, created_at, updated_at",
        )
        .bind(id)
        .bind(payment_intent_id)
        .fetch_one(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    /// Transition an invoice to paid.
    ///
    /// The update is guarded on the current status, so the unpaid -> paid
    /// transition fires at most once; `None` means the invoice was already
    /// paid (or does not exist) and nothing changed.
    pub async fn mark_paid(&self, id: Uuid) -> Result<Option<Invoice>, DatabaseError> {
        sqlx::query_as::<_, Invoice>(
            "UPDATE invoices
             SET status = 'paid', paid_date = NOW(), updated_at = NOW()
             WHERE id = $1 AND status <> 'paid'
             RETURNING id, invoice_number, currency, total_amount, status,
                       stripe_payment_intent_id, paid_date, created_at, updated_at",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }
}
