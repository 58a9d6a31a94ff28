//! Invoice reconciliation: record a durable ledger entry for a confirmed
//! charge and flip the invoice to paid.
//!
//! Both the client-confirmation path and the webhook path land here for the
//! same charge, with no mutual exclusion between them. Replays are safe: the
//! ledger insert is deduplicated on the payment-intent id and the invoice
//! transition is a guarded conditional update.

use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::database::invoice_repository::Invoice;
use crate::database::payment_repository::{NewPayment, Payment};
use crate::database::repository::BillingStore;
use crate::error::{AppError, AppErrorKind, DomainError};
use crate::stripe::types::PaymentIntent;

const DEFAULT_PAYMENT_METHOD: &str = "card";

/// Result of a reconciliation call
#[derive(Debug, Clone)]
pub struct ReconcileOutcome {
    pub invoice: Invoice,
    /// `None` when the ledger row already existed for this intent
    pub payment: Option<Payment>,
}

pub struct ReconciliationService {
    store: Arc<dyn BillingStore>,
}

impl ReconciliationService {
    pub fn new(store: Arc<dyn BillingStore>) -> Self {
        Self { store }
    }

    /// Mark an invoice paid and record the completed payment.
    ///
    /// The effective intent id is the supplied one, falling back to the id
    /// stored on the invoice. The ledger insert and the status update are
    /// two independent, non-transactional writes: a failure in one is logged
    /// and does not abort the other, trading atomicity for partial progress.
    pub async fn reconcile(
        &self,
        invoice_id: Uuid,
        payment_intent_id: Option<&str>,
    ) -> Result<ReconcileOutcome, AppError> {
        let invoice = self.store.find_invoice(invoice_id).await?.ok_or_else(|| {
            AppError::new(AppErrorKind::Domain(DomainError::InvoiceNotFound {
                invoice_id: invoice_id.to_string(),
            }))
        })?;

        let effective_intent_id = payment_intent_id
            .map(str::to_string)
            .or_else(|| invoice.stripe_payment_intent_id.clone());

        let new_payment = NewPayment {
            invoice_id: Some(invoice.id),
            amount: invoice.total_amount,
            currency: invoice.currency.clone(),
            payment_method: DEFAULT_PAYMENT_METHOD.to_string(),
            stripe_payment_intent_id: effective_intent_id,
            failure_reason: None,
        };

        let recorded = self.store.insert_completed_payment(&new_payment).await;
        let transitioned = self.store.mark_invoice_paid(invoice.id).await;

        let payment = match recorded {
            Ok(Some(payment)) => {
                info!(
                    invoice_number = %invoice.invoice_number,
                    payment_id = %payment.id,
                    amount = payment.amount,
                    "payment recorded"
                );
                Some(payment)
            }
            Ok(None) => {
                info!(
                    invoice_number = %invoice.invoice_number,
                    "payment already recorded for this intent, skipping duplicate ledger row"
                );
                None
            }
            Err(e) => {
                error!(
                    invoice_number = %invoice.invoice_number,
                    error = %e,
                    "failed to record payment ledger row"
                );
                if transitioned.is_err() {
                    // Neither write landed; surface the failure.
                    return Err(e.into());
                }
                None
            }
        };

        let invoice = match transitioned {
            Ok(Some(updated)) => {
                info!(invoice_number = %updated.invoice_number, "invoice marked paid");
                updated
            }
            Ok(None) => {
                // Already paid; the transition is a no-op for the invoice.
                invoice
            }
            Err(e) => {
                error!(
                    invoice_number = %invoice.invoice_number,
                    error = %e,
                    "failed to update invoice status"
                );
                invoice
            }
        };

        Ok(ReconcileOutcome { invoice, payment })
    }

    /// Record a completed charge that carries no invoice reference
    /// (one-off project payment observed through the webhook path).
    pub async fn record_project_payment(
        &self,
        intent: &PaymentIntent,
    ) -> Result<Option<Payment>, AppError> {
        let payment = self
            .store
            .insert_completed_payment(&NewPayment {
                invoice_id: None,
                amount: intent.amount,
                currency: intent.currency.clone(),
                payment_method: DEFAULT_PAYMENT_METHOD.to_string(),
                stripe_payment_intent_id: Some(intent.id.clone()),
                failure_reason: None,
            })
            .await?;

        if let Some(payment) = &payment {
            info!(
                payment_id = %payment.id,
                intent_id = %intent.id,
                amount = payment.amount,
                "project payment recorded"
            );
        }
        Ok(payment)
    }

    /// Record a failed charge. Invoice status is never changed on failure.
    pub async fn record_failed_payment(
        &self,
        invoice_id: Option<Uuid>,
        intent: &PaymentIntent,
        failure_reason: &str,
    ) -> Result<Payment, AppError> {
        let payment = self
            .store
            .insert_failed_payment(&NewPayment {
                invoice_id,
                amount: intent.amount,
                currency: intent.currency.clone(),
                payment_method: DEFAULT_PAYMENT_METHOD.to_string(),
                stripe_payment_intent_id: Some(intent.id.clone()),
                failure_reason: Some(failure_reason.to_string()),
            })
            .await?;

        warn!(
            payment_id = %payment.id,
            intent_id = %intent.id,
            reason = failure_reason,
            "failed payment recorded"
        );
        Ok(payment)
    }
}
