//! Payment intent creation for the generic project-payment flow and the
//! invoice flow.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::database::repository::BillingStore;
use crate::error::{AppError, AppErrorKind, DomainError, ValidationError};
use crate::stripe::gateway::PaymentGateway;
use crate::stripe::types::{
    CreateIntentParams, PaymentIntent, METADATA_INVOICE_ID, METADATA_INVOICE_NUMBER,
    MIN_CHARGE_MINOR_UNITS,
};

const DEFAULT_CURRENCY: &str = "usd";

/// Input for a one-off project payment intent
#[derive(Debug, Clone)]
pub struct ProjectIntentInput {
    /// Amount in minor currency units
    pub amount: i64,
    pub currency: Option<String>,
    pub metadata: Option<HashMap<String, String>>,
}

/// Input for an invoice payment intent
#[derive(Debug, Clone)]
pub struct InvoiceIntentInput {
    pub invoice_id: Uuid,
    pub amount: i64,
}

pub struct PaymentIntentService {
    gateway: Arc<dyn PaymentGateway>,
    store: Arc<dyn BillingStore>,
}

impl PaymentIntentService {
    pub fn new(gateway: Arc<dyn PaymentGateway>, store: Arc<dyn BillingStore>) -> Self {
        Self { gateway, store }
    }

    /// Create an intent for a one-off project payment. No store write: the
    /// durable record only appears once the processor reports the outcome
    /// through the webhook path.
    pub async fn create_project_intent(
        &self,
        input: ProjectIntentInput,
    ) -> Result<PaymentIntent, AppError> {
        if input.amount < MIN_CHARGE_MINOR_UNITS {
            return Err(AppError::new(AppErrorKind::Validation(
                ValidationError::InvalidAmount {
                    amount: input.amount.to_string(),
                    reason: format!(
                        "amount must be at least {} minor units",
                        MIN_CHARGE_MINOR_UNITS
                    ),
                },
            )));
        }

        let currency = input
            .currency
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());

        let metadata = input
            .metadata
            .unwrap_or_default()
            .into_iter()
            .collect::<Vec<_>>();

        let intent = self
            .gateway
            .create_payment_intent(CreateIntentParams {
                amount: input.amount,
                currency,
                metadata,
                description: Some("Brightfold project payment".to_string()),
            })
            .await?;

        info!(intent_id = %intent.id, amount = intent.amount, "project payment intent created");
        Ok(intent)
    }

    /// Create an intent for an invoice payment and persist the intent id on
    /// the invoice. Paid invoices are rejected before any processor call so a
    /// settled invoice can never be charged twice.
    pub async fn create_invoice_intent(
        &self,
        input: InvoiceIntentInput,
    ) -> Result<PaymentIntent, AppError> {
        if input.amount <= 0 {
            return Err(AppError::new(AppErrorKind::Validation(
                ValidationError::InvalidAmount {
                    amount: input.amount.to_string(),
                    reason: "amount must be greater than zero".to_string(),
                },
            )));
        }

        let invoice = self
            .store
            .find_invoice(input.invoice_id)
            .await?
            .ok_or_else(|| {
                AppError::new(AppErrorKind::Domain(DomainError::InvoiceNotFound {
                    invoice_id: input.invoice_id.to_string(),
                }))
            })?;

        if invoice.is_paid() {
            return Err(AppError::new(AppErrorKind::Domain(
                DomainError::InvoiceAlreadyPaid {
                    invoice_number: invoice.invoice_number.clone(),
                },
            )));
        }

        let metadata = vec![
            (METADATA_INVOICE_ID.to_string(), invoice.id.to_string()),
            (
                METADATA_INVOICE_NUMBER.to_string(),
                invoice.invoice_number.clone(),
            ),
        ];

        let intent = self
            .gateway
            .create_payment_intent(CreateIntentParams {
                amount: input.amount,
                currency: invoice.currency.clone(),
                metadata,
                description: Some(format!("Invoice {}", invoice.invoice_number)),
            })
            .await?;

        // Last write wins; a superseded intent id is simply overwritten.
        self.store
            .attach_payment_intent(invoice.id, &intent.id)
            .await?;

        info!(
            intent_id = %intent.id,
            invoice_number = %invoice.invoice_number,
            "invoice payment intent created"
        );
        Ok(intent)
    }
}
