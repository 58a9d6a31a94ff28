//! Services module for business logic and integrations

pub mod checkout;
pub mod payment_intents;
pub mod reconciliation;
pub mod webhook_processor;

pub use checkout::{CheckoutSession, CheckoutState, PaymentFlow};
pub use payment_intents::{InvoiceIntentInput, PaymentIntentService, ProjectIntentInput};
pub use reconciliation::{ReconcileOutcome, ReconciliationService};
pub use webhook_processor::{WebhookProcessor, WebhookProcessorError};
