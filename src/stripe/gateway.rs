use crate::stripe::error::StripeResult;
use crate::stripe::types::{CreateIntentParams, PaymentIntent, WebhookEvent};
use async_trait::async_trait;

/// Seam between the services and the payment processor.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_payment_intent(
        &self,
        params: CreateIntentParams,
    ) -> StripeResult<PaymentIntent>;

    /// Verify a webhook signature over the raw request body.
    fn verify_webhook(&self, payload: &[u8], signature_header: &str) -> StripeResult<()>;

    fn parse_webhook_event(&self, payload: &[u8]) -> StripeResult<WebhookEvent>;
}
