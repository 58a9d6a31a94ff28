use crate::stripe::error::StripeError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Smallest amount Stripe will charge, in minor currency units (50 cents for USD).
pub const MIN_CHARGE_MINOR_UNITS: i64 = 50;

/// Metadata keys used to correlate an intent back to an invoice.
pub const METADATA_INVOICE_ID: &str = "invoice_id";
pub const METADATA_INVOICE_NUMBER: &str = "invoice_number";

/// The subset of Stripe's payment intent object this service reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: Option<String>,
    pub amount: i64,
    pub currency: String,
    pub status: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    #[serde(default)]
    pub last_payment_error: Option<LastPaymentError>,
}

impl PaymentIntent {
    /// Invoice id carried in the intent metadata, if any.
    pub fn invoice_id(&self) -> Option<&str> {
        self.metadata
            .get(METADATA_INVOICE_ID)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    pub fn failure_message(&self) -> Option<&str> {
        self.last_payment_error
            .as_ref()
            .and_then(|e| e.message.as_deref())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LastPaymentError {
    pub message: Option<String>,
    pub code: Option<String>,
}

/// Parameters for creating a payment intent
#[derive(Debug, Clone)]
pub struct CreateIntentParams {
    pub amount: i64,
    pub currency: String,
    pub metadata: Vec<(String, String)>,
    pub description: Option<String>,
}

/// A verified webhook event envelope
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: WebhookEventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEventData {
    pub object: serde_json::Value,
}

impl WebhookEvent {
    pub fn from_slice(payload: &[u8]) -> Result<Self, StripeError> {
        serde_json::from_slice(payload).map_err(|e| StripeError::MalformedEvent {
            message: format!("invalid webhook JSON payload: {}", e),
        })
    }

    pub fn kind(&self) -> EventKind {
        EventKind::from(self.event_type.as_str())
    }

    /// Deserialize the event's inner object as a payment intent.
    pub fn payment_intent(&self) -> Result<PaymentIntent, StripeError> {
        serde_json::from_value(self.data.object.clone()).map_err(|e| {
            StripeError::MalformedEvent {
                message: format!("event object is not a payment intent: {}", e),
            }
        })
    }
}

/// Event kinds this service dispatches on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    PaymentIntentSucceeded,
    PaymentIntentFailed,
    Other(String),
}

impl From<&str> for EventKind {
    fn from(value: &str) -> Self {
        match value {
            "payment_intent.succeeded" => EventKind::PaymentIntentSucceeded,
            "payment_intent.payment_failed" => EventKind::PaymentIntentFailed,
            other => EventKind::Other(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_intent_deserializes_from_stripe_shape() {
        let payload = serde_json::json!({
            "id": "pi_3Abc",
            "object": "payment_intent",
            "client_secret": "pi_3Abc_secret_xyz",
            "amount": 2500,
            "currency": "usd",
            "status": "succeeded",
            "metadata": {"invoice_id": "7f0c2f5e-0000-0000-0000-000000000000"}
        });
        let intent: PaymentIntent =
            serde_json::from_value(payload).expect("deserialization should succeed");
        assert_eq!(intent.amount, 2500);
        assert_eq!(
            intent.invoice_id(),
            Some("7f0c2f5e-0000-0000-0000-000000000000")
        );
    }

    #[test]
    fn blank_invoice_metadata_is_treated_as_absent() {
        let intent = PaymentIntent {
            id: "pi_1".to_string(),
            client_secret: None,
            amount: 100,
            currency: "usd".to_string(),
            status: "succeeded".to_string(),
            metadata: HashMap::from([(METADATA_INVOICE_ID.to_string(), "  ".to_string())]),
            last_payment_error: None,
        };
        assert_eq!(intent.invoice_id(), None);
    }

    #[test]
    fn event_kind_mapping() {
        assert_eq!(
            EventKind::from("payment_intent.succeeded"),
            EventKind::PaymentIntentSucceeded
        );
        assert_eq!(
            EventKind::from("payment_intent.payment_failed"),
            EventKind::PaymentIntentFailed
        );
        assert_eq!(
            EventKind::from("charge.refunded"),
            EventKind::Other("charge.refunded".to_string())
        );
    }

    #[test]
    fn webhook_event_parses_payment_intent() {
        let payload = serde_json::json!({
            "id": "evt_1",
            "type": "payment_intent.succeeded",
            "data": {
                "object": {
                    "id": "pi_1",
                    "amount": 5000,
                    "currency": "usd",
                    "status": "succeeded",
                    "metadata": {}
                }
            }
        });
        let event = WebhookEvent::from_slice(payload.to_string().as_bytes())
            .expect("event should parse");
        assert_eq!(event.kind(), EventKind::PaymentIntentSucceeded);
        let intent = event.payment_intent().expect("intent should parse");
        assert_eq!(intent.id, "pi_1");
        assert_eq!(intent.amount, 5000);
    }
}
