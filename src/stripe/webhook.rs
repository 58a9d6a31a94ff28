//! Stripe webhook signature verification.
//!
//! The `stripe-signature` header carries `t=<unix>,v1=<hex>` where the hex
//! value is an HMAC-SHA256 of `"{t}.{raw body}"` under the endpoint's
//! signing secret. Verification must run over the raw, unparsed body.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::Duration;

use crate::stripe::error::{StripeError, StripeResult};

type HmacSha256 = Hmac<Sha256>;

/// Maximum accepted skew between the signed timestamp and now. Signed events
/// older than this are rejected even with a valid MAC, which bounds replay of
/// captured webhooks.
pub const DEFAULT_TOLERANCE: Duration = Duration::from_secs(300);

/// Parsed `stripe-signature` header
#[derive(Debug, Clone)]
pub struct SignatureHeader {
    pub timestamp: i64,
    pub signatures: Vec<String>,
}

pub fn parse_signature_header(header: &str) -> StripeResult<SignatureHeader> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => {
                timestamp = value.parse::<i64>().ok();
            }
            Some(("v1", value)) => {
                signatures.push(value.to_string());
            }
            // Older scheme versions and unknown keys are ignored
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or_else(|| StripeError::WebhookVerificationError {
        message: "signature header is missing a timestamp".to_string(),
    })?;
    if signatures.is_empty() {
        return Err(StripeError::WebhookVerificationError {
            message: "signature header is missing a v1 signature".to_string(),
        });
    }

    Ok(SignatureHeader {
        timestamp,
        signatures,
    })
}

/// Compute the expected hex signature for a payload at a given timestamp.
pub fn compute_signature(payload: &[u8], secret: &str, timestamp: i64) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

/// Verify a signature header against the raw payload.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    tolerance: Duration,
) -> StripeResult<()> {
    let parsed = parse_signature_header(header)?;

    let now = chrono::Utc::now().timestamp();
    if (now - parsed.timestamp).unsigned_abs() > tolerance.as_secs() {
        return Err(StripeError::WebhookVerificationError {
            message: "signature timestamp is outside the tolerance window".to_string(),
        });
    }

    let expected = compute_signature(payload, secret, parsed.timestamp);
    let valid = parsed
        .signatures
        .iter()
        .any(|candidate| secure_eq(candidate.trim().as_bytes(), expected.as_bytes()));

    if valid {
        Ok(())
    } else {
        Err(StripeError::WebhookVerificationError {
            message: "signature does not match payload".to_string(),
        })
    }
}

/// Constant-time byte comparison
pub fn secure_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter()
        .zip(b.iter())
        .fold(0_u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}
