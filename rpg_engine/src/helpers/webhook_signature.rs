//! # Webhook signature format
//!
//! Every webhook delivery carries a `signature` field: an HMAC-SHA256 over the concatenation of the event's
//! `timestamp` and `id` fields, keyed with the account's shared webhook secret and hex-encoded in lowercase.
//! Verification must pass before any event mutates an order.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Error)]
pub enum WebhookSignatureError {
    #[error("The webhook signature does not match the payload")]
    Mismatch,
    #[error("Invalid webhook secret: {0}")]
    InvalidKey(String),
}

/// The expected signature for an event with the given timestamp and id.
pub fn calculate_signature(secret: &str, timestamp: &str, id: &str) -> Result<String, WebhookSignatureError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| WebhookSignatureError::InvalidKey(e.to_string()))?;
    mac.update(timestamp.as_bytes());
    mac.update(id.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Verifies a webhook signature. Comparison is done by the HMAC implementation in constant time.
pub fn verify_signature(
    secret: &str,
    timestamp: &str,
    id: &str,
    signature: &str,
) -> Result<(), WebhookSignatureError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| WebhookSignatureError::InvalidKey(e.to_string()))?;
    mac.update(timestamp.as_bytes());
    mac.update(id.as_bytes());
    let provided = hex::decode(signature).map_err(|_| WebhookSignatureError::Mismatch)?;
    mac.verify_slice(&provided).map_err(|_| WebhookSignatureError::Mismatch)
}
