//! Inbound webhook payloads from the processor.
//!
//! Events are transient. They are verified, applied to the order, and discarded; nothing is stored beyond the
//! idempotency markers on the order itself.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    InvoiceAuthorized,
    InvoiceSettled,
    InvoiceCancelled,
    InvoiceRefund,
    InvoiceCreated,
    CustomerCreated,
    CustomerPaymentMethodAdded,
    /// Any event type this engine does not handle. Rejected at the boundary with a 400-equivalent.
    #[serde(untagged)]
    Other(String),
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventType::InvoiceAuthorized => write!(f, "invoice_authorized"),
            EventType::InvoiceSettled => write!(f, "invoice_settled"),
            EventType::InvoiceCancelled => write!(f, "invoice_cancelled"),
            EventType::InvoiceRefund => write!(f, "invoice_refund"),
            EventType::InvoiceCreated => write!(f, "invoice_created"),
            EventType::CustomerCreated => write!(f, "customer_created"),
            EventType::CustomerPaymentMethodAdded => write!(f, "customer_payment_method_added"),
            EventType::Other(s) => write!(f, "{s}"),
        }
    }
}

/// A webhook delivery, as posted by the processor. `signature` is an HMAC-SHA256 over `timestamp + id` with the
/// account's shared webhook secret, hex-encoded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    pub event_type: EventType,
    /// The event id. This is the value signed together with the timestamp.
    pub id: String,
    pub timestamp: String,
    pub signature: String,
    /// The invoice handle, present on invoice events.
    #[serde(default)]
    pub invoice: Option<String>,
    /// The processor transaction id, present on invoice events.
    #[serde(default)]
    pub transaction: Option<String>,
    /// The customer handle, present on customer events.
    #[serde(default)]
    pub customer: Option<String>,
    /// The payment method id, present on `customer_payment_method_added`.
    #[serde(default)]
    pub payment_method: Option<String>,
}
