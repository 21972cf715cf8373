//! Request and response schema for the processor API.
//!
//! The payloads are explicit structs rather than ad-hoc JSON maps, so a malformed request shape is a compile error.
//! Address fields that are missing on the local order are serialized as empty strings, never omitted — the processor
//! schema requires every key to be present.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use rpg_common::MinorUnits;

//--------------------------------------     ChargeState     ---------------------------------------------------------
/// Remote invoice/charge lifecycle: `created → authorized → settled | cancelled | failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChargeState {
    Created,
    Authorized,
    Settled,
    Cancelled,
    Failed,
}

impl std::fmt::Display for ChargeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChargeState::Created => write!(f, "created"),
            ChargeState::Authorized => write!(f, "authorized"),
            ChargeState::Settled => write!(f, "settled"),
            ChargeState::Cancelled => write!(f, "cancelled"),
            ChargeState::Failed => write!(f, "failed"),
        }
    }
}

//--------------------------------------     CustomerInfo    ---------------------------------------------------------
/// The `customer` / `create_customer` block shared by every session and charge payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomerInfo {
    pub test: bool,
    pub handle: String,
    pub email: String,
    pub address: String,
    pub address2: String,
    pub city: String,
    pub country: String,
    pub phone: String,
    pub company: String,
    pub vat: String,
    pub first_name: String,
    pub last_name: String,
    pub postal_code: String,
}

//--------------------------------------    InvoiceAddress   ---------------------------------------------------------
/// Billing or shipping address block attached to an order payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InvoiceAddress {
    pub attention: String,
    pub email: String,
    pub address: String,
    pub address2: String,
    pub city: String,
    pub country: String,
    pub phone: String,
    pub company: String,
    pub vat: String,
    pub first_name: String,
    pub last_name: String,
    pub postal_code: String,
    pub state_or_province: String,
}

impl InvoiceAddress {
    /// True when every location-bearing field is empty. Contact fields (email, phone) are ignored, since they are
    /// copied from billing and would mask a missing shipping address.
    pub fn is_degenerate(&self) -> bool {
        [
            &self.address,
            &self.address2,
            &self.city,
            &self.country,
            &self.company,
            &self.first_name,
            &self.last_name,
            &self.postal_code,
            &self.state_or_province,
        ]
        .iter()
        .all(|s| s.is_empty())
    }
}

//--------------------------------------      OrderLine      ---------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLine {
    pub ordertext: String,
    /// Per-unit amount in minor units.
    pub amount: MinorUnits,
    pub quantity: i64,
}

//--------------------------------------     SessionOrder    ---------------------------------------------------------
/// The `order` block of a charge-session payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionOrder {
    pub handle: String,
    pub generate_handle: bool,
    /// Total amount in minor units. `None` when `order_lines` carry the amounts instead.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<MinorUnits>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_lines: Option<Vec<OrderLine>>,
    pub currency: String,
    pub customer: CustomerInfo,
    pub billing_address: InvoiceAddress,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping_address: Option<InvoiceAddress>,
}

//--------------------------------------  Session requests   ---------------------------------------------------------
/// `POST {checkout}/v1/session/charge`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChargeSessionRequest {
    pub locale: String,
    pub recurring: bool,
    pub order: SessionOrder,
    pub accept_url: String,
    pub cancel_url: String,
}

/// `POST {checkout}/v1/session/recurring` — stores a card without charging it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurringSessionRequest {
    pub locale: String,
    pub button_text: String,
    pub create_customer: CustomerInfo,
    pub accept_url: String,
    pub cancel_url: String,
}

/// Response to either session-create call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

//--------------------------------------    ChargeRequest    ---------------------------------------------------------
/// `POST {api}/v1/charge` — immediate charge against a stored payment source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChargeRequest {
    pub handle: String,
    pub amount: MinorUnits,
    pub currency: String,
    /// The stored card token to charge.
    pub source: String,
    pub recurring: bool,
    pub customer: CustomerInfo,
    pub billing_address: InvoiceAddress,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping_address: Option<InvoiceAddress>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChargeResponse {
    pub state: ChargeState,
    #[serde(default)]
    pub transaction: Option<String>,
    #[serde(default)]
    pub handle: Option<String>,
}

//--------------------------------------   Settle / Refund   ---------------------------------------------------------
/// Body of `POST {api}/v1/charge/{handle}/settle`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettleRequest {
    pub amount: MinorUnits,
}

/// `POST {api}/v1/refund`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundRequest {
    pub invoice: String,
    pub amount: MinorUnits,
}

//--------------------------------------       Invoice       ---------------------------------------------------------
/// A remote refund record attached to a settled invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditNote {
    pub id: String,
    pub amount: MinorUnits,
}

/// `GET {api}/v1/invoice/{handle}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub handle: String,
    pub state: ChargeState,
    #[serde(default)]
    pub transaction: Option<String>,
    #[serde(default)]
    pub authorized_amount: MinorUnits,
    #[serde(default)]
    pub settled_amount: MinorUnits,
    #[serde(default)]
    pub refunded_amount: MinorUnits,
    #[serde(default)]
    pub credit_notes: Vec<CreditNote>,
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
}

//--------------------------------------   WebhookSettings   ---------------------------------------------------------
/// `GET {api}/v1/account/webhook_settings` — includes the shared signing secret.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookSettings {
    pub urls: Vec<String>,
    pub disabled: bool,
    #[serde(default)]
    pub secret: Option<String>,
}

/// Body of `PUT {api}/v1/account/webhook_settings`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewWebhookSettings {
    pub urls: Vec<String>,
    pub disabled: bool,
}

//--------------------------------------     CardSource      ---------------------------------------------------------
/// A stored card, as returned by the customer payment-method endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardSource {
    pub masked_card: String,
    /// Expiry in `MM-YY` format.
    pub exp_date: String,
    pub card_type: String,
}

impl CardSource {
    /// Splits the `MM-YY` expiry into a month and a four-digit year.
    pub fn expiry(&self) -> Result<(u8, u16), crate::ReepayApiError> {
        let (month, year) = self
            .exp_date
            .split_once('-')
            .ok_or_else(|| crate::ReepayApiError::RestResponseError(format!("Bad expiry date: {}", self.exp_date)))?;
        let month = month
            .parse::<u8>()
            .map_err(|e| crate::ReepayApiError::RestResponseError(format!("Bad expiry month: {e}")))?;
        let year = year
            .parse::<u16>()
            .map_err(|e| crate::ReepayApiError::RestResponseError(format!("Bad expiry year: {e}")))?;
        Ok((month, 2000 + year))
    }
}
