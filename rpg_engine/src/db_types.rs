use std::{collections::HashMap, fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use rpg_common::{helpers::parse_boolean_flag, MinorUnits};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Metadata keys the engine reads and writes on orders. The key-value store itself belongs to the external order
/// persistence layer; these constants are the contract for which keys the engine owns.
pub mod meta_keys {
    /// Set at session creation when the customer asked for the card to be stored.
    pub const MAYBE_SAVE_CARD: &str = "_reepay_maybe_save_card";
    /// The remote invoice handle. Normally `order-<id>`, but repaired on renewals if missing.
    pub const REEPAY_ORDER: &str = "_reepay_order";
    /// The stored payment token bound to this order.
    pub const TOKEN_ID: &str = "_reepay_token_id";
    /// JSON list of credit-note ids already applied as local refunds.
    pub const CREDIT_NOTE_IDS: &str = "_reepay_credit_note_ids";
    /// Guards stock reduction so retried authorization events reduce stock once.
    pub const STOCK_REDUCED: &str = "_order_stock_reduced";
    /// Local cancellation marker. Once set, no further remote calls are made for the order.
    pub const ORDER_CANCELLED: &str = "_reepay_order_cancelled";
    /// Transaction id of the capture that settled the order.
    pub const CAPTURE_TRANSACTION: &str = "_reepay_capture_transaction";
    /// Transaction id of the cancellation.
    pub const CANCEL_TRANSACTION: &str = "_reepay_cancel_transaction";
    /// Last observed remote charge state.
    pub const CHARGE_STATE: &str = "reepay_charge";
    /// Set when the customer's return from the hosted session has been confirmed against remote state.
    pub const PAYMENT_CONFIRMED: &str = "_reepay_payment_confirmed";
    /// Order-level subscription flag. Set by the subscription machinery when the cart holds a recurring product.
    pub const CONTAINS_SUBSCRIPTION: &str = "_reepay_subscription";
}

//--------------------------------------      OrderId        ---------------------------------------------------------
/// A lightweight wrapper around the local order identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OrderId(pub i64);

impl OrderId {
    /// The invoice handle this order uses on the processor.
    pub fn to_handle(self) -> String {
        format!("order-{}", self.0)
    }

    /// Recovers the order id from an invoice handle of the form `order-<id>`.
    pub fn from_handle(handle: &str) -> Option<Self> {
        handle.strip_prefix("order-").and_then(|id| id.parse::<i64>().ok()).map(Self)
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<i64> for OrderId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

/// The remote customer handle for a local user, by naming convention.
pub fn customer_handle(user_id: i64) -> String {
    format!("customer-{user_id}")
}

/// Recovers the local user id from a `customer-<id>` handle.
pub fn user_id_from_customer_handle(handle: &str) -> Option<i64> {
    handle.strip_prefix("customer-").and_then(|id| id.parse::<i64>().ok())
}

//--------------------------------------   OrderStatusType   ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatusType {
    /// Checkout has started but no payment outcome is known yet.
    Pending,
    /// Funds are reserved on the processor but not captured.
    Authorized,
    /// Payment received; the order is being fulfilled.
    Processing,
    /// The full amount has been captured.
    Settled,
    Cancelled,
    Failed,
    RefundedPartial,
    RefundedFull,
}

#[derive(Debug, Clone, Error)]
#[error("Invalid conversion from string to OrderStatusType: {0}")]
pub struct ConversionError(String);

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OrderStatusType::Pending => "Pending",
            OrderStatusType::Authorized => "Authorized",
            OrderStatusType::Processing => "Processing",
            OrderStatusType::Settled => "Settled",
            OrderStatusType::Cancelled => "Cancelled",
            OrderStatusType::Failed => "Failed",
            OrderStatusType::RefundedPartial => "RefundedPartial",
            OrderStatusType::RefundedFull => "RefundedFull",
        };
        write!(f, "{s}")
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Authorized" => Ok(Self::Authorized),
            "Processing" => Ok(Self::Processing),
            "Settled" => Ok(Self::Settled),
            "Cancelled" => Ok(Self::Cancelled),
            "Failed" => Ok(Self::Failed),
            "RefundedPartial" => Ok(Self::RefundedPartial),
            "RefundedFull" => Ok(Self::RefundedFull),
            s => Err(ConversionError(s.to_string())),
        }
    }
}

impl OrderStatusType {
    /// True for statuses that mean the customer has paid in full.
    pub fn is_paid(&self) -> bool {
        matches!(self, OrderStatusType::Processing | OrderStatusType::Settled)
    }
}

//--------------------------------------      Address        ---------------------------------------------------------
/// A billing or shipping address as stored on the local order. All fields default to empty strings, matching the
/// persistence layer's behavior for absent values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub first_name: String,
    pub last_name: String,
    pub company: String,
    pub address_1: String,
    pub address_2: String,
    pub city: String,
    pub state: String,
    pub postcode: String,
    pub country: String,
    pub email: String,
    pub phone: String,
}

impl Address {
    /// True when no location-bearing field is populated.
    pub fn is_empty(&self) -> bool {
        [
            &self.first_name,
            &self.last_name,
            &self.company,
            &self.address_1,
            &self.address_2,
            &self.city,
            &self.state,
            &self.postcode,
            &self.country,
        ]
        .iter()
        .all(|s| s.is_empty())
    }
}

//--------------------------------------      LineItem       ---------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: i64,
    pub name: String,
    pub quantity: i64,
    /// Per-unit price in minor currency units.
    pub unit_price: MinorUnits,
    pub is_virtual: bool,
    pub is_downloadable: bool,
    pub is_recurring: bool,
}

impl LineItem {
    pub fn total(&self) -> MinorUnits {
        self.unit_price * self.quantity
    }
}

//--------------------------------------       Order         ---------------------------------------------------------
/// A snapshot of a local order. Owned by the external persistence layer; the engine reads it, decides, and writes
/// back through [`crate::traits::OrderStore`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    /// The local user that placed the order, if they have an account.
    pub user_id: Option<i64>,
    pub currency: String,
    /// Order total in minor currency units.
    pub total: MinorUnits,
    pub status: OrderStatusType,
    pub transaction_id: Option<String>,
    pub billing: Address,
    pub shipping: Address,
    pub needs_shipping: bool,
    pub items: Vec<LineItem>,
    pub meta: HashMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn meta(&self, key: &str) -> Option<&str> {
        self.meta.get(key).map(|s| s.as_str())
    }

    pub fn meta_flag(&self, key: &str) -> bool {
        parse_boolean_flag(self.meta.get(key).cloned(), false)
    }

    /// True when the order holds a recurring product, either on a line item or via the order-level flag set by the
    /// subscription machinery.
    pub fn contains_subscription(&self) -> bool {
        self.items.iter().any(|i| i.is_recurring) || self.meta_flag(meta_keys::CONTAINS_SUBSCRIPTION)
    }

    /// The invoice handle for this order on the processor. The stored meta value wins over the naming convention,
    /// since renewals may have been bound to a repaired handle.
    pub fn reepay_handle(&self) -> String {
        self.meta(meta_keys::REEPAY_ORDER).map(String::from).unwrap_or_else(|| self.id.to_handle())
    }

    pub fn is_cancelled_locally(&self) -> bool {
        self.meta_flag(meta_keys::ORDER_CANCELLED)
    }
}

//--------------------------------------    PaymentToken     ---------------------------------------------------------
/// A stored card or payment source. Created when a customer successfully adds a card; never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentToken {
    pub id: i64,
    pub token: String,
    pub masked_card: String,
    pub expiry_month: u8,
    pub expiry_year: u16,
    pub card_type: String,
    pub user_id: i64,
}
