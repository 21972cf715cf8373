//! Client for the Reepay payment processor API.
//!
//! Two hosts are involved: the checkout API (`checkout-api.reepay.com`), which creates hosted payment sessions, and
//! the core API (`api.reepay.com`), which handles charges, settlement, refunds, invoices and account settings.
//! All amounts on the wire are integer minor currency units.

mod api;
mod config;
mod error;

pub mod data_objects;

pub use api::ReepayApi;
pub use config::ReepayConfig;
pub use data_objects::{
    CardSource,
    ChargeRequest,
    ChargeResponse,
    ChargeSessionRequest,
    ChargeState,
    CheckoutSession,
    CreditNote,
    CustomerInfo,
    Invoice,
    InvoiceAddress,
    NewWebhookSettings,
    OrderLine,
    RecurringSessionRequest,
    RefundRequest,
    SessionOrder,
    WebhookSettings,
};
pub use error::ReepayApiError;
