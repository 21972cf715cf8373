//! Shared fixtures for the flow tests: a mocked processor, order builders and signed webhook events.

use chrono::Utc;
use mockall::mock;
use reepay_api::{
    CardSource,
    ChargeRequest,
    ChargeResponse,
    ChargeSessionRequest,
    ChargeState,
    CheckoutSession,
    Invoice,
    NewWebhookSettings,
    RecurringSessionRequest,
    ReepayApiError,
    WebhookSettings,
};
use rpg_common::MinorUnits;

use crate::{
    db_types::{Address, LineItem, Order, OrderId, OrderStatusType},
    events::{EventType, WebhookEvent},
    helpers::calculate_signature,
    traits::ProcessorApi,
};

pub const WEBHOOK_SECRET: &str = "whsec_test_1234";

/// A [`Delay`](crate::helpers::Delay) that returns immediately, so polling loops run at full speed in tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

impl crate::helpers::Delay for NoDelay {
    async fn sleep(&self, _duration: std::time::Duration) {}
}

mock! {
    pub Processor {}

    impl ProcessorApi for Processor {
        fn is_test_mode(&self) -> bool;
        async fn create_charge_session(&self, request: ChargeSessionRequest) -> Result<CheckoutSession, ReepayApiError>;
        async fn create_recurring_session(&self, request: RecurringSessionRequest) -> Result<CheckoutSession, ReepayApiError>;
        async fn charge(&self, request: ChargeRequest) -> Result<ChargeResponse, ReepayApiError>;
        async fn settle(&self, handle: &str, amount: MinorUnits) -> Result<ChargeResponse, ReepayApiError>;
        async fn cancel(&self, handle: &str) -> Result<ChargeResponse, ReepayApiError>;
        async fn refund(&self, invoice: &str, amount: MinorUnits) -> Result<ChargeResponse, ReepayApiError>;
        async fn fetch_invoice(&self, handle: &str) -> Result<Invoice, ReepayApiError>;
        async fn fetch_webhook_settings(&self) -> Result<WebhookSettings, ReepayApiError>;
        async fn update_webhook_settings(&self, settings: NewWebhookSettings) -> Result<WebhookSettings, ReepayApiError>;
        async fn fetch_card(&self, customer_handle: &str, card_id: &str) -> Result<CardSource, ReepayApiError>;
    }

    impl Clone for Processor {
        fn clone(&self) -> Self;
    }
}

impl MockProcessor {
    /// A mock that serves the shared test webhook secret and defaults to test mode.
    pub fn with_webhook_secret() -> Self {
        let mut processor = MockProcessor::new();
        processor.expect_is_test_mode().return_const(true);
        processor.expect_fetch_webhook_settings().returning(|| {
            Ok(WebhookSettings {
                urls: vec!["https://shop.example/webhook".to_string()],
                disabled: false,
                secret: Some(WEBHOOK_SECRET.to_string()),
            })
        });
        processor
    }
}

pub fn physical_item(price: i64, quantity: i64) -> LineItem {
    LineItem {
        product_id: 10,
        name: "Boxed widget".to_string(),
        quantity,
        unit_price: MinorUnits::from(price),
        is_virtual: false,
        is_downloadable: false,
        is_recurring: false,
    }
}

pub fn virtual_item(price: i64, quantity: i64) -> LineItem {
    LineItem {
        product_id: 20,
        name: "Download".to_string(),
        quantity,
        unit_price: MinorUnits::from(price),
        is_virtual: true,
        is_downloadable: false,
        is_recurring: false,
    }
}

pub fn order(id: i64, items: Vec<LineItem>) -> Order {
    let total = items.iter().map(|i| i.total()).sum();
    Order {
        id: OrderId(id),
        user_id: Some(501),
        currency: "DKK".to_string(),
        total,
        status: OrderStatusType::Pending,
        transaction_id: None,
        billing: Address {
            first_name: "Asta".to_string(),
            last_name: "Nielsen".to_string(),
            address_1: "Strandvejen 100".to_string(),
            city: "Aarhus".to_string(),
            postcode: "8000".to_string(),
            country: "DK".to_string(),
            email: "asta@example.com".to_string(),
            ..Default::default()
        },
        shipping: Address::default(),
        needs_shipping: false,
        items,
        meta: Default::default(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

/// A correctly signed webhook event for the given invoice handle.
pub fn signed_event(event_type: EventType, invoice: &str, transaction: &str) -> WebhookEvent {
    let id = format!("ev_{invoice}_{transaction}");
    let timestamp = "2024-05-01T12:00:00.000+00:00".to_string();
    let signature = calculate_signature(WEBHOOK_SECRET, &timestamp, &id).unwrap();
    WebhookEvent {
        event_type,
        id,
        timestamp,
        signature,
        invoice: Some(invoice.to_string()),
        transaction: Some(transaction.to_string()),
        customer: None,
        payment_method: None,
    }
}

pub fn charge_response(state: ChargeState, transaction: &str) -> ChargeResponse {
    ChargeResponse { state, transaction: Some(transaction.to_string()), handle: None }
}

pub fn invoice(handle: &str, state: ChargeState, authorized: i64, settled: i64, refunded: i64) -> Invoice {
    Invoice {
        handle: handle.to_string(),
        state,
        transaction: Some("tx_1".to_string()),
        authorized_amount: MinorUnits::from(authorized),
        settled_amount: MinorUnits::from(settled),
        refunded_amount: MinorUnits::from(refunded),
        credit_notes: vec![],
        created: None,
    }
}
