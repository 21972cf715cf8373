use mockall::mock;
use reepay_api::{
    CardSource,
    ChargeRequest,
    ChargeResponse,
    ChargeSessionRequest,
    CheckoutSession,
    Invoice,
    NewWebhookSettings,
    RecurringSessionRequest,
    ReepayApiError,
    WebhookSettings,
};
use rpg_common::MinorUnits;
use rpg_engine::traits::ProcessorApi;

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
    /// A mock that serves the shared test webhook secret.
    pub fn with_webhook_secret() -> Self {
        let mut processor = MockProcessor::new();
        processor.expect_fetch_webhook_settings().returning(|| {
            Ok(WebhookSettings {
                urls: vec!["https://shop.example/webhook".to_string()],
                disabled: false,
                secret: Some(super::helpers::WEBHOOK_SECRET.to_string()),
            })
        });
        processor
    }
}
