use reepay_api::{
    CardSource,
    ChargeRequest,
    ChargeResponse,
    ChargeSessionRequest,
    CheckoutSession,
    Invoice,
    NewWebhookSettings,
    RecurringSessionRequest,
    ReepayApi,
    ReepayApiError,
    WebhookSettings,
};
use rpg_common::MinorUnits;

/// The remote payment processor, as the engine sees it.
///
/// The payment flows take this trait rather than the concrete HTTP client, so tests can substitute a mock and
/// deployments can wrap the client with extra behavior.
#[allow(async_fn_in_trait)]
pub trait ProcessorApi: Clone {
    /// True when the client runs against the processor's test environment.
    fn is_test_mode(&self) -> bool;

    async fn create_charge_session(&self, request: ChargeSessionRequest) -> Result<CheckoutSession, ReepayApiError>;

    async fn create_recurring_session(
        &self,
        request: RecurringSessionRequest,
    ) -> Result<CheckoutSession, ReepayApiError>;

    async fn charge(&self, request: ChargeRequest) -> Result<ChargeResponse, ReepayApiError>;

    async fn settle(&self, handle: &str, amount: MinorUnits) -> Result<ChargeResponse, ReepayApiError>;

    async fn cancel(&self, handle: &str) -> Result<ChargeResponse, ReepayApiError>;

    async fn refund(&self, invoice: &str, amount: MinorUnits) -> Result<ChargeResponse, ReepayApiError>;

    async fn fetch_invoice(&self, handle: &str) -> Result<Invoice, ReepayApiError>;

    async fn fetch_webhook_settings(&self) -> Result<WebhookSettings, ReepayApiError>;

    async fn update_webhook_settings(&self, settings: NewWebhookSettings) -> Result<WebhookSettings, ReepayApiError>;

    async fn fetch_card(&self, customer_handle: &str, card_id: &str) -> Result<CardSource, ReepayApiError>;
}

impl ProcessorApi for ReepayApi {
    fn is_test_mode(&self) -> bool {
        self.config().test_mode
    }

    async fn create_charge_session(&self, request: ChargeSessionRequest) -> Result<CheckoutSession, ReepayApiError> {
        ReepayApi::create_charge_session(self, request).await
    }

    async fn create_recurring_session(
        &self,
        request: RecurringSessionRequest,
    ) -> Result<CheckoutSession, ReepayApiError> {
        ReepayApi::create_recurring_session(self, request).await
    }

    async fn charge(&self, request: ChargeRequest) -> Result<ChargeResponse, ReepayApiError> {
        ReepayApi::charge(self, request).await
    }

    async fn settle(&self, handle: &str, amount: MinorUnits) -> Result<ChargeResponse, ReepayApiError> {
        ReepayApi::settle(self, handle, amount).await
    }

    async fn cancel(&self, handle: &str) -> Result<ChargeResponse, ReepayApiError> {
        ReepayApi::cancel(self, handle).await
    }

    async fn refund(&self, invoice: &str, amount: MinorUnits) -> Result<ChargeResponse, ReepayApiError> {
        ReepayApi::refund(self, invoice, amount).await
    }

    async fn fetch_invoice(&self, handle: &str) -> Result<Invoice, ReepayApiError> {
        ReepayApi::fetch_invoice(self, handle).await
    }

    async fn fetch_webhook_settings(&self) -> Result<WebhookSettings, ReepayApiError> {
        ReepayApi::fetch_webhook_settings(self).await
    }

    async fn update_webhook_settings(&self, settings: NewWebhookSettings) -> Result<WebhookSettings, ReepayApiError> {
        ReepayApi::update_webhook_settings(self, settings).await
    }

    async fn fetch_card(&self, customer_handle: &str, card_id: &str) -> Result<CardSource, ReepayApiError> {
        ReepayApi::fetch_card(self, customer_handle, card_id).await
    }
}
