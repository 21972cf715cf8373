use std::sync::Arc;

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
    Method,
};
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    config::ReepayConfig,
    data_objects::{
        CardSource,
        ChargeRequest,
        ChargeResponse,
        ChargeSessionRequest,
        CheckoutSession,
        Invoice,
        NewWebhookSettings,
        RecurringSessionRequest,
        RefundRequest,
        SettleRequest,
        WebhookSettings,
    },
    ReepayApiError,
};
use rpg_common::MinorUnits;

/// Which of the two processor hosts a request is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Host {
    /// `api.reepay.com` - charges, invoices, refunds, account settings.
    Core,
    /// `checkout-api.reepay.com` - hosted payment sessions.
    Checkout,
}

#[derive(Clone)]
pub struct ReepayApi {
    config: ReepayConfig,
    client: Arc<Client>,
}

impl ReepayApi {
    pub fn new(config: ReepayConfig) -> Result<Self, ReepayApiError> {
        let mut headers = HeaderMap::with_capacity(2);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        headers.insert("Accept", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| ReepayApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn config(&self) -> &ReepayConfig {
        &self.config
    }

    /// Executes a single REST call against the processor. The merchant private key goes in as the basic-auth
    /// username with an empty password, per the processor's auth scheme.
    async fn rest_query<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        host: Host,
        path: &str,
        body: Option<B>,
    ) -> Result<T, ReepayApiError> {
        let url = self.url(host, path);
        trace!("Sending REST query: {url}");
        let mut req = self
            .client
            .request(method, url)
            .basic_auth(self.config.active_key().reveal(), Some(""));
        if let Some(body) = body {
            req = req.json(&body);
        }
        let response = req.send().await.map_err(|e| ReepayApiError::RestResponseError(e.to_string()))?;
        if response.status().is_success() {
            trace!("REST query successful. {}", response.status());
            response.json::<T>().await.map_err(|e| ReepayApiError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| ReepayApiError::RestResponseError(e.to_string()))?;
            Err(ReepayApiError::QueryError { status, message })
        }
    }

    fn url(&self, host: Host, path: &str) -> String {
        let base = match host {
            Host::Core => &self.config.api_base_url,
            Host::Checkout => &self.config.checkout_base_url,
        };
        format!("{base}{path}")
    }

    /// Creates a hosted session that takes payment for an order.
    pub async fn create_charge_session(
        &self,
        request: ChargeSessionRequest,
    ) -> Result<CheckoutSession, ReepayApiError> {
        debug!("Creating charge session for order {}", request.order.handle);
        let session = self
            .rest_query::<CheckoutSession, ChargeSessionRequest>(
                Method::POST,
                Host::Checkout,
                "/v1/session/charge",
                Some(request),
            )
            .await?;
        info!("Created charge session {}", session.id);
        Ok(session)
    }

    /// Creates a hosted session that stores a card on the customer without charging it.
    pub async fn create_recurring_session(
        &self,
        request: RecurringSessionRequest,
    ) -> Result<CheckoutSession, ReepayApiError> {
        debug!("Creating recurring session for customer {}", request.create_customer.handle);
        let session = self
            .rest_query::<CheckoutSession, RecurringSessionRequest>(
                Method::POST,
                Host::Checkout,
                "/v1/session/recurring",
                Some(request),
            )
            .await?;
        info!("Created recurring session {}", session.id);
        Ok(session)
    }

    /// Charges a stored payment source immediately. Server-side counterpart of the hosted session flow, used for
    /// renewals and merchant-initiated payments.
    pub async fn charge(&self, request: ChargeRequest) -> Result<ChargeResponse, ReepayApiError> {
        debug!("Charging {} against invoice {}", request.amount, request.handle);
        let response =
            self.rest_query::<ChargeResponse, ChargeRequest>(Method::POST, Host::Core, "/v1/charge", Some(request)).await?;
        info!("Charge returned state {}", response.state);
        Ok(response)
    }

    /// Captures (part of) an authorized charge.
    pub async fn settle(&self, handle: &str, amount: MinorUnits) -> Result<ChargeResponse, ReepayApiError> {
        let path = format!("/v1/charge/{handle}/settle");
        debug!("Settling {amount} on invoice {handle}");
        let response = self
            .rest_query::<ChargeResponse, SettleRequest>(Method::POST, Host::Core, &path, Some(SettleRequest { amount }))
            .await?;
        info!("Settled invoice {handle}. State is now {}", response.state);
        Ok(response)
    }

    /// Releases the authorization on a charge.
    pub async fn cancel(&self, handle: &str) -> Result<ChargeResponse, ReepayApiError> {
        let path = format!("/v1/charge/{handle}/cancel");
        debug!("Cancelling invoice {handle}");
        let response = self.rest_query::<ChargeResponse, ()>(Method::POST, Host::Core, &path, None).await?;
        info!("Cancelled invoice {handle}");
        Ok(response)
    }

    /// Refunds (part of) a settled invoice.
    pub async fn refund(&self, invoice: &str, amount: MinorUnits) -> Result<ChargeResponse, ReepayApiError> {
        debug!("Refunding {amount} on invoice {invoice}");
        let request = RefundRequest { invoice: invoice.to_string(), amount };
        let response =
            self.rest_query::<ChargeResponse, RefundRequest>(Method::POST, Host::Core, "/v1/refund", Some(request)).await?;
        info!("Refunded invoice {invoice}");
        Ok(response)
    }

    pub async fn fetch_invoice(&self, handle: &str) -> Result<Invoice, ReepayApiError> {
        let path = format!("/v1/invoice/{handle}");
        debug!("Fetching invoice {handle}");
        let invoice = self.rest_query::<Invoice, ()>(Method::GET, Host::Core, &path, None).await?;
        debug!("Invoice {handle} is in state {}", invoice.state);
        Ok(invoice)
    }

    /// Fetches the account webhook configuration, including the signing secret.
    pub async fn fetch_webhook_settings(&self) -> Result<WebhookSettings, ReepayApiError> {
        debug!("Fetching webhook settings");
        let settings =
            self.rest_query::<WebhookSettings, ()>(Method::GET, Host::Core, "/v1/account/webhook_settings", None).await?;
        info!("Fetched webhook settings. {} urls registered.", settings.urls.len());
        Ok(settings)
    }

    pub async fn update_webhook_settings(
        &self,
        settings: NewWebhookSettings,
    ) -> Result<WebhookSettings, ReepayApiError> {
        debug!("Updating webhook settings: {}", serde_json::to_string(&settings).unwrap_or_default());
        let settings = self
            .rest_query::<WebhookSettings, NewWebhookSettings>(
                Method::PUT,
                Host::Core,
                "/v1/account/webhook_settings",
                Some(settings),
            )
            .await?;
        info!("Updated webhook settings. {} urls registered.", settings.urls.len());
        Ok(settings)
    }

    /// Fetches a stored card for a customer.
    pub async fn fetch_card(&self, customer_handle: &str, card_id: &str) -> Result<CardSource, ReepayApiError> {
        let path = format!("/v1/customer/{customer_handle}/payment_method/{card_id}");
        debug!("Fetching card {card_id} for customer {customer_handle}");
        self.rest_query::<CardSource, ()>(Method::GET, Host::Core, &path, None).await
    }
}
