//! The order reconciler: the state machine that applies webhook events and polling fallbacks to local orders.
//!
//! Order status moves `pending → authorized → settled`, with `cancelled` reachable from pending or authorized,
//! `failed` on charge errors, and the refunded statuses after settlement. Every transition is idempotent: replayed
//! events are detected via the stored transaction id (or the processed credit-note list for refunds) and
//! acknowledged without reprocessing.

use log::*;
use reepay_api::ChargeState;
use rpg_common::Secret;

use crate::{
    db_types::{customer_handle, meta_keys, user_id_from_customer_handle, Order, OrderId, OrderStatusType},
    events::{EventType, WebhookEvent},
    flow_api::errors::PaymentFlowError,
    helpers::{poll_until, verify_signature, Delay, PollPolicy, SecretCache, TokioDelay},
    settlement::{self, SettleConfig},
    traits::{OrderStore, ProcessorApi},
};

/// How a webhook delivery was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// The event mutated the order.
    Applied,
    /// A duplicate delivery. Acknowledged without reprocessing.
    AlreadyApplied,
    /// A recognized event this engine has nothing to do for.
    Ignored,
}

#[derive(Clone)]
pub struct Reconciler<S, P, D = TokioDelay> {
    store: S,
    processor: P,
    settle_config: SettleConfig,
    secrets: SecretCache,
    poll_policy: PollPolicy,
    delay: D,
}

impl<S, P> Reconciler<S, P, TokioDelay>
where
    S: OrderStore,
    P: ProcessorApi,
{
    pub fn new(store: S, processor: P, settle_config: SettleConfig) -> Self {
        Self {
            store,
            processor,
            settle_config,
            secrets: SecretCache::default(),
            poll_policy: PollPolicy::default(),
            delay: TokioDelay,
        }
    }
}

impl<S, P, D> Reconciler<S, P, D>
where
    S: OrderStore,
    P: ProcessorApi,
    D: Delay,
{
    /// Replaces the sleep provider. Tests use this to poll without real delays.
    pub fn with_delay<D2: Delay>(self, delay: D2) -> Reconciler<S, P, D2> {
        Reconciler {
            store: self.store,
            processor: self.processor,
            settle_config: self.settle_config,
            secrets: self.secrets,
            poll_policy: self.poll_policy,
            delay,
        }
    }

    pub fn with_poll_policy(mut self, policy: PollPolicy) -> Self {
        self.poll_policy = policy;
        self
    }

    /// Verifies and applies a webhook delivery.
    ///
    /// Signature verification precedes everything. A bad signature, a missing field or an unknown event type
    /// rejects the delivery with no mutation; [`PaymentFlowError::is_client_fault`] tells the endpoint to answer
    /// with a 400 so the processor retries or alerts.
    pub async fn handle_webhook(&self, event: &WebhookEvent) -> Result<WebhookOutcome, PaymentFlowError> {
        let secret = self
            .secrets
            .get_or_fetch(|| async {
                let settings = self.processor.fetch_webhook_settings().await?;
                settings
                    .secret
                    .map(Secret::new)
                    .ok_or(PaymentFlowError::MissingEventField("webhook secret"))
            })
            .await?;
        verify_signature(secret.reveal(), &event.timestamp, &event.id, &event.signature)?;

        debug!("Handling webhook {} ({})", event.event_type, event.id);
        match &event.event_type {
            EventType::InvoiceAuthorized => {
                let (handle, transaction) = invoice_fields(event)?;
                self.on_invoice_authorized(handle, transaction).await
            },
            EventType::InvoiceSettled => {
                let (handle, transaction) = invoice_fields(event)?;
                self.on_invoice_settled(handle, transaction).await
            },
            EventType::InvoiceCancelled => {
                let (handle, transaction) = invoice_fields(event)?;
                self.on_invoice_cancelled(handle, transaction).await
            },
            EventType::InvoiceRefund => {
                let handle = event.invoice.as_deref().ok_or(PaymentFlowError::MissingEventField("invoice"))?;
                self.on_invoice_refund(handle).await
            },
            EventType::InvoiceCreated => {
                trace!("Invoice created for {:?}. Nothing to reconcile yet.", event.invoice);
                Ok(WebhookOutcome::Ignored)
            },
            EventType::CustomerCreated => {
                let customer = event.customer.as_deref().ok_or(PaymentFlowError::MissingEventField("customer"))?;
                self.on_customer_created(customer).await
            },
            EventType::CustomerPaymentMethodAdded => {
                let customer = event.customer.as_deref().ok_or(PaymentFlowError::MissingEventField("customer"))?;
                let method =
                    event.payment_method.as_deref().ok_or(PaymentFlowError::MissingEventField("payment_method"))?;
                self.on_payment_method_added(customer, method).await
            },
            EventType::Other(s) => Err(PaymentFlowError::UnknownEventType(s.clone())),
        }
    }

    /// Confirms a payment after the customer returns from the hosted session.
    ///
    /// The synchronous redirect often reaches the shop before the webhook does. This polls the local order for a
    /// bounded number of attempts and, if the webhook still has not landed, fetches the remote invoice directly
    /// and applies the same transitions the webhook would have.
    pub async fn confirm_payment(&self, order_id: OrderId) -> Result<OrderStatusType, PaymentFlowError> {
        let settled_locally = poll_until(self.poll_policy, &self.delay, || async {
            let order = self.store.fetch_order(order_id).await?;
            Ok::<_, PaymentFlowError>((order.status != OrderStatusType::Pending).then_some(order.status))
        })
        .await?;
        if let Some(status) = settled_locally {
            if status.is_paid() || status == OrderStatusType::Authorized {
                self.store.set_meta(order_id, meta_keys::PAYMENT_CONFIRMED, "1").await?;
            }
            return Ok(status);
        }

        info!("No webhook arrived for order {order_id} in time. Fetching the invoice state directly.");
        let order = self.store.fetch_order(order_id).await?;
        let invoice = self.processor.fetch_invoice(&order.reepay_handle()).await?;
        // The transaction id is the idempotency key for the paid transitions. An invoice without one cannot be
        // applied; the order stays pending until the webhook (which always carries the id) lands.
        let transaction = invoice.transaction.as_deref();
        match (invoice.state, transaction) {
            (ChargeState::Authorized, Some(transaction)) => {
                self.on_invoice_authorized(&order.reepay_handle(), transaction).await?;
            },
            (ChargeState::Settled, Some(transaction)) => {
                self.on_invoice_settled(&order.reepay_handle(), transaction).await?;
            },
            (ChargeState::Authorized | ChargeState::Settled, None) => {
                warn!(
                    "Invoice for order {order_id} reports {} but carries no transaction id. Leaving the order \
                     for the webhook.",
                    invoice.state
                );
            },
            (ChargeState::Cancelled, transaction) => {
                self.on_invoice_cancelled(&order.reepay_handle(), transaction.unwrap_or_default()).await?;
            },
            (ChargeState::Failed, _) => {
                self.store.update_status(order_id, OrderStatusType::Failed).await?;
                self.store.add_note(order_id, "Payment failed at the processor.").await?;
            },
            (ChargeState::Created, _) => {
                debug!("Invoice for order {order_id} is still open. Leaving the order pending.");
            },
        }
        let order = self.store.fetch_order(order_id).await?;
        if order.status.is_paid() || order.status == OrderStatusType::Authorized {
            self.store.set_meta(order_id, meta_keys::PAYMENT_CONFIRMED, "1").await?;
        }
        Ok(order.status)
    }

    /// Full post-redirect finalization: persists the card token when the customer asked to save it (or the order
    /// holds a subscription), completes zero-total orders without a charge, and confirms everything else via
    /// [`Self::confirm_payment`].
    pub async fn finalize(
        &self,
        order_id: OrderId,
        payment_method: Option<&str>,
    ) -> Result<OrderStatusType, PaymentFlowError> {
        let order = self.store.fetch_order(order_id).await?;
        if let (Some(method), Some(user_id)) = (payment_method, order.user_id) {
            if order.meta_flag(meta_keys::MAYBE_SAVE_CARD) || order.contains_subscription() {
                self.on_payment_method_added(&customer_handle(user_id), method).await?;
                self.store.set_meta(order_id, meta_keys::TOKEN_ID, method).await?;
            }
        }
        if order.total.is_zero() {
            self.store.update_status(order_id, OrderStatusType::Settled).await?;
            self.store.set_meta(order_id, meta_keys::PAYMENT_CONFIRMED, "1").await?;
            info!("Zero-total order {order_id} completed without a charge");
            return Ok(OrderStatusType::Settled);
        }
        self.confirm_payment(order_id).await
    }

    pub async fn on_invoice_authorized(
        &self,
        handle: &str,
        transaction: &str,
    ) -> Result<WebhookOutcome, PaymentFlowError> {
        let order = self.store.fetch_order_by_handle(handle).await?;
        if order.transaction_id.as_deref() == Some(transaction) {
            info!("Authorization {transaction} already applied to order {}", order.id);
            return Ok(WebhookOutcome::AlreadyApplied);
        }
        self.reduce_stock_once(order.id).await?;
        self.store.set_transaction_id(order.id, transaction).await?;
        self.store.update_status(order.id, OrderStatusType::Authorized).await?;
        self.store.set_meta(order.id, meta_keys::CHARGE_STATE, "authorized").await?;
        info!("Order {} authorized under transaction {transaction}", order.id);
        self.process_instant_settle(order.id).await?;
        Ok(WebhookOutcome::Applied)
    }

    pub async fn on_invoice_settled(
        &self,
        handle: &str,
        transaction: &str,
    ) -> Result<WebhookOutcome, PaymentFlowError> {
        let order = self.store.fetch_order_by_handle(handle).await?;
        let applied = self.store.meta(order.id, meta_keys::CAPTURE_TRANSACTION).await?;
        if applied.as_deref() == Some(transaction) {
            info!("Settlement {transaction} already applied to order {}", order.id);
            return Ok(WebhookOutcome::AlreadyApplied);
        }
        self.store.set_meta(order.id, meta_keys::CAPTURE_TRANSACTION, transaction).await?;
        self.store.set_meta(order.id, meta_keys::CHARGE_STATE, "settled").await?;
        let decision = settlement::compute(&order, &self.settle_config);
        if decision.instant_settle_amount.is_zero() || decision.covers_whole_order() {
            self.store.update_status(order.id, OrderStatusType::Settled).await?;
            info!("Order {} fully settled under transaction {transaction}", order.id);
        } else {
            // A partial settlement is in progress. Record it without closing the order.
            self.store
                .add_note(order.id, &format!("Transaction partly settled with amount {}.", decision.instant_settle_amount))
                .await?;
        }
        Ok(WebhookOutcome::Applied)
    }

    pub async fn on_invoice_cancelled(
        &self,
        handle: &str,
        transaction: &str,
    ) -> Result<WebhookOutcome, PaymentFlowError> {
        let order = self.store.fetch_order_by_handle(handle).await?;
        if order.status == OrderStatusType::Cancelled {
            info!("Order {} is already cancelled", order.id);
            return Ok(WebhookOutcome::AlreadyApplied);
        }
        self.store.set_meta(order.id, meta_keys::CANCEL_TRANSACTION, transaction).await?;
        self.store.set_meta(order.id, meta_keys::CHARGE_STATE, "cancelled").await?;
        self.store.update_status(order.id, OrderStatusType::Cancelled).await?;
        info!("Order {} cancelled by the processor", order.id);
        Ok(WebhookOutcome::Applied)
    }

    /// Applies remote refunds (credit notes) as local refunds, once each.
    pub async fn on_invoice_refund(&self, handle: &str) -> Result<WebhookOutcome, PaymentFlowError> {
        let order = self.store.fetch_order_by_handle(handle).await?;
        let invoice = self.processor.fetch_invoice(handle).await?;
        let mut processed = self.processed_credit_notes(&order).await?;
        let mut applied_any = false;
        for note in &invoice.credit_notes {
            if processed.iter().any(|id| id == &note.id) {
                debug!("Credit note {} already refunded on order {}", note.id, order.id);
                continue;
            }
            self.store
                .create_refund(order.id, note.amount, &format!("Refunded via processor. Credit note id {}.", note.id))
                .await?;
            self.store.add_note(order.id, &format!("Refunded {}. Credit note id {}.", note.amount, note.id)).await?;
            processed.push(note.id.clone());
            applied_any = true;
        }
        if !applied_any {
            return Ok(WebhookOutcome::AlreadyApplied);
        }
        let ids = serde_json::to_string(&processed)
            .map_err(|e| PaymentFlowError::UnexpectedResponse(e.to_string()))?;
        self.store.set_meta(order.id, meta_keys::CREDIT_NOTE_IDS, &ids).await?;
        let status = if invoice.refunded_amount >= order.total {
            OrderStatusType::RefundedFull
        } else {
            OrderStatusType::RefundedPartial
        };
        self.store.update_status(order.id, status).await?;
        info!("Order {} refunded {} in total. Status is now {status}", order.id, invoice.refunded_amount);
        Ok(WebhookOutcome::Applied)
    }

    /// Persists the remote-customer-to-local-user mapping when the handle follows the `customer-<user_id>`
    /// convention. Handles created outside the shop do not map and are ignored.
    pub async fn on_customer_created(&self, customer: &str) -> Result<WebhookOutcome, PaymentFlowError> {
        match user_id_from_customer_handle(customer) {
            Some(user_id) => {
                self.store.save_customer_mapping(user_id, customer).await?;
                info!("Mapped remote customer {customer} to user {user_id}");
                Ok(WebhookOutcome::Applied)
            },
            None => {
                debug!("Customer handle {customer} does not follow the local naming convention. Ignoring.");
                Ok(WebhookOutcome::Ignored)
            },
        }
    }

    pub async fn on_payment_method_added(
        &self,
        customer: &str,
        payment_method: &str,
    ) -> Result<WebhookOutcome, PaymentFlowError> {
        let Some(user_id) = user_id_from_customer_handle(customer) else {
            debug!("Customer handle {customer} does not follow the local naming convention. Ignoring.");
            return Ok(WebhookOutcome::Ignored);
        };
        let card = self.processor.fetch_card(customer, payment_method).await?;
        let (expiry_month, expiry_year) = card.expiry()?;
        let token = crate::db_types::PaymentToken {
            id: 0,
            token: payment_method.to_string(),
            masked_card: card.masked_card,
            expiry_month,
            expiry_year,
            card_type: card.card_type,
            user_id,
        };
        let token = self.store.save_token(token).await?;
        info!("Stored card {} for user {user_id} from webhook", token.masked_card);
        Ok(WebhookOutcome::Applied)
    }

    /// Captures the instant-settle portion of a freshly authorized order.
    ///
    /// The order is re-read first: a concurrent cancellation or settlement must win over this capture.
    pub async fn process_instant_settle(&self, order_id: OrderId) -> Result<(), PaymentFlowError> {
        let order = self.store.fetch_order(order_id).await?;
        if order.is_cancelled_locally() || order.status == OrderStatusType::Cancelled {
            debug!("Order {order_id} is cancelled. Skipping instant settlement.");
            return Ok(());
        }
        let decision = settlement::compute(&order, &self.settle_config);
        if decision.instant_settle_amount.is_zero() {
            trace!("Nothing to instantly settle on order {order_id}");
            return Ok(());
        }
        let amount = if decision.covers_whole_order() {
            order.total
        } else {
            decision.instant_settle_amount.min(order.total)
        };
        match self.processor.settle(&order.reepay_handle(), amount).await {
            Ok(response) => {
                if let Some(transaction) = response.transaction {
                    self.store.set_meta(order.id, meta_keys::CAPTURE_TRANSACTION, &transaction).await?;
                }
                if amount == order.total {
                    self.store.update_status(order.id, OrderStatusType::Settled).await?;
                    self.store.add_note(order.id, &format!("Transaction settled with amount {amount}.")).await?;
                } else {
                    self.store.add_note(order.id, &format!("Transaction partly settled with amount {amount}.")).await?;
                }
                Ok(())
            },
            Err(e) if e.is_already_settled() => {
                self.store.update_status(order.id, OrderStatusType::Settled).await?;
                self.store.add_note(order.id, "Transaction already settled.").await?;
                Ok(())
            },
            Err(e) => {
                warn!("Instant settlement of order {order_id} failed: {e}");
                self.store.add_note(order.id, &format!("Instant settle failed: {e}")).await?;
                Err(e.into())
            },
        }
    }

    async fn processed_credit_notes(&self, order: &Order) -> Result<Vec<String>, PaymentFlowError> {
        let raw = self.store.meta(order.id, meta_keys::CREDIT_NOTE_IDS).await?;
        let ids = match raw {
            Some(json) => serde_json::from_str(&json).unwrap_or_else(|e| {
                warn!("Corrupt credit note list on order {}: {e}. Starting a fresh list.", order.id);
                Vec::new()
            }),
            None => Vec::new(),
        };
        Ok(ids)
    }

    async fn reduce_stock_once(&self, order_id: OrderId) -> Result<(), PaymentFlowError> {
        let reduced = self.store.meta(order_id, meta_keys::STOCK_REDUCED).await?.is_some();
        if !reduced {
            self.store.reduce_stock(order_id).await?;
            self.store.set_meta(order_id, meta_keys::STOCK_REDUCED, "1").await?;
        }
        Ok(())
    }
}

fn invoice_fields(event: &WebhookEvent) -> Result<(&str, &str), PaymentFlowError> {
    let handle = event.invoice.as_deref().ok_or(PaymentFlowError::MissingEventField("invoice"))?;
    let transaction = event.transaction.as_deref().ok_or(PaymentFlowError::MissingEventField("transaction"))?;
    Ok((handle, transaction))
}
