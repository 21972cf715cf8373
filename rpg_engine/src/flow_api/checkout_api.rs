//! Checkout-side payment flows: hosted session creation, direct token charges, renewals and card storage.

use log::*;
use reepay_api::{
    ChargeRequest,
    ChargeSessionRequest,
    ChargeState,
    CheckoutSession,
    CustomerInfo,
    InvoiceAddress,
    OrderLine,
    RecurringSessionRequest,
    SessionOrder,
};
use rpg_common::MinorUnits;

use crate::{
    db_types::{customer_handle, meta_keys, Address, Order, OrderId, OrderStatusType, PaymentToken},
    flow_api::errors::PaymentFlowError,
    settlement::{self, SettleConfig},
    traits::{OrderStore, ProcessorApi},
};

/// Why a hosted session is being created. A payment-method change must never charge the customer, so it always
/// produces a card-storing session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    Checkout,
    ChangePaymentMethod,
}

/// The outcome of a direct charge. "Already settled" is a recognized outcome of the double-submission race, not
/// an error: the money has been captured, so the order is marked paid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChargeOutcome {
    Authorized,
    Settled,
    AlreadySettled,
    Failed(String),
}

impl ChargeOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, ChargeOutcome::Failed(_))
    }
}

/// Customer-facing payment flows over an order store `S` and a processor client `P`.
#[derive(Clone)]
pub struct CheckoutApi<S, P> {
    store: S,
    processor: P,
    settle_config: SettleConfig,
    locale: String,
    accept_url: String,
    cancel_url: String,
    /// When set, sessions carry only the order total instead of itemized order lines.
    skip_order_lines: bool,
}

impl<S, P> CheckoutApi<S, P>
where
    S: OrderStore,
    P: ProcessorApi,
{
    pub fn new(
        store: S,
        processor: P,
        settle_config: SettleConfig,
        locale: String,
        accept_url: String,
        cancel_url: String,
        skip_order_lines: bool,
    ) -> Self {
        Self { store, processor, settle_config, locale, accept_url, cancel_url, skip_order_lines }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Creates a hosted payment session for the order.
    ///
    /// Zero-total orders and payment-method changes get a card-storing session instead of a charge session, since
    /// there is nothing to capture. The `recurring` flag is raised when the customer asked to save the card, the
    /// order holds a subscription, or the session is a payment-method change.
    pub async fn create_checkout_session(
        &self,
        order_id: OrderId,
        save_card: bool,
        mode: SessionMode,
    ) -> Result<CheckoutSession, PaymentFlowError> {
        let order = self.store.fetch_order(order_id).await?;
        if order.is_cancelled_locally() {
            return Err(PaymentFlowError::OrderCancelledLocally(order_id));
        }
        if save_card {
            self.store.set_meta(order_id, meta_keys::MAYBE_SAVE_CARD, "1").await?;
        }
        // Bind the invoice handle before the customer is redirected, so webhooks can find the order.
        self.store.set_meta(order_id, meta_keys::REEPAY_ORDER, &order.reepay_handle()).await?;

        if order.total.is_zero() || mode == SessionMode::ChangePaymentMethod {
            debug!("Creating card-storing session for order {}", order.id);
            let request = RecurringSessionRequest {
                locale: self.locale.clone(),
                button_text: String::new(),
                create_customer: self.customer_info(&order),
                accept_url: self.accept_url.clone(),
                cancel_url: self.cancel_url.clone(),
            };
            return Ok(self.processor.create_recurring_session(request).await?);
        }

        let recurring = save_card || order.contains_subscription();
        let request = ChargeSessionRequest {
            locale: self.locale.clone(),
            recurring,
            order: self.session_order(&order),
            accept_url: self.accept_url.clone(),
            cancel_url: self.cancel_url.clone(),
        };
        let session = self.processor.create_charge_session(request).await?;
        info!("Created payment session {} for order {}", session.id, order.id);
        Ok(session)
    }

    /// Creates a card-storing session outside any order, for the "add payment method" account page.
    pub async fn create_add_card_session(
        &self,
        user_id: i64,
        billing: &Address,
    ) -> Result<CheckoutSession, PaymentFlowError> {
        let request = RecurringSessionRequest {
            locale: self.locale.clone(),
            button_text: String::new(),
            create_customer: customer_block(customer_handle(user_id), billing, self.processor.is_test_mode()),
            accept_url: self.accept_url.clone(),
            cancel_url: self.cancel_url.clone(),
        };
        Ok(self.processor.create_recurring_session(request).await?)
    }

    /// Charges a stored token, for the order total unless an explicit amount is given. Used for renewals and
    /// merchant-initiated payments.
    ///
    /// The token must belong to the same customer as the order. The outcome is applied to the order before it is
    /// returned: authorization reduces stock (once) and stores the transaction id; settlement marks the order paid
    /// when nothing remains to capture; a processor rejection marks the order failed with an audit note.
    pub async fn charge_with_token(
        &self,
        order_id: OrderId,
        token_id: i64,
        amount: Option<MinorUnits>,
    ) -> Result<ChargeOutcome, PaymentFlowError> {
        let order = self.store.fetch_order(order_id).await?;
        if order.is_cancelled_locally() {
            return Err(PaymentFlowError::OrderCancelledLocally(order_id));
        }
        let token = self.store.fetch_token(token_id).await?;
        if order.user_id != Some(token.user_id) {
            warn!("Token {} does not belong to the customer on order {}", token_id, order.id);
            return Err(PaymentFlowError::AccessDenied);
        }
        let request = ChargeRequest {
            handle: order.reepay_handle(),
            amount: amount.unwrap_or(order.total),
            currency: order.currency.clone(),
            source: token.token.clone(),
            recurring: order.contains_subscription(),
            customer: self.customer_info(&order),
            billing_address: invoice_address(&order.billing),
            shipping_address: shipping_block(&order),
        };
        match self.processor.charge(request).await {
            Ok(response) => {
                let transaction = response.transaction.clone().unwrap_or_default();
                match response.state {
                    ChargeState::Authorized => {
                        self.apply_authorization(&order, &transaction).await?;
                        Ok(ChargeOutcome::Authorized)
                    },
                    ChargeState::Settled => {
                        self.apply_settled_charge(&order, &transaction).await?;
                        Ok(ChargeOutcome::Settled)
                    },
                    state => {
                        let reason = format!("Unexpected charge state: {state}");
                        self.fail_order(&order, &reason).await?;
                        Ok(ChargeOutcome::Failed(reason))
                    },
                }
            },
            Err(e) if e.is_already_settled() => {
                info!("Charge for order {} hit the already-settled race. Marking the order paid.", order.id);
                self.store.update_status(order.id, OrderStatusType::Settled).await?;
                self.store.add_note(order.id, "Transaction already settled.").await?;
                Ok(ChargeOutcome::AlreadySettled)
            },
            Err(e) => {
                let reason = e.to_string();
                self.fail_order(&order, &reason).await?;
                Ok(ChargeOutcome::Failed(reason))
            },
        }
    }

    /// Charges a renewal order. Older orders may predate the handle-binding step of session creation, so the
    /// invoice handle is repaired before the charge goes out.
    pub async fn renewal_charge(
        &self,
        order_id: OrderId,
        token_id: i64,
        amount: Option<MinorUnits>,
    ) -> Result<ChargeOutcome, PaymentFlowError> {
        let order = self.store.fetch_order(order_id).await?;
        if order.meta(meta_keys::REEPAY_ORDER).is_none() {
            debug!("Order {} has no invoice handle bound. Repairing it before the renewal charge.", order.id);
            self.store.set_meta(order_id, meta_keys::REEPAY_ORDER, &order.id.to_handle()).await?;
        }
        self.charge_with_token(order_id, token_id, amount).await
    }

    /// Fetches a stored card from the processor and persists it as a payment token for the user.
    pub async fn store_card(&self, user_id: i64, card_id: &str) -> Result<PaymentToken, PaymentFlowError> {
        let card = self.processor.fetch_card(&customer_handle(user_id), card_id).await?;
        let (expiry_month, expiry_year) = card.expiry()?;
        let token = PaymentToken {
            id: 0,
            token: card_id.to_string(),
            masked_card: card.masked_card,
            expiry_month,
            expiry_year,
            card_type: card.card_type,
            user_id,
        };
        let token = self.store.save_token(token).await?;
        info!("Stored card {} for user {user_id}", token.masked_card);
        Ok(token)
    }

    async fn apply_authorization(&self, order: &Order, transaction: &str) -> Result<(), PaymentFlowError> {
        if order.transaction_id.as_deref() == Some(transaction) {
            debug!("Transaction {transaction} already applied to order {}", order.id);
            return Ok(());
        }
        self.reduce_stock_once(order.id).await?;
        self.store.set_transaction_id(order.id, transaction).await?;
        self.store.update_status(order.id, OrderStatusType::Authorized).await?;
        info!("Order {} is authorized under transaction {transaction}", order.id);
        Ok(())
    }

    async fn apply_settled_charge(&self, order: &Order, transaction: &str) -> Result<(), PaymentFlowError> {
        self.reduce_stock_once(order.id).await?;
        self.store.set_transaction_id(order.id, transaction).await?;
        let decision = settlement::compute(order, &self.settle_config);
        if decision.instant_settle_amount.is_zero() || decision.covers_whole_order() {
            self.store.update_status(order.id, OrderStatusType::Settled).await?;
            info!("Order {} is fully settled", order.id);
        } else {
            // Part of the order remains to be captured later. Leave it open.
            self.store.update_status(order.id, OrderStatusType::Authorized).await?;
            self.store
                .add_note(order.id, &format!("Transaction partly settled with amount {}.", decision.instant_settle_amount))
                .await?;
        }
        Ok(())
    }

    async fn fail_order(&self, order: &Order, reason: &str) -> Result<(), PaymentFlowError> {
        warn!("Charge for order {} failed: {reason}", order.id);
        self.store.update_status(order.id, OrderStatusType::Failed).await?;
        self.store.add_note(order.id, &format!("Payment failed: {reason}")).await?;
        Ok(())
    }

    /// Reduces stock exactly once per order, re-reading the marker so a racing webhook cannot double-reduce.
    async fn reduce_stock_once(&self, order_id: OrderId) -> Result<(), PaymentFlowError> {
        let reduced = self.store.meta(order_id, meta_keys::STOCK_REDUCED).await?.is_some();
        if !reduced {
            self.store.reduce_stock(order_id).await?;
            self.store.set_meta(order_id, meta_keys::STOCK_REDUCED, "1").await?;
        }
        Ok(())
    }

    fn customer_info(&self, order: &Order) -> CustomerInfo {
        let handle = order
            .user_id
            .map(customer_handle)
            .unwrap_or_else(|| format!("guest-{}", order.id.0));
        customer_block(handle, &order.billing, self.processor.is_test_mode())
    }

    fn session_order(&self, order: &Order) -> SessionOrder {
        let (amount, order_lines) = if self.skip_order_lines || order.items.is_empty() {
            (Some(order.total), None)
        } else {
            let lines = order
                .items
                .iter()
                .map(|item| OrderLine {
                    ordertext: item.name.clone(),
                    amount: item.unit_price,
                    quantity: item.quantity,
                })
                .collect();
            (None, Some(lines))
        };
        SessionOrder {
            handle: order.reepay_handle(),
            generate_handle: false,
            amount,
            order_lines,
            currency: order.currency.clone(),
            customer: self.customer_info(order),
            billing_address: invoice_address(&order.billing),
            shipping_address: shipping_block(order),
        }
    }
}

/// Maps a local address to the processor's customer block. Absent fields go out as empty strings.
fn customer_block(handle: String, billing: &Address, test: bool) -> CustomerInfo {
    CustomerInfo {
        test,
        handle,
        email: billing.email.clone(),
        address: billing.address_1.clone(),
        address2: billing.address_2.clone(),
        city: billing.city.clone(),
        country: billing.country.clone(),
        phone: billing.phone.clone(),
        company: billing.company.clone(),
        vat: String::new(),
        first_name: billing.first_name.clone(),
        last_name: billing.last_name.clone(),
        postal_code: billing.postcode.clone(),
    }
}

pub(crate) fn invoice_address(address: &Address) -> InvoiceAddress {
    InvoiceAddress {
        attention: String::new(),
        email: address.email.clone(),
        address: address.address_1.clone(),
        address2: address.address_2.clone(),
        city: address.city.clone(),
        country: address.country.clone(),
        phone: address.phone.clone(),
        company: address.company.clone(),
        vat: String::new(),
        first_name: address.first_name.clone(),
        last_name: address.last_name.clone(),
        postal_code: address.postcode.clone(),
        state_or_province: address.state.clone(),
    }
}

/// The shipping block is only sent for orders that ship physically, and falls back to the billing address when
/// the stored shipping address is empty, since the processor schema rejects blank blocks.
pub(crate) fn shipping_block(order: &Order) -> Option<InvoiceAddress> {
    if !order.needs_shipping {
        return None;
    }
    let shipping = invoice_address(&order.shipping);
    if shipping.is_degenerate() {
        Some(invoice_address(&order.billing))
    } else {
        Some(shipping)
    }
}
