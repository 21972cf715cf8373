//! Operator-triggered payment commands: capture, cancel, refund, and their partial variants.
//!
//! Every command returns a structured [`AdminOutcome`] rather than propagating errors past the boundary, so the
//! calling endpoint can always report success or failure to the operator UI.

use log::*;
use rpg_common::MinorUnits;
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{meta_keys, Order, OrderId, OrderStatusType},
    flow_api::errors::PaymentFlowError,
    traits::{OrderStore, ProcessorApi},
};

/// The result of an admin command. `success` is false both for processor rejections and for guard violations
/// (e.g. capturing a locally cancelled order); `message` is operator-readable either way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminOutcome {
    pub success: bool,
    pub message: String,
}

impl AdminOutcome {
    fn ok(message: impl Into<String>) -> Self {
        Self { success: true, message: message.into() }
    }

    fn failed(message: impl Into<String>) -> Self {
        Self { success: false, message: message.into() }
    }
}

#[derive(Clone)]
pub struct AdminApi<S, P> {
    store: S,
    processor: P,
}

impl<S, P> AdminApi<S, P>
where
    S: OrderStore,
    P: ProcessorApi,
{
    pub fn new(store: S, processor: P) -> Self {
        Self { store, processor }
    }

    /// Captures `amount` of the order's authorization, or the un-captured remainder when no amount is given.
    pub async fn capture(&self, order_id: OrderId, amount: Option<MinorUnits>) -> AdminOutcome {
        match self.try_capture(order_id, amount).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Capture of order {order_id} failed: {e}");
                AdminOutcome::failed(e.to_string())
            },
        }
    }

    /// Cancels the order's authorization and marks the order locally cancelled. Once the local marker is set, no
    /// further remote calls are made for the order; repeating the command is a successful no-op.
    pub async fn cancel(&self, order_id: OrderId) -> AdminOutcome {
        match self.try_cancel(order_id).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Cancellation of order {order_id} failed: {e}");
                AdminOutcome::failed(e.to_string())
            },
        }
    }

    /// Refunds `amount` against the order's settled invoice, or the full refundable remainder when no amount is
    /// given.
    pub async fn refund(&self, order_id: OrderId, amount: Option<MinorUnits>) -> AdminOutcome {
        match self.try_refund(order_id, amount).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Refund of order {order_id} failed: {e}");
                AdminOutcome::failed(e.to_string())
            },
        }
    }

    async fn try_capture(
        &self,
        order_id: OrderId,
        amount: Option<MinorUnits>,
    ) -> Result<AdminOutcome, PaymentFlowError> {
        let order = self.store.fetch_order(order_id).await?;
        if order.is_cancelled_locally() {
            return Ok(AdminOutcome::failed("Order has been cancelled. No further captures are possible."));
        }
        let handle = order.reepay_handle();
        let invoice = self.processor.fetch_invoice(&handle).await?;
        let remainder = invoice.authorized_amount - invoice.settled_amount;
        let amount = amount.unwrap_or(remainder);
        if amount.is_zero() || amount > remainder {
            return Ok(AdminOutcome::failed(format!(
                "Cannot capture {amount}. The capturable remainder is {remainder}."
            )));
        }
        let response = self.processor.settle(&handle, amount).await?;
        if let Some(transaction) = response.transaction {
            self.store.set_meta(order.id, meta_keys::CAPTURE_TRANSACTION, &transaction).await?;
        }
        if invoice.settled_amount + amount >= order.total {
            self.store.update_status(order.id, OrderStatusType::Settled).await?;
            self.note(&order, format!("Transaction settled with amount {amount}.")).await?;
        } else {
            self.note(&order, format!("Transaction partly settled with amount {amount}.")).await?;
        }
        info!("Captured {amount} on order {order_id}");
        Ok(AdminOutcome::ok(format!("Captured {amount}.")))
    }

    async fn try_cancel(&self, order_id: OrderId) -> Result<AdminOutcome, PaymentFlowError> {
        let order = self.store.fetch_order(order_id).await?;
        if order.is_cancelled_locally() {
            info!("Order {order_id} is already cancelled. Nothing to do.");
            return Ok(AdminOutcome::ok("Order already cancelled."));
        }
        let handle = order.reepay_handle();
        let invoice = self.processor.fetch_invoice(&handle).await?;
        if !invoice.settled_amount.is_zero() {
            return Ok(AdminOutcome::failed("Order has settled funds and can no longer be cancelled. Refund instead."));
        }
        let response = self.processor.cancel(&handle).await?;
        if let Some(transaction) = response.transaction {
            self.store.set_meta(order.id, meta_keys::CANCEL_TRANSACTION, &transaction).await?;
        }
        self.store.set_meta(order.id, meta_keys::ORDER_CANCELLED, "1").await?;
        self.store.update_status(order.id, OrderStatusType::Cancelled).await?;
        self.note(&order, "Payment cancelled.".to_string()).await?;
        info!("Cancelled order {order_id}");
        Ok(AdminOutcome::ok("Payment cancelled."))
    }

    async fn try_refund(
        &self,
        order_id: OrderId,
        amount: Option<MinorUnits>,
    ) -> Result<AdminOutcome, PaymentFlowError> {
        let order = self.store.fetch_order(order_id).await?;
        if order.is_cancelled_locally() {
            return Ok(AdminOutcome::failed("Order has been cancelled. No further refunds are possible."));
        }
        let handle = order.reepay_handle();
        let invoice = self.processor.fetch_invoice(&handle).await?;
        let refundable = invoice.settled_amount - invoice.refunded_amount;
        let amount = amount.unwrap_or(refundable);
        if amount.is_zero() {
            return Ok(AdminOutcome::failed("There is nothing to refund on this order."));
        }
        if amount > refundable {
            return Ok(AdminOutcome::failed(format!("Cannot refund {amount}. The refundable amount is {refundable}.")));
        }
        self.processor.refund(&handle, amount).await?;
        // The local refund record is created by the invoice_refund webhook, which dedups on credit note ids.
        let status = if invoice.refunded_amount + amount >= order.total {
            OrderStatusType::RefundedFull
        } else {
            OrderStatusType::RefundedPartial
        };
        self.store.update_status(order.id, status).await?;
        self.note(&order, format!("Refunded {amount}.")).await?;
        info!("Refunded {amount} on order {order_id}");
        Ok(AdminOutcome::ok(format!("Refunded {amount}.")))
    }

    async fn note(&self, order: &Order, note: String) -> Result<(), PaymentFlowError> {
        self.store.add_note(order.id, &note).await?;
        Ok(())
    }
}
