use reepay_api::ReepayApiError;
use thiserror::Error;

use crate::{db_types::OrderId, helpers::WebhookSignatureError, traits::OrderStoreError};

#[derive(Debug, Error)]
pub enum PaymentFlowError {
    #[error("Storage error: {0}")]
    StoreError(#[from] OrderStoreError),
    #[error("Processor error: {0}")]
    ApiError(#[from] ReepayApiError),
    #[error("Webhook signature verification failed: {0}")]
    InvalidSignature(#[from] WebhookSignatureError),
    #[error("Required field is missing from the event: {0}")]
    MissingEventField(&'static str),
    #[error("Unknown webhook event type: {0}")]
    UnknownEventType(String),
    #[error("The payment token does not belong to the order's customer")]
    AccessDenied,
    #[error("Order {0} has been cancelled locally. No further processor calls are allowed for it.")]
    OrderCancelledLocally(OrderId),
    #[error("The processor response could not be interpreted: {0}")]
    UnexpectedResponse(String),
}

impl PaymentFlowError {
    /// Duplicate deliveries and replays are acknowledged, not failed. The webhook endpoint uses this to choose
    /// between a 200 and a 400.
    pub fn is_client_fault(&self) -> bool {
        matches!(
            self,
            PaymentFlowError::InvalidSignature(_) |
                PaymentFlowError::MissingEventField(_) |
                PaymentFlowError::UnknownEventType(_) |
                PaymentFlowError::AccessDenied
        )
    }
}
