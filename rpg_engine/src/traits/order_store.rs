use rpg_common::MinorUnits;
use thiserror::Error;

use crate::db_types::{Order, OrderId, OrderStatusType, PaymentToken};

#[derive(Debug, Clone, Error)]
pub enum OrderStoreError {
    #[error("Order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("No payment token with id {0}")]
    TokenNotFound(i64),
    #[error("Storage backend error: {0}")]
    BackendError(String),
}

/// The persistence contract the engine requires from the surrounding shop platform.
///
/// The engine never owns order state. It reads a snapshot, decides, and writes back individual fields through
/// these methods. Each method is assumed atomic on its own, but the store is not transactional across calls;
/// the payment flows re-read state immediately before transition decisions to tolerate concurrent writers
/// (check-then-act, with rare lost updates accepted).
#[allow(async_fn_in_trait)]
pub trait OrderStore: Clone {
    async fn fetch_order(&self, id: OrderId) -> Result<Order, OrderStoreError>;

    /// Looks an order up by its remote invoice handle, honoring repaired handles stored in order metadata.
    async fn fetch_order_by_handle(&self, handle: &str) -> Result<Order, OrderStoreError>;

    async fn update_status(&self, id: OrderId, status: OrderStatusType) -> Result<(), OrderStoreError>;

    /// Sets the order's remote transaction id, the idempotency key for webhook processing.
    async fn set_transaction_id(&self, id: OrderId, transaction_id: &str) -> Result<(), OrderStoreError>;

    async fn set_meta(&self, id: OrderId, key: &str, value: &str) -> Result<(), OrderStoreError>;

    /// Re-reads a single metadata value. Used for check-then-act guards that must not trust a stale snapshot.
    async fn meta(&self, id: OrderId, key: &str) -> Result<Option<String>, OrderStoreError>;

    /// Reduces stock for the order's items. The caller guards this with the stock-reduced marker; the store just
    /// performs the reduction.
    async fn reduce_stock(&self, id: OrderId) -> Result<(), OrderStoreError>;

    /// Appends an audit note to the order.
    async fn add_note(&self, id: OrderId, note: &str) -> Result<(), OrderStoreError>;

    /// Records a local refund of `amount` against the order.
    async fn create_refund(&self, id: OrderId, amount: MinorUnits, reason: &str) -> Result<(), OrderStoreError>;

    /// Persists a payment token. A token submitted with id 0 is assigned a fresh id; the stored token is returned.
    async fn save_token(&self, token: PaymentToken) -> Result<PaymentToken, OrderStoreError>;

    async fn fetch_token(&self, token_id: i64) -> Result<PaymentToken, OrderStoreError>;

    /// Persists the mapping from a local user to their remote customer handle.
    async fn save_customer_mapping(&self, user_id: i64, customer_handle: &str) -> Result<(), OrderStoreError>;
}
