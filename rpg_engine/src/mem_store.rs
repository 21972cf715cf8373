//! An in-memory [`OrderStore`] backend.
//!
//! Used by the test suites and suitable for single-process deployments where the shop platform pushes order
//! snapshots into the gateway. All state lives behind a single `RwLock`; clones share the same state.

use std::{collections::HashMap, sync::Arc};

use rpg_common::MinorUnits;
use tokio::sync::RwLock;

use crate::{
    db_types::{meta_keys, Order, OrderId, OrderStatusType, PaymentToken},
    traits::{OrderStore, OrderStoreError},
};

#[derive(Default)]
struct Inner {
    orders: HashMap<OrderId, Order>,
    tokens: HashMap<i64, PaymentToken>,
    next_token_id: i64,
    customer_mappings: HashMap<i64, String>,
    notes: HashMap<OrderId, Vec<String>>,
    refunds: HashMap<OrderId, Vec<(MinorUnits, String)>>,
    stock_reductions: HashMap<OrderId, usize>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_order(&self, order: Order) {
        let mut inner = self.inner.write().await;
        inner.orders.insert(order.id, order);
    }

    pub async fn notes(&self, id: OrderId) -> Vec<String> {
        let inner = self.inner.read().await;
        inner.notes.get(&id).cloned().unwrap_or_default()
    }

    pub async fn refunds(&self, id: OrderId) -> Vec<(MinorUnits, String)> {
        let inner = self.inner.read().await;
        inner.refunds.get(&id).cloned().unwrap_or_default()
    }

    /// How many times stock has been reduced for the order.
    pub async fn stock_reductions(&self, id: OrderId) -> usize {
        let inner = self.inner.read().await;
        inner.stock_reductions.get(&id).copied().unwrap_or_default()
    }

    pub async fn customer_mapping(&self, user_id: i64) -> Option<String> {
        let inner = self.inner.read().await;
        inner.customer_mappings.get(&user_id).cloned()
    }
}

impl OrderStore for MemoryStore {
    async fn fetch_order(&self, id: OrderId) -> Result<Order, OrderStoreError> {
        let inner = self.inner.read().await;
        inner.orders.get(&id).cloned().ok_or(OrderStoreError::OrderNotFound(id))
    }

    async fn fetch_order_by_handle(&self, handle: &str) -> Result<Order, OrderStoreError> {
        let inner = self.inner.read().await;
        inner
            .orders
            .values()
            .find(|o| o.meta.get(meta_keys::REEPAY_ORDER).map(String::as_str) == Some(handle) || o.id.to_handle() == handle)
            .cloned()
            .ok_or_else(|| OrderStoreError::BackendError(format!("No order with handle {handle}")))
    }

    async fn update_status(&self, id: OrderId, status: OrderStatusType) -> Result<(), OrderStoreError> {
        let mut inner = self.inner.write().await;
        let order = inner.orders.get_mut(&id).ok_or(OrderStoreError::OrderNotFound(id))?;
        order.status = status;
        order.updated_at = chrono::Utc::now();
        Ok(())
    }

    async fn set_transaction_id(&self, id: OrderId, transaction_id: &str) -> Result<(), OrderStoreError> {
        let mut inner = self.inner.write().await;
        let order = inner.orders.get_mut(&id).ok_or(OrderStoreError::OrderNotFound(id))?;
        order.transaction_id = Some(transaction_id.to_string());
        Ok(())
    }

    async fn set_meta(&self, id: OrderId, key: &str, value: &str) -> Result<(), OrderStoreError> {
        let mut inner = self.inner.write().await;
        let order = inner.orders.get_mut(&id).ok_or(OrderStoreError::OrderNotFound(id))?;
        order.meta.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn meta(&self, id: OrderId, key: &str) -> Result<Option<String>, OrderStoreError> {
        let inner = self.inner.read().await;
        let order = inner.orders.get(&id).ok_or(OrderStoreError::OrderNotFound(id))?;
        Ok(order.meta.get(key).cloned())
    }

    async fn reduce_stock(&self, id: OrderId) -> Result<(), OrderStoreError> {
        let mut inner = self.inner.write().await;
        if !inner.orders.contains_key(&id) {
            return Err(OrderStoreError::OrderNotFound(id));
        }
        *inner.stock_reductions.entry(id).or_default() += 1;
        Ok(())
    }

    async fn add_note(&self, id: OrderId, note: &str) -> Result<(), OrderStoreError> {
        let mut inner = self.inner.write().await;
        if !inner.orders.contains_key(&id) {
            return Err(OrderStoreError::OrderNotFound(id));
        }
        inner.notes.entry(id).or_default().push(note.to_string());
        Ok(())
    }

    async fn create_refund(&self, id: OrderId, amount: MinorUnits, reason: &str) -> Result<(), OrderStoreError> {
        let mut inner = self.inner.write().await;
        if !inner.orders.contains_key(&id) {
            return Err(OrderStoreError::OrderNotFound(id));
        }
        inner.refunds.entry(id).or_default().push((amount, reason.to_string()));
        Ok(())
    }

    async fn save_token(&self, mut token: PaymentToken) -> Result<PaymentToken, OrderStoreError> {
        let mut inner = self.inner.write().await;
        if token.id == 0 {
            inner.next_token_id += 1;
            token.id = inner.next_token_id;
        }
        inner.tokens.insert(token.id, token.clone());
        Ok(token)
    }

    async fn fetch_token(&self, token_id: i64) -> Result<PaymentToken, OrderStoreError> {
        let inner = self.inner.read().await;
        inner.tokens.get(&token_id).cloned().ok_or(OrderStoreError::TokenNotFound(token_id))
    }

    async fn save_customer_mapping(&self, user_id: i64, customer_handle: &str) -> Result<(), OrderStoreError> {
        let mut inner = self.inner.write().await;
        inner.customer_mappings.insert(user_id, customer_handle.to_string());
        Ok(())
    }
}
