//! Reepay Payment Gateway engine
//!
//! This library contains the core logic for reconciling local order state against the Reepay payment processor.
//! It is storage-agnostic and transport-agnostic.
//!
//! The library is divided into three main sections:
//! 1. The storage and processor contracts ([`mod@traits`]). The order persistence layer lives outside this crate;
//!    any backend that implements [`OrderStore`] can drive the engine. [`MemoryStore`] is a reference
//!    implementation used in tests and for single-process deployments. The processor side is abstracted behind
//!    [`ProcessorApi`], implemented by the `reepay_api` client.
//! 2. The payment flows ([`mod@flow_api`]). [`CheckoutApi`] creates payment sessions and runs direct charges,
//!    [`Reconciler`] applies webhook events and polling results to orders, and [`AdminApi`] exposes the
//!    operator commands (capture, cancel, refund).
//! 3. Pure domain logic: the instant-settlement calculator ([`mod@settlement`]) and the shared data types
//!    ([`mod@db_types`]).
mod flow_api;
mod mem_store;

pub mod db_types;
pub mod events;
pub mod helpers;
pub mod settlement;
pub mod traits;

#[cfg(test)]
pub(crate) mod test_utils;

pub use flow_api::{
    admin_api::{AdminApi, AdminOutcome},
    checkout_api::{ChargeOutcome, CheckoutApi, SessionMode},
    errors::PaymentFlowError,
    reconciler_api::{Reconciler, WebhookOutcome},
};
pub use mem_store::MemoryStore;
pub use traits::{OrderStore, OrderStoreError, ProcessorApi};
